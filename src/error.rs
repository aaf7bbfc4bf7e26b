use thiserror::Error;

use crate::opcode::Opcode;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ProcessError {
    #[error("Invalid opcode state '{0}'.")]
    Opcode(#[from] OpcodeError),
    #[error("Invalid stack state '{0}'.")]
    Stack(#[from] StackError),
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum OpcodeError {
    #[error("An unsupported opcode was used {0:#06X?}.")]
    InvalidOpcode(Opcode),
    #[error("Pointer location invalid there can not be an opcode at {pointer:#06X}, if data len is {len}")]
    ProgramCounterOutOfBounds { pointer: usize, len: usize },
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum StackError {
    #[error("Stack is full!")]
    Full,
    #[error("Stack is empty!")]
    Empty,
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum LoadError {
    #[error("The rom is {size} bytes long, but only {max} bytes fit into memory.")]
    RomTooLarge { size: usize, max: usize },
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum KeyError {
    #[error("There is no key with the index {0:#X}.")]
    OutOfRange(usize),
}
