//! Opcode abstractions, decoding and constants.
use std::{
    convert::TryFrom,
    fmt::{self, Display},
};

use crate::{definitions::memory, OpcodeError};

/// the base mask used for generating all the other sub masks
pub(crate) const OPCODE_MASK_FFFF: u16 = u16::MAX;

/// the mask for the first twelve bits
pub(crate) const OPCODE_MASK_FFF0: u16 = OPCODE_MASK_FFFF << 4;

/// the mask for the first eight bits
pub(crate) const OPCODE_MASK_FF00: u16 = OPCODE_MASK_FFFF << 8;

/// the mask for the first four bits
pub(crate) const OPCODE_MASK_F000: u16 = OPCODE_MASK_FFFF << 12;

/// the mask for the last four bits
pub(crate) const OPCODE_MASK_000F: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FFF0;

/// the mask for the last eight bits
pub(crate) const OPCODE_MASK_00FF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_FF00;

/// the mask for the last twelve bits
pub(crate) const OPCODE_MASK_0FFF: u16 = OPCODE_MASK_FFFF ^ OPCODE_MASK_F000;

/// the size of a nibble
const NIBBLE: u16 = 0x4;

/// a wrapper type for u16 to make it clear what is meant to be used
pub type Opcode = u16;

/// will build an opcode from data and the given point
/// # Arguments
///
/// - `data` - A slice of u8 data entries used to generate the opcodes
/// - `pointer` - Where in the data the opcode shall be extracted, so `pointer` and `pointer + 1` make
/// the opcode up
///
/// # Example
/// ```rust
/// # use chip::opcode::*;
/// # use chip::OpcodeError;
///  const OPCODES: [Opcode; 2] = [0x00EE, 0x1EDA];
///  const SPLIT_OPCODE: [u8; 4] = [0x00, 0xEE, 0x1E, 0xDA];
///  for (i, val) in OPCODES.iter().enumerate() {
///      let opcode = build_opcode(&SPLIT_OPCODE, i * 2).expect("This will work.");
///      assert_eq!(opcode, *val);
///  }
/// # let pointer = 3;
/// # let err = OpcodeError::ProgramCounterOutOfBounds { pointer, len: SPLIT_OPCODE.len() };
/// # assert_eq!(Err(err), build_opcode(&SPLIT_OPCODE, pointer));
/// ```
pub fn build_opcode(data: &[u8], pointer: usize) -> Result<Opcode, OpcodeError> {
    // controlling that there is no illegal access here
    if pointer + 1 < data.len() {
        Ok(Opcode::from_be_bytes([data[pointer], data[pointer + 1]]))
    } else {
        Err(OpcodeError::ProgramCounterOutOfBounds {
            pointer,
            len: data.len(),
        })
    }
}

/// Extractors for the individual fields of an opcode.
pub trait OpcodeFields {
    /// the primary instruction group, the highest nibble
    fn t(&self) -> usize;

    /// the lowest twelve bits, an address
    fn nnn(&self) -> usize;

    /// the lowest byte, a constant
    fn nn(&self) -> u8;

    /// the lowest nibble
    fn n(&self) -> usize;

    /// the second nibble, a register index
    fn x(&self) -> usize;

    /// the third nibble, a register index
    fn y(&self) -> usize;
}

impl OpcodeFields for Opcode {
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.t(), 0x1);
    /// ```
    fn t(&self) -> usize {
        ((self & OPCODE_MASK_F000) >> (3 * NIBBLE)) as usize
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.nnn(), 0xEDA);
    /// ```
    fn nnn(&self) -> usize {
        (self & OPCODE_MASK_0FFF) as usize
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!(BASE_OPCODE.nn(), 0xDA);
    /// ```
    fn nn(&self) -> u8 {
        (self & OPCODE_MASK_00FF) as u8
    }

    fn n(&self) -> usize {
        (self & OPCODE_MASK_000F) as usize
    }

    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// const BASE_OPCODE: Opcode = 0x1EDA;
    /// assert_eq!((BASE_OPCODE.x(), BASE_OPCODE.y()), (0xE, 0xD));
    /// ```
    fn x(&self) -> usize {
        ((self & OPCODE_MASK_0FFF & OPCODE_MASK_FF00) >> (2 * NIBBLE)) as usize
    }

    fn y(&self) -> usize {
        ((self & OPCODE_MASK_00FF & OPCODE_MASK_FFF0) >> NIBBLE) as usize
    }
}

/// The register to register operations of the `8XYN` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    /// `8XY0` - `Vx = Vy`
    Assign,
    /// `8XY1` - `Vx |= Vy`
    Or,
    /// `8XY2` - `Vx &= Vy`
    And,
    /// `8XY3` - `Vx ^= Vy`
    Xor,
    /// `8XY4` - `Vx += Vy`, `VF` is the carry
    Add,
    /// `8XY5` - `Vx -= Vy`, `VF` is the inverted borrow
    Sub,
    /// `8XY6` - `Vx >>= 1`, `VF` is the shifted out bit
    ShiftRight,
    /// `8XY7` - `Vx = Vy - Vx`, `VF` is the inverted borrow
    SubReversed,
    /// `8XYE` - `Vx <<= 1`, `VF` is the shifted out bit
    ShiftLeft,
}

impl ArithmeticOp {
    fn from_nibble(n: usize) -> Option<Self> {
        let op = match n {
            0x0 => Self::Assign,
            0x1 => Self::Or,
            0x2 => Self::And,
            0x3 => Self::Xor,
            0x4 => Self::Add,
            0x5 => Self::Sub,
            0x6 => Self::ShiftRight,
            0x7 => Self::SubReversed,
            0xE => Self::ShiftLeft,
            _ => return None,
        };
        Some(op)
    }
}

/// The keyboard conditionals of the `EXNN` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOp {
    /// `EX9E` - skip if the key in `VX` is pressed
    Pressed,
    /// `EXA1` - skip if the key in `VX` is not pressed
    NotPressed,
}

/// The timer, keyboard and memory instructions of the `FXNN` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscOp {
    /// `FX07` - `Vx = delay_timer`
    GetDelayTimer,
    /// `FX0A` - block until a key is pressed, store it in `VX`
    AwaitKeyPress,
    /// `FX15` - `delay_timer = Vx`
    SetDelayTimer,
    /// `FX18` - `sound_timer = Vx`
    SetSoundTimer,
    /// `FX1E` - `I += Vx`
    AddToIndex,
    /// `FX29` - `I = glyph address of Vx`
    SetIndexToGlyph,
    /// `FX33` - store the bcd digits of `VX` at `I`
    StoreBcd,
    /// `FX55` - store `V0..=VX` at `I`
    StoreRegisters,
    /// `FX65` - load `V0..=VX` from `I`
    LoadRegisters,
}

impl MiscOp {
    fn from_byte(nn: u8) -> Option<Self> {
        let op = match nn {
            0x07 => Self::GetDelayTimer,
            0x0A => Self::AwaitKeyPress,
            0x15 => Self::SetDelayTimer,
            0x18 => Self::SetSoundTimer,
            0x1E => Self::AddToIndex,
            0x29 => Self::SetIndexToGlyph,
            0x33 => Self::StoreBcd,
            0x55 => Self::StoreRegisters,
            0x65 => Self::LoadRegisters,
            _ => return None,
        };
        Some(op)
    }
}

/// A fully decoded instruction with its operands.
///
/// `x` and `y` are register indices, `nn` an immediate byte, `n` the sprite
/// height and `nnn` a 12 bit address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// `0NNN` - call a machine code routine, not emulated
    Sys { nnn: usize },
    /// `00E0`
    Clear,
    /// `00EE`
    Return,
    /// `1NNN`
    Jump { nnn: usize },
    /// `2NNN`
    Call { nnn: usize },
    /// `3XNN`
    SkipIfEqual { x: usize, nn: u8 },
    /// `4XNN`
    SkipIfNotEqual { x: usize, nn: u8 },
    /// `5XY0`
    SkipIfRegistersEqual { x: usize, y: usize },
    /// `6XNN`
    Load { x: usize, nn: u8 },
    /// `7XNN`
    Add { x: usize, nn: u8 },
    /// `8XYN`
    Arithmetic { op: ArithmeticOp, x: usize, y: usize },
    /// `9XY0`
    SkipIfRegistersNotEqual { x: usize, y: usize },
    /// `ANNN`
    SetIndex { nnn: usize },
    /// `BNNN`
    JumpWithOffset { nnn: usize },
    /// `CXNN`
    Random { x: usize, nn: u8 },
    /// `DXYN`
    Draw { x: usize, y: usize, n: usize },
    /// `EX9E` and `EXA1`
    Key { op: KeyOp, x: usize },
    /// `FXNN`
    Misc { op: MiscOp, x: usize },
}

impl TryFrom<Opcode> for Instruction {
    type Error = OpcodeError;

    fn try_from(value: Opcode) -> Result<Self, Self::Error> {
        let (x, y, n, nn, nnn) = (value.x(), value.y(), value.n(), value.nn(), value.nnn());
        let instruction = match value.t() {
            0x0 => match value {
                0x00E0 => Instruction::Clear,
                0x00EE => Instruction::Return,
                _ => Instruction::Sys { nnn },
            },
            0x1 => Instruction::Jump { nnn },
            0x2 => Instruction::Call { nnn },
            0x3 => Instruction::SkipIfEqual { x, nn },
            0x4 => Instruction::SkipIfNotEqual { x, nn },
            0x5 if n == 0 => Instruction::SkipIfRegistersEqual { x, y },
            0x6 => Instruction::Load { x, nn },
            0x7 => Instruction::Add { x, nn },
            0x8 => match ArithmeticOp::from_nibble(n) {
                Some(op) => Instruction::Arithmetic { op, x, y },
                None => return Err(OpcodeError::InvalidOpcode(value)),
            },
            0x9 if n == 0 => Instruction::SkipIfRegistersNotEqual { x, y },
            0xA => Instruction::SetIndex { nnn },
            0xB => Instruction::JumpWithOffset { nnn },
            0xC => Instruction::Random { x, nn },
            0xD => Instruction::Draw { x, y, n },
            0xE => match nn {
                0x9E => Instruction::Key {
                    op: KeyOp::Pressed,
                    x,
                },
                0xA1 => Instruction::Key {
                    op: KeyOp::NotPressed,
                    x,
                },
                _ => return Err(OpcodeError::InvalidOpcode(value)),
            },
            0xF => match MiscOp::from_byte(nn) {
                Some(op) => Instruction::Misc { op, x },
                None => return Err(OpcodeError::InvalidOpcode(value)),
            },
            _ => return Err(OpcodeError::InvalidOpcode(value)),
        };
        Ok(instruction)
    }
}

impl Instruction {
    /// Decodes the opcode, but ignores the low nibble of the `5XYN` and `9XYN`
    /// register skips. Any other opcode outside of the instruction set is `None`.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// assert_eq!(
    ///     Some(Instruction::SkipIfRegistersEqual { x: 0x0, y: 0x1 }),
    ///     Instruction::decode_relaxed(0x5011)
    /// );
    /// assert_eq!(None, Instruction::decode_relaxed(0x8008));
    /// ```
    pub fn decode_relaxed(value: Opcode) -> Option<Self> {
        let (x, y) = (value.x(), value.y());
        match value.t() {
            0x5 => Some(Instruction::SkipIfRegistersEqual { x, y }),
            0x9 => Some(Instruction::SkipIfRegistersNotEqual { x, y }),
            _ => Instruction::try_from(value).ok(),
        }
    }
}

impl Display for Instruction {
    /// Formats the instruction in the common assembler notation.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::*;
    /// # use std::convert::TryFrom;
    /// let instruction = Instruction::try_from(0xD015).unwrap();
    /// assert_eq!(instruction.to_string(), "DRW V0, V1, 5");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Sys { nnn } => write!(f, "SYS {:#05X}", nnn),
            Instruction::Clear => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump { nnn } => write!(f, "JP {:#05X}", nnn),
            Instruction::Call { nnn } => write!(f, "CALL {:#05X}", nnn),
            Instruction::SkipIfEqual { x, nn } => write!(f, "SE V{:X}, {:#04X}", x, nn),
            Instruction::SkipIfNotEqual { x, nn } => write!(f, "SNE V{:X}, {:#04X}", x, nn),
            Instruction::SkipIfRegistersEqual { x, y } => write!(f, "SE V{:X}, V{:X}", x, y),
            Instruction::Load { x, nn } => write!(f, "LD V{:X}, {:#04X}", x, nn),
            Instruction::Add { x, nn } => write!(f, "ADD V{:X}, {:#04X}", x, nn),
            Instruction::Arithmetic { op, x, y } => {
                let mnemonic = match op {
                    ArithmeticOp::Assign => "LD",
                    ArithmeticOp::Or => "OR",
                    ArithmeticOp::And => "AND",
                    ArithmeticOp::Xor => "XOR",
                    ArithmeticOp::Add => "ADD",
                    ArithmeticOp::Sub => "SUB",
                    ArithmeticOp::ShiftRight => "SHR",
                    ArithmeticOp::SubReversed => "SUBN",
                    ArithmeticOp::ShiftLeft => "SHL",
                };
                write!(f, "{} V{:X}, V{:X}", mnemonic, x, y)
            }
            Instruction::SkipIfRegistersNotEqual { x, y } => {
                write!(f, "SNE V{:X}, V{:X}", x, y)
            }
            Instruction::SetIndex { nnn } => write!(f, "LD I, {:#05X}", nnn),
            Instruction::JumpWithOffset { nnn } => write!(f, "JP V0, {:#05X}", nnn),
            Instruction::Random { x, nn } => write!(f, "RND V{:X}, {:#04X}", x, nn),
            Instruction::Draw { x, y, n } => write!(f, "DRW V{:X}, V{:X}, {}", x, y, n),
            Instruction::Key { op, x } => match op {
                KeyOp::Pressed => write!(f, "SKP V{:X}", x),
                KeyOp::NotPressed => write!(f, "SKNP V{:X}", x),
            },
            Instruction::Misc { op, x } => match op {
                MiscOp::GetDelayTimer => write!(f, "LD V{:X}, DT", x),
                MiscOp::AwaitKeyPress => write!(f, "LD V{:X}, K", x),
                MiscOp::SetDelayTimer => write!(f, "LD DT, V{:X}", x),
                MiscOp::SetSoundTimer => write!(f, "LD ST, V{:X}", x),
                MiscOp::AddToIndex => write!(f, "ADD I, V{:X}", x),
                MiscOp::SetIndexToGlyph => write!(f, "LD F, V{:X}", x),
                MiscOp::StoreBcd => write!(f, "LD B, V{:X}", x),
                MiscOp::StoreRegisters => write!(f, "LD [I], V{:X}", x),
                MiscOp::LoadRegisters => write!(f, "LD V{:X}, [I]", x),
            },
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents the program steps that the chip
/// can take after an instruction.
pub enum ProgramCounterStep {
    /// Will move the program counter to the next instruction
    Next,
    /// Will skip over the next instruction
    Skip,
    /// Will move back onto the instruction just executed, so it is fetched again
    Rewind,
    /// Will simply move the program counter to the given location.
    Jump(usize),
}

impl ProgramCounterStep {
    /// Will return a Skip if the condition is true.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next, ProgramCounterStep::cond(false));
    /// assert_eq!(ProgramCounterStep::Skip, ProgramCounterStep::cond(true));
    /// ```
    #[inline]
    pub fn cond(cond: bool) -> Self {
        if cond {
            ProgramCounterStep::Skip
        } else {
            ProgramCounterStep::Next
        }
    }

    /// Applies the step to the address of the instruction that was executed.
    ///
    /// # Example
    /// ```rust
    /// # use chip::opcode::ProgramCounterStep;
    /// assert_eq!(ProgramCounterStep::Next.apply(0x200), 0x202);
    /// assert_eq!(ProgramCounterStep::Skip.apply(0x200), 0x204);
    /// assert_eq!(ProgramCounterStep::Rewind.apply(0x200), 0x200);
    /// assert_eq!(ProgramCounterStep::Jump(0x300).apply(0x200), 0x300);
    /// ```
    #[inline]
    pub fn apply(&self, pointer: usize) -> usize {
        match *self {
            ProgramCounterStep::Rewind => pointer,
            ProgramCounterStep::Next => pointer + memory::opcodes::SIZE,
            ProgramCounterStep::Skip => pointer + 2 * memory::opcodes::SIZE,
            ProgramCounterStep::Jump(to) => to,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Represents a command from the interpreter up to the host.
pub enum Operation {
    /// If no action has to be taken.
    None,
    /// The instruction is waiting for the next key press.
    Wait,
    /// The screen changed and should be redrawn.
    Draw,
}
