//! The full implementation of the chip8 virtual machine, from the opcodes to an option to pretty
//! print it.
mod execute;
mod machine;
mod print;

/// reexport machine structs and data for simpler usage
pub use machine::*;
