pub mod chip8;
pub mod definitions;
pub mod devices;
pub mod opcode;
pub mod timer;

mod error;
mod runner;

// reexporting for convinience
pub use error::*;
pub use runner::*;
