//! Intcode virtual machine
//!
//! This module contains the decoder, memory model and execution engine of the
//! Intcode machine, plus the input/output seams the pipelines plug into.

mod config;
mod decoder;
mod errors;
mod io;
mod memory;
mod types;

pub use config::{AddressSpace, VMConfig, Variant};
pub use decoder::decode;
pub use errors::{AddressError, DecodeError, ProgramError, VMError};
pub use io::{InputFn, InputSource, Mailbox, OutputSink};
pub use memory::VMMemory;
pub use types::{Instruction, Opcode, ParameterMode, Program};

// Main VM struct that coordinates components
mod vm;
pub use vm::{Cycle, VM};
