//! Error types for VM operations
//!
//! Every error here is fatal for the run that raised it. A malformed program is
//! reported to whoever invoked the engine; nothing is retried.

use thiserror::Error;

/// Failure to turn a memory cell into an instruction
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The low two digits do not name an opcode enabled for this variant
    #[error("unsupported opcode {opcode} in cell {cell}")]
    UnsupportedOpcode { cell: i64, opcode: i64 },

    /// A mode digit is unknown, disabled for this variant, or beyond the third parameter
    #[error("unsupported mode digit {digit} for parameter {parameter} in cell {cell}")]
    UnsupportedMode {
        cell: i64,
        parameter: usize,
        digit: i64,
    },
}

/// Failure to resolve or access a memory address
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("negative address {0}")]
    Negative(i64),

    /// Immediate mode used for a parameter the instruction writes to
    #[error("immediate mode cannot be used as a write target")]
    ImmediateWrite,

    /// Access past the end of a bounded address space
    #[error("address {address} is out of bounds for memory of size {size}")]
    OutOfBounds { address: usize, size: usize },
}

/// Failure to parse a program from text
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("program is empty")]
    Empty,

    #[error("invalid cell {token:?} at index {index}")]
    InvalidCell { index: usize, token: String },

    #[error("cannot patch program: {0}")]
    Patch(#[from] AddressError),
}

/// Error variants that can occur during VM execution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VMError {
    #[error("decode error at pc {pc}: {source}")]
    Decode {
        pc: usize,
        #[source]
        source: DecodeError,
    },

    #[error("address error at pc {pc}: {source}")]
    Address {
        pc: usize,
        #[source]
        source: AddressError,
    },

    /// An Input instruction ran with no pending value and no producer left to supply one
    #[error("input exhausted at pc {pc}: no value pending and no producer left")]
    InputExhausted { pc: usize },
}

impl VMError {
    /// Program counter of the instruction that faulted
    pub fn pc(&self) -> usize {
        match self {
            VMError::Decode { pc, .. }
            | VMError::Address { pc, .. }
            | VMError::InputExhausted { pc } => *pc,
        }
    }
}
