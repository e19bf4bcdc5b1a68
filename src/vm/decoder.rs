//! Instruction decoding
//!
//! The low two decimal digits of a cell select the opcode. The digits above
//! them, read least-significant first, are the addressing modes of parameters
//! 1, 2 and 3. Absent digits mean position mode.

use crate::vm::config::VMConfig;
use crate::vm::errors::DecodeError;
use crate::vm::types::{Instruction, Opcode, ParameterMode};

/// Decode one memory cell against the capabilities of `config`
pub fn decode(cell: i64, config: &VMConfig) -> Result<Instruction, DecodeError> {
    let code = cell % 100;
    let opcode = Opcode::from_code(code)
        .filter(|op| config.supports_opcode(*op))
        .ok_or(DecodeError::UnsupportedOpcode { cell, opcode: code })?;

    let mut modes = [ParameterMode::Position; 3];
    let mut digits = cell / 100;
    let mut slot = 0;
    while digits != 0 {
        let digit = digits % 10;
        let unsupported = DecodeError::UnsupportedMode {
            cell,
            parameter: slot + 1,
            digit,
        };
        let mode = ParameterMode::from_digit(digit)
            .filter(|mode| config.supports_mode(*mode))
            .ok_or_else(|| unsupported.clone())?;

        match modes.get_mut(slot) {
            Some(entry) => *entry = mode,
            None if mode == ParameterMode::Position => {}
            None => return Err(unsupported),
        }

        digits /= 10;
        slot += 1;
    }

    Ok(Instruction::new(opcode, modes))
}
