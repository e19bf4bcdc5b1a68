//! Type definitions for the virtual machine
//!
//! This module contains the core data types used by the VM: opcodes,
//! addressing modes, decoded instructions and the immutable program image.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::vm::errors::{AddressError, ProgramError};

/// Operation codes understood by the machine
///
/// The discriminant is the value stored in the low two decimal digits of an
/// instruction cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// mem[p3] = p1 + p2
    Add = 1,

    /// mem[p3] = p1 * p2
    Multiply = 2,

    /// mem[p1] = next input value
    Input = 3,

    /// Emit p1 to the output sink
    Output = 4,

    /// pc = p2 when p1 is non-zero
    JumpIfTrue = 5,

    /// pc = p2 when p1 is zero
    JumpIfFalse = 6,

    /// mem[p3] = (p1 < p2) as 1 or 0
    LessThan = 7,

    /// mem[p3] = (p1 == p2) as 1 or 0
    Equals = 8,

    /// Relative base += p1
    AdjustBase = 9,

    /// Stop the machine
    Halt = 99,
}

impl Opcode {
    pub const ALL: [Opcode; 10] = [
        Opcode::Add,
        Opcode::Multiply,
        Opcode::Input,
        Opcode::Output,
        Opcode::JumpIfTrue,
        Opcode::JumpIfFalse,
        Opcode::LessThan,
        Opcode::Equals,
        Opcode::AdjustBase,
        Opcode::Halt,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.code() == code)
    }

    /// Number of parameter cells following the instruction cell
    pub fn parameter_count(self) -> usize {
        match self {
            Opcode::Add | Opcode::Multiply | Opcode::LessThan | Opcode::Equals => 3,
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => 2,
            Opcode::Input | Opcode::Output | Opcode::AdjustBase => 1,
            Opcode::Halt => 0,
        }
    }

    /// Distance the program counter advances when the instruction does not jump
    pub fn width(self) -> usize {
        1 + self.parameter_count()
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Multiply => "mul",
            Opcode::Input => "in",
            Opcode::Output => "out",
            Opcode::JumpIfTrue => "jnz",
            Opcode::JumpIfFalse => "jz",
            Opcode::LessThan => "lt",
            Opcode::Equals => "eq",
            Opcode::AdjustBase => "arb",
            Opcode::Halt => "halt",
        }
    }
}

/// How an instruction parameter is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterMode {
    /// The operand is an address to dereference
    Position = 0,

    /// The operand is the value itself
    Immediate = 1,

    /// The operand is an offset from the relative base
    Relative = 2,
}

impl ParameterMode {
    pub const ALL: [ParameterMode; 3] = [
        ParameterMode::Position,
        ParameterMode::Immediate,
        ParameterMode::Relative,
    ];

    pub fn digit(self) -> i64 {
        self as i64
    }

    pub fn from_digit(digit: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|mode| mode.digit() == digit)
    }

    fn symbol(self) -> char {
        match self {
            ParameterMode::Position => 'P',
            ParameterMode::Immediate => 'I',
            ParameterMode::Relative => 'R',
        }
    }
}

/// A decoded instruction cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub opcode: Opcode,

    /// Modes for parameters 1, 2 and 3; unused slots stay `Position`
    pub modes: [ParameterMode; 3],
}

impl Instruction {
    pub fn new(opcode: Opcode, modes: [ParameterMode; 3]) -> Self {
        Self { opcode, modes }
    }

    /// An instruction with every parameter in position mode
    pub fn positional(opcode: Opcode) -> Self {
        Self::new(opcode, [ParameterMode::Position; 3])
    }

    /// Mode of the zero-based parameter `index`
    pub fn mode(&self, index: usize) -> ParameterMode {
        self.modes
            .get(index)
            .copied()
            .unwrap_or(ParameterMode::Position)
    }

    /// Pack the instruction back into a memory cell
    pub fn encode(&self) -> i64 {
        self.modes
            .iter()
            .enumerate()
            .fold(self.opcode.code(), |cell, (slot, mode)| {
                cell + mode.digit() * 10_i64.pow(slot as u32 + 2)
            })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.name())?;
        let count = self.opcode.parameter_count();
        if count > 0 {
            let modes: String = self.modes[..count].iter().map(|m| m.symbol()).collect();
            write!(f, "[{}]", modes)?;
        }
        Ok(())
    }
}

/// The initial memory image of a machine
///
/// Programs are immutable and cheap to clone; each run copies the cells into
/// fresh memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    cells: Arc<[i64]>,
}

impl Program {
    pub fn new(cells: Vec<i64>) -> Self {
        Self {
            cells: cells.into(),
        }
    }

    pub fn cells(&self) -> &[i64] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Return a copy of the program with the given cells overwritten
    pub fn patched(&self, patches: &[(usize, i64)]) -> Result<Program, ProgramError> {
        let mut cells = self.cells.to_vec();
        for &(address, value) in patches {
            let size = cells.len();
            let cell = cells
                .get_mut(address)
                .ok_or(AddressError::OutOfBounds { address, size })?;
            *cell = value;
        }
        Ok(Program::new(cells))
    }
}

impl From<Vec<i64>> for Program {
    fn from(cells: Vec<i64>) -> Self {
        Program::new(cells)
    }
}

impl FromStr for Program {
    type Err = ProgramError;

    /// Parse a comma-separated list of integers such as `1,0,0,0,99`
    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let source = source.trim();
        if source.is_empty() {
            return Err(ProgramError::Empty);
        }

        let cells = source
            .split(',')
            .map(str::trim)
            .enumerate()
            .map(|(index, token)| {
                token.parse::<i64>().map_err(|_| ProgramError::InvalidCell {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Program::new(cells))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<String> = self.cells.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", cells.join(","))
    }
}
