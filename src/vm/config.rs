//! Engine capabilities
//!
//! A single engine covers every machine generation. The configuration picks the
//! address space and which opcodes and addressing modes the decoder accepts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::vm::types::{Opcode, ParameterMode};

/// Backing representation of machine memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressSpace {
    /// Fixed to the program size; accesses past the end are fatal
    Bounded,

    /// Any non-negative address; unset cells read as zero
    Sparse,
}

/// Named machine generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// Add, multiply and halt over position-mode operands
    Basic,

    /// I/O, jumps and comparisons with immediate operands
    Extended,

    /// Sparse memory with a relative base register
    Relocatable,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Basic, Variant::Extended, Variant::Relocatable];

    pub fn name(self) -> &'static str {
        match self {
            Variant::Basic => "basic",
            Variant::Extended => "extended",
            Variant::Relocatable => "relocatable",
        }
    }

    pub fn config(self) -> VMConfig {
        match self {
            Variant::Basic => VMConfig::basic(),
            Variant::Extended => VMConfig::extended(),
            Variant::Relocatable => VMConfig::relocatable(),
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Relocatable
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .iter()
            .copied()
            .find(|variant| variant.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown variant '{}', expected one of: basic, extended, relocatable",
                    s
                )
            })
    }
}

const BASIC_OPCODES: &[Opcode] = &[Opcode::Add, Opcode::Multiply, Opcode::Halt];

const EXTENDED_OPCODES: &[Opcode] = &[
    Opcode::Add,
    Opcode::Multiply,
    Opcode::Input,
    Opcode::Output,
    Opcode::JumpIfTrue,
    Opcode::JumpIfFalse,
    Opcode::LessThan,
    Opcode::Equals,
    Opcode::Halt,
];

const POSITION_ONLY: &[ParameterMode] = &[ParameterMode::Position];

const POSITION_IMMEDIATE: &[ParameterMode] = &[ParameterMode::Position, ParameterMode::Immediate];

/// Capabilities of one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VMConfig {
    pub address_space: AddressSpace,
    pub opcodes: &'static [Opcode],
    pub modes: &'static [ParameterMode],
}

impl VMConfig {
    pub fn basic() -> Self {
        Self {
            address_space: AddressSpace::Bounded,
            opcodes: BASIC_OPCODES,
            modes: POSITION_ONLY,
        }
    }

    pub fn extended() -> Self {
        Self {
            address_space: AddressSpace::Bounded,
            opcodes: EXTENDED_OPCODES,
            modes: POSITION_IMMEDIATE,
        }
    }

    pub fn relocatable() -> Self {
        Self {
            address_space: AddressSpace::Sparse,
            opcodes: &Opcode::ALL,
            modes: &ParameterMode::ALL,
        }
    }

    pub fn supports_opcode(&self, opcode: Opcode) -> bool {
        self.opcodes.contains(&opcode)
    }

    pub fn supports_mode(&self, mode: ParameterMode) -> bool {
        self.modes.contains(&mode)
    }
}

impl Default for VMConfig {
    fn default() -> Self {
        Variant::default().config()
    }
}

impl From<Variant> for VMConfig {
    fn from(variant: Variant) -> Self {
        variant.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_capabilities() {
        let basic = VMConfig::basic();
        assert!(basic.supports_opcode(Opcode::Multiply));
        assert!(!basic.supports_opcode(Opcode::Input));
        assert!(!basic.supports_mode(ParameterMode::Immediate));

        let extended = VMConfig::extended();
        assert!(extended.supports_opcode(Opcode::Equals));
        assert!(!extended.supports_opcode(Opcode::AdjustBase));
        assert!(!extended.supports_mode(ParameterMode::Relative));
        assert_eq!(extended.address_space, AddressSpace::Bounded);

        let relocatable = VMConfig::relocatable();
        assert!(Opcode::ALL.iter().all(|op| relocatable.supports_opcode(*op)));
        assert_eq!(relocatable.address_space, AddressSpace::Sparse);
    }

    #[test]
    fn test_parse_variant() {
        assert_eq!("Extended".parse::<Variant>(), Ok(Variant::Extended));
        assert_eq!(" basic ".parse::<Variant>(), Ok(Variant::Basic));
        assert!("day9".parse::<Variant>().is_err());
        assert_eq!(VMConfig::default(), VMConfig::relocatable());
    }
}
