//! VM memory
//!
//! Two address spaces back the machine: a bounded vector sized to the program,
//! and a sparse map where any non-negative address is valid and unset cells
//! read as zero.

use std::collections::BTreeMap;
use std::fmt;

use crate::vm::config::AddressSpace;
use crate::vm::errors::AddressError;
use crate::vm::types::Program;

/// Addressable integer storage for one machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VMMemory {
    Bounded(Vec<i64>),
    Sparse(BTreeMap<usize, i64>),
}

/// Largest memory rendered as a dense list of cells
pub const DENSE_LIMIT: usize = 1 << 16;

impl VMMemory {
    /// Create memory holding a fresh copy of `program`
    pub fn new(space: AddressSpace, program: &Program) -> Self {
        let mut memory = match space {
            AddressSpace::Bounded => VMMemory::Bounded(Vec::with_capacity(program.len())),
            AddressSpace::Sparse => VMMemory::Sparse(BTreeMap::new()),
        };
        memory.reset(program);
        memory
    }

    /// Discard every write and reload the program image
    pub fn reset(&mut self, program: &Program) {
        match self {
            VMMemory::Bounded(cells) => {
                cells.clear();
                cells.extend_from_slice(program.cells());
            }
            VMMemory::Sparse(cells) => {
                cells.clear();
                cells.extend(program.cells().iter().copied().enumerate());
            }
        }
    }

    /// Convert a raw operand into an address
    pub fn resolve(raw: i64) -> Result<usize, AddressError> {
        usize::try_from(raw).map_err(|_| AddressError::Negative(raw))
    }

    pub fn load(&self, address: usize) -> Result<i64, AddressError> {
        match self {
            VMMemory::Bounded(cells) => cells.get(address).copied().ok_or(AddressError::OutOfBounds {
                address,
                size: cells.len(),
            }),
            VMMemory::Sparse(cells) => Ok(cells.get(&address).copied().unwrap_or(0)),
        }
    }

    pub fn store(&mut self, address: usize, value: i64) -> Result<(), AddressError> {
        match self {
            VMMemory::Bounded(cells) => {
                let size = cells.len();
                let cell = cells
                    .get_mut(address)
                    .ok_or(AddressError::OutOfBounds { address, size })?;
                *cell = value;
            }
            VMMemory::Sparse(cells) => {
                cells.insert(address, value);
            }
        }
        Ok(())
    }

    /// One past the highest address that holds a value
    pub fn len(&self) -> usize {
        match self {
            VMMemory::Bounded(cells) => cells.len(),
            VMMemory::Sparse(cells) => cells
                .last_key_value()
                .map_or(0, |(&max, _)| max.saturating_add(1)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn address_space(&self) -> AddressSpace {
        match self {
            VMMemory::Bounded(_) => AddressSpace::Bounded,
            VMMemory::Sparse(_) => AddressSpace::Sparse,
        }
    }

    /// Every stored cell as `(address, value)`, in address order
    pub fn entries(&self) -> Vec<(usize, i64)> {
        match self {
            VMMemory::Bounded(cells) => cells.iter().copied().enumerate().collect(),
            VMMemory::Sparse(cells) => cells.iter().map(|(&address, &value)| (address, value)).collect(),
        }
    }

    /// Dense copy of addresses `0..len()`, or `None` past [`DENSE_LIMIT`]
    pub fn snapshot(&self) -> Option<Vec<i64>> {
        match self {
            VMMemory::Bounded(cells) => Some(cells.clone()),
            VMMemory::Sparse(_) if self.len() > DENSE_LIMIT => None,
            VMMemory::Sparse(cells) => {
                let mut dense = vec![0; self.len()];
                for (&address, &value) in cells {
                    dense[address] = value;
                }
                Some(dense)
            }
        }
    }
}

impl fmt::Display for VMMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.snapshot() {
            Some(cells) => {
                let cells: Vec<String> = cells.iter().map(|v| v.to_string()).collect();
                write!(f, "Memory: [{}]", cells.join(","))
            }
            None => {
                let cells: Vec<String> = self
                    .entries()
                    .iter()
                    .map(|(address, value)| format!("{}:{}", address, value))
                    .collect();
                write!(f, "Memory: {{{}}}", cells.join(","))
            }
        }
    }
}
