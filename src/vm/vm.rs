//! Main Virtual Machine implementation
//!
//! The VM struct owns the program image, memory, program counter and relative
//! base. [`VM::cycle`] performs one fetch-decode-execute step and reports when
//! the machine needs input, produced output or halted; the async driver
//! [`VM::run`] connects those outcomes to an input source and an output sink.

use futures::executor::block_on;
use log::{debug, trace};
use std::collections::VecDeque;

use crate::vm::config::VMConfig;
use crate::vm::decoder::decode;
use crate::vm::errors::{AddressError, VMError};
use crate::vm::io::{InputSource, OutputSink};
use crate::vm::memory::VMMemory;
use crate::vm::types::{Instruction, Opcode, ParameterMode, Program};

/// Outcome of one machine cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// An instruction retired without touching I/O
    Continue,

    /// An Input instruction is waiting; pc has not moved
    AwaitingInput,

    /// An Output instruction retired with this value
    Output(i64),

    /// The machine decoded Halt
    Halted,
}

/// An Intcode machine
#[derive(Debug, Clone)]
pub struct VM {
    program: Program,
    config: VMConfig,
    memory: VMMemory,
    pc: usize,
    relative_base: i64,
    pending_input: Option<i64>,
    halted: bool,
}

impl VM {
    /// Create a machine loaded with `program`
    pub fn new(program: Program, config: VMConfig) -> Self {
        let memory = VMMemory::new(config.address_space, &program);
        Self {
            program,
            config,
            memory,
            pc: 0,
            relative_base: 0,
            pending_input: None,
            halted: false,
        }
    }

    /// Restore the state every run starts from
    pub fn reset(&mut self) {
        self.memory.reset(&self.program);
        self.pc = 0;
        self.relative_base = 0;
        self.pending_input = None;
        self.halted = false;
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &VMConfig {
        &self.config
    }

    pub fn memory(&self) -> &VMMemory {
        &self.memory
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn relative_base(&self) -> i64 {
        self.relative_base
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Supply the value consumed by the next Input instruction
    pub fn provide_input(&mut self, value: i64) {
        self.pending_input = Some(value);
    }

    /// Run from a fresh state until Halt, reading from `input` and writing to `output`
    pub async fn run<I, O>(&mut self, input: &mut I, output: &mut O) -> Result<(), VMError>
    where
        I: InputSource + ?Sized,
        O: OutputSink + ?Sized,
    {
        self.reset();
        debug!("Starting run of {} cell program", self.program.len());

        let mut retired: u64 = 0;
        loop {
            match self.cycle()? {
                Cycle::Continue => retired += 1,
                Cycle::AwaitingInput => {
                    let value = input
                        .next_input()
                        .await
                        .ok_or(VMError::InputExhausted { pc: self.pc })?;
                    self.provide_input(value);
                }
                Cycle::Output(value) => {
                    retired += 1;
                    output.emit(value).await;
                }
                Cycle::Halted => {
                    debug!("Halted at pc {} after {} instructions", self.pc, retired + 1);
                    return Ok(());
                }
            }
        }
    }

    /// Run to completion without concurrency, feeding `inputs` in order
    ///
    /// Returns every value the program emitted.
    pub fn run_to_completion<T>(&mut self, inputs: T) -> Result<Vec<i64>, VMError>
    where
        T: IntoIterator<Item = i64>,
    {
        let mut input: VecDeque<i64> = inputs.into_iter().collect();
        let mut output = Vec::new();
        block_on(self.run(&mut input, &mut output))?;
        Ok(output)
    }

    /// Execute the instruction at pc
    pub fn cycle(&mut self) -> Result<Cycle, VMError> {
        if self.halted {
            return Ok(Cycle::Halted);
        }

        let pc = self.pc;
        let cell = self.memory.load(pc).map_err(|source| VMError::Address { pc, source })?;
        let instruction = decode(cell, &self.config).map_err(|source| VMError::Decode { pc, source })?;
        trace!("{:>6}: {}", pc, instruction);

        match instruction.opcode {
            Opcode::Add => {
                let value = self.read(&instruction, 0)?.wrapping_add(self.read(&instruction, 1)?);
                self.write(&instruction, 2, value)?;
            }
            Opcode::Multiply => {
                let value = self.read(&instruction, 0)?.wrapping_mul(self.read(&instruction, 1)?);
                self.write(&instruction, 2, value)?;
            }
            Opcode::Input => match self.pending_input.take() {
                Some(value) => self.write(&instruction, 0, value)?,
                None => return Ok(Cycle::AwaitingInput),
            },
            Opcode::Output => {
                let value = self.read(&instruction, 0)?;
                self.pc += instruction.opcode.width();
                return Ok(Cycle::Output(value));
            }
            Opcode::JumpIfTrue | Opcode::JumpIfFalse => {
                let subject = self.read(&instruction, 0)?;
                let taken = (subject != 0) == (instruction.opcode == Opcode::JumpIfTrue);
                if taken {
                    let target = self.read(&instruction, 1)?;
                    self.pc = VMMemory::resolve(target).map_err(|source| VMError::Address { pc, source })?;
                    return Ok(Cycle::Continue);
                }
            }
            Opcode::LessThan => {
                let value = self.read(&instruction, 0)? < self.read(&instruction, 1)?;
                self.write(&instruction, 2, value as i64)?;
            }
            Opcode::Equals => {
                let value = self.read(&instruction, 0)? == self.read(&instruction, 1)?;
                self.write(&instruction, 2, value as i64)?;
            }
            Opcode::AdjustBase => {
                let offset = self.read(&instruction, 0)?;
                self.relative_base = self.relative_base.wrapping_add(offset);
            }
            Opcode::Halt => {
                self.halted = true;
                return Ok(Cycle::Halted);
            }
        }

        self.pc += instruction.opcode.width();
        Ok(Cycle::Continue)
    }

    /// Raw operand cell of the zero-based parameter `index`
    fn operand(&self, index: usize) -> Result<i64, AddressError> {
        self.memory.load(self.pc + 1 + index)
    }

    fn read(&self, instruction: &Instruction, index: usize) -> Result<i64, VMError> {
        self.load_parameter(instruction, index)
            .map_err(|source| VMError::Address { pc: self.pc, source })
    }

    fn load_parameter(&self, instruction: &Instruction, index: usize) -> Result<i64, AddressError> {
        let operand = self.operand(index)?;
        match instruction.mode(index) {
            ParameterMode::Position => self.memory.load(VMMemory::resolve(operand)?),
            ParameterMode::Immediate => Ok(operand),
            ParameterMode::Relative => self
                .memory
                .load(VMMemory::resolve(self.relative_base.wrapping_add(operand))?),
        }
    }

    fn write(&mut self, instruction: &Instruction, index: usize, value: i64) -> Result<(), VMError> {
        let pc = self.pc;
        let address = self
            .target_address(instruction, index)
            .map_err(|source| VMError::Address { pc, source })?;
        self.memory
            .store(address, value)
            .map_err(|source| VMError::Address { pc, source })
    }

    fn target_address(&self, instruction: &Instruction, index: usize) -> Result<usize, AddressError> {
        let operand = self.operand(index)?;
        match instruction.mode(index) {
            ParameterMode::Position => VMMemory::resolve(operand),
            ParameterMode::Immediate => Err(AddressError::ImmediateWrite),
            ParameterMode::Relative => VMMemory::resolve(self.relative_base.wrapping_add(operand)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::errors::DecodeError;

    fn relocatable(cells: Vec<i64>) -> VM {
        VM::new(Program::new(cells), VMConfig::relocatable())
    }

    #[test]
    fn test_add_leaves_memory() {
        let mut vm = VM::new(Program::new(vec![1, 0, 0, 0, 99]), VMConfig::basic());
        assert!(vm.run_to_completion(None).unwrap().is_empty());
        assert_eq!(vm.memory().snapshot(), Some(vec![2, 0, 0, 0, 99]));
        assert!(vm.is_halted());
        assert_eq!(vm.pc(), 4);
    }

    #[test]
    fn test_immediate_multiply() {
        let mut vm = VM::new(Program::new(vec![1002, 4, 3, 4, 33]), VMConfig::extended());
        vm.run_to_completion(None).unwrap();
        assert_eq!(vm.memory().load(4), Ok(99));
    }

    #[test]
    fn test_echo_input() {
        let mut vm = VM::new(Program::new(vec![3, 0, 4, 0, 99]), VMConfig::extended());
        assert_eq!(vm.run_to_completion([7]).unwrap(), vec![7]);
    }

    #[test]
    fn test_cycle_suspends_on_input() {
        let mut vm = VM::new(Program::new(vec![3, 0, 4, 0, 99]), VMConfig::extended());
        assert_eq!(vm.cycle(), Ok(Cycle::AwaitingInput));
        assert_eq!(vm.pc(), 0);
        assert_eq!(vm.cycle(), Ok(Cycle::AwaitingInput));

        vm.provide_input(-4);
        assert_eq!(vm.cycle(), Ok(Cycle::Continue));
        assert_eq!(vm.pc(), 2);
        assert_eq!(vm.cycle(), Ok(Cycle::Output(-4)));
        assert_eq!(vm.cycle(), Ok(Cycle::Halted));
        assert_eq!(vm.pc(), 4);
        assert_eq!(vm.cycle(), Ok(Cycle::Halted));
    }

    #[test]
    fn test_input_exhausted() {
        let mut vm = VM::new(Program::new(vec![3, 0, 3, 0, 99]), VMConfig::extended());
        assert_eq!(
            vm.run_to_completion([1]),
            Err(VMError::InputExhausted { pc: 2 })
        );
    }

    #[test]
    fn test_immediate_write_is_fatal() {
        let mut vm = VM::new(Program::new(vec![11_101, 1, 1, 0, 99]), VMConfig::extended());
        assert_eq!(
            vm.run_to_completion(None),
            Err(VMError::Address {
                pc: 0,
                source: AddressError::ImmediateWrite
            })
        );
    }

    #[test]
    fn test_unknown_opcode_is_fatal() {
        // Writes 42 over the cell the next instruction is fetched from.
        let mut vm = relocatable(vec![1101, 40, 2, 4, 0]);
        assert_eq!(
            vm.run_to_completion(None),
            Err(VMError::Decode {
                pc: 4,
                source: DecodeError::UnsupportedOpcode { cell: 42, opcode: 42 }
            })
        );
    }

    #[test]
    fn test_bounded_write_out_of_range() {
        let mut vm = VM::new(Program::new(vec![1101, 1, 1, 9, 99]), VMConfig::extended());
        assert_eq!(
            vm.run_to_completion(None),
            Err(VMError::Address {
                pc: 0,
                source: AddressError::OutOfBounds { address: 9, size: 5 }
            })
        );
    }

    #[test]
    fn test_sparse_write_beyond_image() {
        let mut vm = relocatable(vec![1101, 20, 22, 1000, 4, 1000, 4, 999, 99]);
        assert_eq!(vm.run_to_completion(None).unwrap(), vec![42, 0]);
        assert_eq!(vm.memory().load(1000), Ok(42));
    }

    #[test]
    fn test_negative_address_is_fatal() {
        let mut vm = relocatable(vec![4, -1, 99]);
        assert_eq!(
            vm.run_to_completion(None),
            Err(VMError::Address {
                pc: 0,
                source: AddressError::Negative(-1)
            })
        );

        let mut vm = relocatable(vec![1105, 1, -3, 99]);
        assert_eq!(vm.run_to_completion(None).unwrap_err().pc(), 0);
    }

    #[test]
    fn test_jumps() {
        // Outputs 0 when the input is zero and 1 otherwise.
        let cells = vec![3, 3, 1105, -1, 9, 1101, 0, 0, 12, 4, 12, 99, 1];
        let mut vm = VM::new(Program::new(cells), VMConfig::extended());
        assert_eq!(vm.run_to_completion([0]).unwrap(), vec![0]);
        assert_eq!(vm.run_to_completion([5]).unwrap(), vec![1]);
    }

    #[test]
    fn test_comparisons() {
        let equal_to_eight = Program::new(vec![3, 9, 8, 9, 10, 9, 4, 9, 99, -1, 8]);
        let mut vm = VM::new(equal_to_eight, VMConfig::extended());
        assert_eq!(vm.run_to_completion([8]).unwrap(), vec![1]);
        assert_eq!(vm.run_to_completion([7]).unwrap(), vec![0]);

        let less_than_eight = Program::new(vec![3, 3, 1107, -1, 8, 3, 4, 3, 99]);
        let mut vm = VM::new(less_than_eight, VMConfig::extended());
        assert_eq!(vm.run_to_completion([3]).unwrap(), vec![1]);
        assert_eq!(vm.run_to_completion([9]).unwrap(), vec![0]);
    }

    #[test]
    fn test_adjust_base() {
        let mut vm = relocatable(vec![109, 19, 99]);
        vm.run_to_completion(None).unwrap();
        assert_eq!(vm.relative_base(), 19);

        let mut vm = relocatable(vec![109, 2000, 109, 19, 204, -34, 99]);
        assert_eq!(vm.run_to_completion(None).unwrap(), vec![0]);
        assert_eq!(vm.relative_base(), 2019);
    }

    #[test]
    fn test_rerun_resets_state() {
        let mut vm = relocatable(vec![109, 5, 21101, 3, 4, 0, 204, 0, 99]);
        let first = vm.run_to_completion(None).unwrap();
        let second = vm.run_to_completion(None).unwrap();
        assert_eq!(first, vec![7]);
        assert_eq!(first, second);
        assert_eq!(vm.relative_base(), 5);
    }

    #[tokio::test]
    async fn test_run_over_channels() {
        let mut vm = VM::new(Program::new(vec![3, 0, 4, 0, 3, 0, 4, 0, 99]), VMConfig::extended());
        let (input_tx, mut input_rx) = tokio::sync::mpsc::unbounded_channel::<i64>();
        let (mut output_tx, mut output_rx) = tokio::sync::mpsc::unbounded_channel::<i64>();
        input_tx.send(11).unwrap();
        input_tx.send(12).unwrap();
        drop(input_tx);

        vm.run(&mut input_rx, &mut output_tx).await.unwrap();
        drop(output_tx);

        assert_eq!(output_rx.recv().await, Some(11));
        assert_eq!(output_rx.recv().await, Some(12));
        assert_eq!(output_rx.recv().await, None);
    }
}
