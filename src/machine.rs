//! Core virtual machine implementation.
//!
//! The machine executes a resolved [`Program`] with a classic
//! fetch-decode-execute cycle over a fixed-capacity value stack. All
//! arithmetic uses wrapping 64-bit semantics to prevent overflow panics.
//!
//! # Architecture
//!
//! - **Stack**: fixed-capacity integer cells with bounds-checked access;
//!   cell 0 is addressable storage and `sp == 0` means empty
//! - **Program counter**: index of the next instruction to fetch
//! - **Instruction register**: the most recently fetched instruction
//! - **Halting**: there is no HALT opcode; the program counter reaching
//!   exactly one past the last instruction is the designed completion
//!   signal, while any other out-of-range counter is a fault

use crate::config::MachineConfig;
use crate::errors::ExecError;
use crate::isa::{Instruction, Opcode};
use crate::program::Program;

mod stack;
#[cfg(test)]
mod tests;

pub use stack::Stack;

/// Outcome of a single [`Machine::step`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// An instruction was fetched and executed.
    Running,
    /// The program counter reached the end of the program.
    Completed,
}

/// Summary of a run that completed normally.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Termination {
    /// Number of instructions executed.
    pub steps: u64,
}

/// Stack-based virtual machine executing a resolved [`Program`].
///
/// Each machine owns its stack, program counter, and instruction register
/// exclusively; run the same program on several machines by cloning it.
/// A machine that returns an [`ExecError`] is permanently stopped.
#[derive(Debug)]
pub struct Machine {
    program: Program,
    stack: Stack,
    pc: usize,
    ir: Option<Instruction>,
    step_limit: Option<u64>,
    /// First fault, if any; a faulted machine repeats it on every step.
    faulted: Option<ExecError>,
}

impl Machine {
    /// Creates a machine with default limits.
    pub fn new(program: Program) -> Self {
        Self::with_config(program, MachineConfig::default())
    }

    /// Creates a machine with the given limits.
    pub fn with_config(program: Program, config: MachineConfig) -> Self {
        Self {
            program,
            stack: Stack::new(config.stack_capacity),
            pc: 0,
            ir: None,
            step_limit: config.step_limit,
            faulted: None,
        }
    }

    /// Live stack contents from bottom to top.
    pub fn stack(&self) -> &[i64] {
        self.stack.values()
    }

    /// Index of the current top-of-stack cell.
    pub fn stack_pointer(&self) -> usize {
        self.stack.pointer()
    }

    /// Index of the next instruction to fetch.
    pub fn program_counter(&self) -> usize {
        self.pc
    }

    /// The most recently fetched instruction, `None` before the first step.
    pub fn instruction_register(&self) -> Option<&Instruction> {
        self.ir.as_ref()
    }

    /// Fetches and executes the next instruction.
    ///
    /// A program counter exactly one past the last instruction completes
    /// the run; any other out-of-range counter is a
    /// [`ExecError::PcOutOfRange`] fault. A fault is terminal: every later
    /// step returns the same error.
    pub fn step(&mut self) -> Result<Status, ExecError> {
        if let Some(err) = self.faulted {
            return Err(err);
        }
        match self.try_step() {
            Ok(status) => Ok(status),
            Err(err) => {
                self.faulted = Some(err);
                Err(err)
            }
        }
    }

    fn try_step(&mut self) -> Result<Status, ExecError> {
        if self.pc == self.program.len() {
            return Ok(Status::Completed);
        }
        let instruction = self
            .program
            .get(self.pc)
            .cloned()
            .ok_or(ExecError::PcOutOfRange {
                pc: self.pc as i64,
                len: self.program.len(),
            })?;
        self.pc += 1;
        let outcome = self.exec(&instruction);
        self.ir = Some(instruction);
        outcome?;
        Ok(Status::Running)
    }

    /// Runs until completion, a fault, or an exhausted step budget.
    pub fn run(&mut self) -> Result<Termination, ExecError> {
        let mut steps = 0u64;
        loop {
            match self.step()? {
                Status::Completed => return Ok(Termination { steps }),
                Status::Running => {
                    steps += 1;
                    if let Some(limit) = self.step_limit {
                        if steps > limit {
                            return Err(ExecError::StepLimitExceeded { limit });
                        }
                    }
                }
            }
        }
    }

    /// Executes a single instruction against the stack.
    fn exec(&mut self, instruction: &Instruction) -> Result<(), ExecError> {
        match instruction.opcode() {
            Opcode::Loadc => self.stack.push(instruction.arg(0)),
            Opcode::Add => self.op_binary(i64::wrapping_add),
            Opcode::Sub => self.op_binary(i64::wrapping_sub),
            Opcode::Mul => self.op_binary(i64::wrapping_mul),
            Opcode::Div => self.op_div(),
            Opcode::Mod => self.op_mod(),
            Opcode::And => self.op_binary(|a, b| a & b),
            Opcode::Or => self.op_binary(|a, b| a | b),
            Opcode::Xor => self.op_binary(|a, b| a ^ b),
            Opcode::Eq => self.op_compare(|a, b| a == b),
            Opcode::Neq => self.op_compare(|a, b| a != b),
            Opcode::Le => self.op_compare(|a, b| a < b),
            Opcode::Leq => self.op_compare(|a, b| a <= b),
            Opcode::Gr => self.op_compare(|a, b| a > b),
            Opcode::Geq => self.op_compare(|a, b| a >= b),
            Opcode::Not => self.op_not(),
            Opcode::Neg => self.op_neg(),
            Opcode::Load => self.op_load(instruction.arg(0)),
            Opcode::Store => self.op_store(instruction.arg(0)),
            Opcode::Loada => self.op_loada(instruction.arg(0)),
            Opcode::Storea => self.op_storea(instruction.arg(0)),
            Opcode::Pop => self.stack.pop().map(|_| ()),
            Opcode::Jump => self.set_pc(instruction.arg(0)),
            Opcode::Jumpz => self.op_jumpz(instruction.arg(0)),
            Opcode::Jumpi => self.op_jumpi(instruction.arg(0)),
            Opcode::Dup => self.op_dup(),
            Opcode::Alloc => self.stack.adjust(instruction.arg(0)),
        }
    }

    /// Pops two operands and pushes `op(second-from-top, top)`.
    fn op_binary(&mut self, op: impl Fn(i64, i64) -> i64) -> Result<(), ExecError> {
        let b = self.stack.pop()?;
        let a = self.stack.top()?;
        self.stack.set_top(op(a, b))
    }

    fn op_div(&mut self) -> Result<(), ExecError> {
        let b = self.stack.pop()?;
        if b == 0 {
            return Err(ExecError::DivisionByZero);
        }
        let a = self.stack.top()?;
        self.stack.set_top(a.wrapping_div(b))
    }

    fn op_mod(&mut self) -> Result<(), ExecError> {
        let b = self.stack.pop()?;
        if b == 0 {
            return Err(ExecError::DivisionByZero);
        }
        let a = self.stack.top()?;
        self.stack.set_top(a.wrapping_rem(b))
    }

    /// Pops two operands and pushes 1 or 0 for `cmp(second-from-top, top)`.
    fn op_compare(&mut self, cmp: impl Fn(i64, i64) -> bool) -> Result<(), ExecError> {
        let b = self.stack.pop()?;
        let a = self.stack.top()?;
        self.stack.set_top(if cmp(a, b) { 1 } else { 0 })
    }

    /// Boolean complement of the top in place: 0 becomes 1, anything else 0.
    fn op_not(&mut self) -> Result<(), ExecError> {
        let v = self.stack.top()?;
        self.stack.set_top(if v == 0 { 1 } else { 0 })
    }

    fn op_neg(&mut self) -> Result<(), ExecError> {
        let v = self.stack.top()?;
        self.stack.set_top(v.wrapping_neg())
    }

    /// Block load: the top holds a base address; the `m` cells starting
    /// there replace the address cell and the cells above it. Copies run
    /// top-down so the address cell is overwritten last.
    fn op_load(&mut self, m: i64) -> Result<(), ExecError> {
        let address = self.stack.top()?;
        let sp = self.stack.pointer() as i64;
        for i in (0..m).rev() {
            let value = self.stack.get(address.saturating_add(i))?;
            self.stack.set(sp.saturating_add(i), value)?;
        }
        self.stack.adjust(m.saturating_sub(1))
    }

    /// Block store, the mirror of [`Self::op_load`]: the `n` cells below
    /// the address on top are copied to the addressed cells. The stack
    /// pointer moves by `n - 1`, exactly like a load of the same width.
    fn op_store(&mut self, n: i64) -> Result<(), ExecError> {
        let address = self.stack.top()?;
        let sp = self.stack.pointer() as i64;
        for i in (0..n).rev() {
            let value = self.stack.get(sp - n + i)?;
            self.stack.set(address.saturating_add(i), value)?;
        }
        self.stack.adjust(n.saturating_sub(1))
    }

    /// Direct-address load: pushes the value of cell `q`.
    fn op_loada(&mut self, q: i64) -> Result<(), ExecError> {
        let value = self.stack.get(q)?;
        self.stack.push(value)
    }

    /// Direct-address store: writes the top into cell `q`, keeping the top.
    fn op_storea(&mut self, q: i64) -> Result<(), ExecError> {
        let value = self.stack.top()?;
        self.stack.set(q, value)
    }

    fn op_jumpz(&mut self, target: i64) -> Result<(), ExecError> {
        if self.stack.pop()? == 0 {
            self.set_pc(target)
        } else {
            Ok(())
        }
    }

    /// Indexed jump: continues at top-of-stack plus `offset`, leaving the
    /// index on the stack.
    fn op_jumpi(&mut self, offset: i64) -> Result<(), ExecError> {
        let base = self.stack.top()?;
        self.set_pc(base.saturating_add(offset))
    }

    fn op_dup(&mut self) -> Result<(), ExecError> {
        let value = self.stack.top()?;
        self.stack.push(value)
    }

    /// Redirects the program counter. Negative targets fault immediately;
    /// targets past the end are caught by the next fetch.
    fn set_pc(&mut self, target: i64) -> Result<(), ExecError> {
        if target < 0 {
            return Err(ExecError::PcOutOfRange {
                pc: target,
                len: self.program.len(),
            });
        }
        self.pc = target as usize;
        Ok(())
    }
}
