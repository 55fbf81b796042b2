//! Assembly and execution error types.
//!
//! The two taxonomies are deliberately separate: a program is assembled once
//! and run many times, and embedders handle the failures at different points.
//! [`AsmError`] carries a 1-based source position; [`ExecError`] describes a
//! fault that permanently stops a [`Machine`](crate::machine::Machine).

use thiserror::Error;

/// Cause of an assembly failure, without source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmErrorKind {
    /// Mnemonic does not name any opcode.
    #[error("unknown instruction `{0}`")]
    UnknownMnemonic(String),
    /// Wrong number of arguments for an instruction.
    #[error("instruction {mnemonic} expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        mnemonic: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Reference to a label that is never declared.
    #[error("unknown label `{0}`")]
    UndefinedLabel(String),
    /// Argument token is neither a label nor a decimal integer.
    #[error("invalid argument `{0}`, expected integer literal or label")]
    InvalidIntegerLiteral(String),
    /// Label declared more than once.
    #[error("label `{label}` is already declared at line {first_line}")]
    DuplicateLabel { label: String, first_line: usize },
    /// A `/` that does not start a `//` comment.
    #[error("malformed comment, expected `//`")]
    MalformedComment,
    /// Leftover content the grammar cannot place.
    #[error("unexpected character `{0}`")]
    UnexpectedCharacter(char),
    /// Label declaration without a closing `:` before the end of the line.
    #[error("label is not terminated by `:`")]
    UnterminatedLabel,
    /// A `:` with no label name in front of it.
    #[error("empty label")]
    EmptyLabel,
}

/// An assembly failure. No partial program is ever produced alongside one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    /// The source file could not be read.
    #[error("{path}: {reason}")]
    Io { path: String, reason: String },
    /// The source text failed to parse or resolve.
    #[error("line {line}: {kind}")]
    Syntax {
        line: usize,
        column: usize,
        kind: AsmErrorKind,
    },
}

impl AsmError {
    /// Attaches a 1-based source position to an error cause.
    pub(crate) fn at(line: usize, column: usize, kind: AsmErrorKind) -> Self {
        AsmError::Syntax { line, column, kind }
    }
}

/// A runtime fault. The machine that raised it is permanently stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecError {
    /// Stack pointer would move past the last cell.
    #[error("stack overflow: capacity of {capacity} cells exceeded")]
    StackOverflow { capacity: usize },
    /// Stack pointer would move below the bottom of the stack.
    #[error("stack underflow")]
    StackUnderflow,
    /// Absolute address outside the stack memory.
    #[error("address {address} outside stack memory of {capacity} cells")]
    AddressOutOfRange { address: i64, capacity: usize },
    /// Division or modulo with a zero divisor.
    #[error("division by zero")]
    DivisionByZero,
    /// Program counter outside the program, other than the designed
    /// one-past-the-end halt position.
    #[error("program counter {pc} outside program of {len} instructions")]
    PcOutOfRange { pc: i64, len: usize },
    /// The configured execution budget ran out before the program completed.
    #[error("step limit of {limit} executed instructions exceeded")]
    StepLimitExceeded { limit: u64 },
}
