//! Assembler and stack-based virtual machine for the CMa abstract machine.
//!
//! Source text is assembled into a resolved [`program::Program`] whose
//! control-flow arguments are absolute instruction indices, then executed
//! by a [`machine::Machine`] one fetch-decode-execute step at a time.
//!
//! # Modules
//!
//! - [`isa`]: instruction set definition and the [`isa::Instruction`] type
//! - [`assembler`]: assembly parsing, label resolution, and diagnostics
//! - [`program`]: the resolved instruction sequence
//! - [`machine`]: the execution loop and the bounds-checked value stack
//! - [`config`]: runtime limits (stack capacity, step budget)
//! - [`errors`]: assembly and execution error types
//! - [`log`]: leveled stderr logging
//!
//! # Example
//!
//! ```
//! use cma::assembler::assemble_source;
//! use cma::machine::Machine;
//!
//! let program = assemble_source("LOADC 3\nLOADC 4\nADD").unwrap();
//! let mut machine = Machine::new(program);
//! machine.run().unwrap();
//! assert_eq!(machine.stack(), [7]);
//! ```

pub mod assembler;
pub mod config;
pub mod errors;
pub mod isa;
pub mod log;
pub mod machine;
pub mod program;
