//! Runtime limits for the machine.
//!
//! Configuration specifies constraints only; enforcement happens inside
//! [`Machine`](crate::machine::Machine).

/// Default number of value-stack cells.
pub const DEFAULT_STACK_CAPACITY: usize = 100;

/// Machine limits.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Number of value-stack cells available to the program.
    pub stack_capacity: usize,

    /// Upper bound on executed instructions before a run is aborted.
    /// `None` runs without a budget; a malformed program may then loop
    /// forever.
    pub step_limit: Option<u64>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            step_limit: None,
        }
    }
}

impl MachineConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self::default()
    }
}
