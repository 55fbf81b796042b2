//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! opcode table (variant name, mnemonic, arity) and invokes a callback macro
//! for code generation, so every piece of opcode-derived code comes from one
//! definition list.
//!
//! This module generates:
//! - The [`Opcode`] enum with mnemonic and arity lookups
//! - [`Opcode::from_mnemonic`] for case-insensitive assembly parsing
//!
//! [`Instruction`] pairs an opcode with its integer arguments and enforces
//! the arity at construction; nothing downstream ever re-validates it.

use crate::errors::AsmErrorKind;
use std::fmt;

/// Invokes a callback macro with the complete opcode definition list.
///
/// This macro enables code generation for opcodes in multiple modules
/// without duplicating the definitions.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// LOADC c ; push the constant c
            Loadc = "LOADC", 1,
            // =========================
            // Arithmetic and logic
            // =========================
            /// ADD ; pop b, pop a, push a + b
            Add = "ADD", 0,
            /// SUB ; pop b, pop a, push a - b
            Sub = "SUB", 0,
            /// MUL ; pop b, pop a, push a * b
            Mul = "MUL", 0,
            /// DIV ; pop b, pop a, push a / b (fails on b == 0)
            Div = "DIV", 0,
            /// MOD ; pop b, pop a, push a % b (fails on b == 0)
            Mod = "MOD", 0,
            /// AND ; pop b, pop a, push a & b
            And = "AND", 0,
            /// OR ; pop b, pop a, push a | b
            Or = "OR", 0,
            /// XOR ; pop b, pop a, push a ^ b
            Xor = "XOR", 0,
            // =========================
            // Comparison
            // =========================
            /// EQ ; pop b, pop a, push 1 if a == b else 0
            Eq = "EQ", 0,
            /// NEQ ; pop b, pop a, push 1 if a != b else 0
            Neq = "NEQ", 0,
            /// LE ; pop b, pop a, push 1 if a < b else 0
            Le = "LE", 0,
            /// LEQ ; pop b, pop a, push 1 if a <= b else 0
            Leq = "LEQ", 0,
            /// GR ; pop b, pop a, push 1 if a > b else 0
            Gr = "GR", 0,
            /// GEQ ; pop b, pop a, push 1 if a >= b else 0
            Geq = "GEQ", 0,
            // =========================
            // Negation
            // =========================
            /// NOT ; replace the top with 1 if it is 0, else with 0
            Not = "NOT", 0,
            /// NEG ; arithmetically negate the top in place
            Neg = "NEG", 0,
            // =========================
            // Memory
            // =========================
            /// LOAD m ; pop address a, push the m cells at a..a+m
            Load = "LOAD", 1,
            /// STORE n ; copy the n cells below the top into the address on top
            Store = "STORE", 1,
            /// LOADA q ; push the value of cell q
            Loada = "LOADA", 1,
            /// STOREA q ; write the top into cell q, keeping the top
            Storea = "STOREA", 1,
            /// POP ; discard the top
            Pop = "POP", 0,
            // =========================
            // Control flow
            // =========================
            /// JUMP t ; continue at instruction t
            Jump = "JUMP", 1,
            /// JUMPZ t ; pop the top, continue at t if it was zero
            Jumpz = "JUMPZ", 1,
            /// JUMPI t ; continue at top-of-stack + t, without popping
            Jumpi = "JUMPI", 1,
            /// DUP ; push a copy of the top
            Dup = "DUP", 0,
            /// ALLOC k ; reserve k stack cells
            Alloc = "ALLOC", 1,
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal, $arity:expr
        ),* $(,)?
    ) => {
        /// Operation tag of a single instruction.
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Opcode {
            /// All opcodes in definition order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            /// Returns the assembly mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the number of arguments this opcode requires.
            pub const fn arity(&self) -> usize {
                match self {
                    $( Opcode::$name => $arity, )*
                }
            }

            /// Looks up an opcode by mnemonic, ignoring ASCII case.
            pub fn from_mnemonic(name: &str) -> Option<Opcode> {
                $(
                    if name.eq_ignore_ascii_case($mnemonic) {
                        return Some(Opcode::$name);
                    }
                )*
                None
            }
        }
    };
}

for_each_opcode!(define_opcodes);

/// A single resolved instruction: an opcode plus its integer arguments.
///
/// Immutable once constructed; the argument count always matches the
/// opcode's arity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    opcode: Opcode,
    args: Vec<i64>,
}

impl Instruction {
    /// Builds an instruction, rejecting argument lists that do not match
    /// the opcode's arity.
    pub fn new(opcode: Opcode, args: Vec<i64>) -> Result<Self, AsmErrorKind> {
        if args.len() != opcode.arity() {
            return Err(AsmErrorKind::ArityMismatch {
                mnemonic: opcode.mnemonic(),
                expected: opcode.arity(),
                actual: args.len(),
            });
        }
        Ok(Self { opcode, args })
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn args(&self) -> &[i64] {
        &self.args
    }

    /// Argument at `index`. Callers rely on the arity invariant established
    /// at construction.
    pub fn arg(&self, index: usize) -> i64 {
        self.args[index]
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.mnemonic())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_lookup_is_case_insensitive() {
        assert_eq!(Opcode::from_mnemonic("LOADC"), Some(Opcode::Loadc));
        assert_eq!(Opcode::from_mnemonic("loadc"), Some(Opcode::Loadc));
        assert_eq!(Opcode::from_mnemonic("JuMpZ"), Some(Opcode::Jumpz));
    }

    #[test]
    fn mnemonic_lookup_unknown() {
        assert_eq!(Opcode::from_mnemonic("HALT"), None);
        assert_eq!(Opcode::from_mnemonic(""), None);
    }

    #[test]
    fn mnemonic_round_trips_through_lookup() {
        for &opcode in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(opcode.mnemonic()), Some(opcode));
        }
    }

    #[test]
    fn arity_table() {
        let unary = [
            Opcode::Loadc,
            Opcode::Load,
            Opcode::Store,
            Opcode::Loada,
            Opcode::Storea,
            Opcode::Jump,
            Opcode::Jumpz,
            Opcode::Jumpi,
            Opcode::Alloc,
        ];
        for &opcode in Opcode::ALL {
            let expected = if unary.contains(&opcode) { 1 } else { 0 };
            assert_eq!(opcode.arity(), expected, "arity of {opcode:?}");
        }
    }

    #[test]
    fn construction_succeeds_for_matching_arity() {
        for &opcode in Opcode::ALL {
            let args = vec![0; opcode.arity()];
            assert!(Instruction::new(opcode, args).is_ok(), "{opcode:?}");
        }
    }

    #[test]
    fn construction_rejects_mismatched_arity() {
        for &opcode in Opcode::ALL {
            let args = vec![0; opcode.arity() + 1];
            assert!(matches!(
                Instruction::new(opcode, args),
                Err(AsmErrorKind::ArityMismatch { .. })
            ));
        }
    }

    #[test]
    fn display_renders_mnemonic_and_args() {
        let instr = Instruction::new(Opcode::Loadc, vec![-7]).unwrap();
        assert_eq!(instr.to_string(), "LOADC -7");
        let instr = Instruction::new(Opcode::Add, vec![]).unwrap();
        assert_eq!(instr.to_string(), "ADD");
    }
}
