use super::*;
use crate::assembler::assemble_source;

fn run_machine(source: &str) -> Machine {
    let program = assemble_source(source).expect("assembly failed");
    let mut machine = Machine::new(program);
    machine.run().expect("run failed");
    machine
}

fn run_stack(source: &str) -> Vec<i64> {
    run_machine(source).stack().to_vec()
}

fn run_top(source: &str) -> i64 {
    *run_machine(source).stack().last().expect("stack is empty")
}

fn run_expect_err(source: &str) -> ExecError {
    let program = assemble_source(source).expect("assembly failed");
    Machine::new(program).run().expect_err("expected error")
}

fn run_with_config(source: &str, config: MachineConfig) -> Result<Termination, ExecError> {
    let program = assemble_source(source).expect("assembly failed");
    Machine::with_config(program, config).run()
}

// ==================== Constants and arithmetic ====================

#[test]
fn loadc_pushes_a_constant() {
    assert_eq!(run_stack("LOADC 7"), [7]);
    assert_eq!(run_stack("LOADC -7"), [-7]);
}

#[test]
fn add_two_constants() {
    let machine = run_machine("LOADC 3\nLOADC 4\nADD");
    assert_eq!(machine.stack(), [7]);
}

#[test]
fn sub_is_second_from_top_minus_top() {
    assert_eq!(run_top("LOADC 10\nLOADC 4\nSUB"), 6);
}

#[test]
fn mul() {
    assert_eq!(run_top("LOADC 6\nLOADC 7\nMUL"), 42);
}

#[test]
fn div_truncates_toward_zero() {
    assert_eq!(run_top("LOADC 13\nLOADC 4\nDIV"), 3);
    assert_eq!(run_top("LOADC -7\nLOADC 2\nDIV"), -3);
}

#[test]
fn modulo() {
    assert_eq!(run_top("LOADC 13\nLOADC 4\nMOD"), 1);
    assert_eq!(run_top("LOADC -7\nLOADC 2\nMOD"), -1);
}

#[test]
fn div_by_zero_faults() {
    assert_eq!(
        run_expect_err("LOADC 10\nLOADC 0\nDIV"),
        ExecError::DivisionByZero
    );
}

#[test]
fn mod_by_zero_faults() {
    assert_eq!(
        run_expect_err("LOADC 10\nLOADC 0\nMOD"),
        ExecError::DivisionByZero
    );
}

#[test]
fn mod_does_not_bleed_into_other_ops() {
    // A MOD followed by nothing leaves exactly one value behind.
    let machine = run_machine("LOADC 13\nLOADC 4\nMOD");
    assert_eq!(machine.stack(), [1]);
}

#[test]
fn bitwise_and_or_xor() {
    assert_eq!(run_top("LOADC 12\nLOADC 10\nAND"), 8);
    assert_eq!(run_top("LOADC 12\nLOADC 10\nOR"), 14);
    assert_eq!(run_top("LOADC 12\nLOADC 10\nXOR"), 6);
}

#[test]
fn arithmetic_wraps_instead_of_panicking() {
    let source = format!("LOADC {}\nLOADC 1\nADD", i64::MAX);
    assert_eq!(run_top(&source), i64::MIN);
}

// ==================== Comparisons ====================

#[test]
fn eq_and_neq() {
    assert_eq!(run_top("LOADC 5\nLOADC 5\nEQ"), 1);
    assert_eq!(run_top("LOADC 5\nLOADC 6\nEQ"), 0);
    assert_eq!(run_top("LOADC 5\nLOADC 6\nNEQ"), 1);
    assert_eq!(run_top("LOADC 5\nLOADC 5\nNEQ"), 0);
}

#[test]
fn le_is_strictly_less() {
    assert_eq!(run_top("LOADC 4\nLOADC 5\nLE"), 1);
    assert_eq!(run_top("LOADC 5\nLOADC 5\nLE"), 0);
}

#[test]
fn leq_admits_equality() {
    assert_eq!(run_top("LOADC 5\nLOADC 5\nLEQ"), 1);
    assert_eq!(run_top("LOADC 6\nLOADC 5\nLEQ"), 0);
}

#[test]
fn gr_is_strictly_greater() {
    assert_eq!(run_top("LOADC 6\nLOADC 5\nGR"), 1);
    assert_eq!(run_top("LOADC 5\nLOADC 5\nGR"), 0);
}

#[test]
fn geq_admits_equality() {
    assert_eq!(run_top("LOADC 5\nLOADC 5\nGEQ"), 1);
    assert_eq!(run_top("LOADC 4\nLOADC 5\nGEQ"), 0);
}

// ==================== Negation ====================

#[test]
fn not_is_boolean_complement() {
    assert_eq!(run_top("LOADC 0\nNOT"), 1);
    assert_eq!(run_top("LOADC 5\nNOT"), 0);
    assert_eq!(run_top("LOADC -3\nNOT"), 0);
}

#[test]
fn neg_is_arithmetic_negation() {
    assert_eq!(run_top("LOADC 5\nNEG"), -5);
    assert_eq!(run_top("LOADC -5\nNEG"), 5);
    assert_eq!(run_top("LOADC 5\nNEG\nNEG"), 5);
}

// ==================== Stack manipulation ====================

#[test]
fn dup_copies_the_top() {
    assert_eq!(run_stack("LOADC 9\nDUP"), [9, 9]);
}

#[test]
fn pop_discards_the_top() {
    assert_eq!(run_stack("LOADC 1\nLOADC 2\nPOP"), [1]);
}

// ==================== Memory ====================

#[test]
fn load_one_cell() {
    // Cell 1 holds 42; the address 1 on top is replaced by its contents.
    assert_eq!(run_stack("LOADC 42\nLOADC 1\nLOAD 1"), [42, 42]);
}

#[test]
fn load_block_of_two() {
    let stack = run_stack("LOADC 11\nLOADC 22\nLOADC 1\nLOAD 2");
    assert_eq!(stack, [11, 22, 11, 22]);
}

#[test]
fn store_block_of_two() {
    // Two zeroed cells are reserved, then the values 7 and 8 are stored
    // into cells 1 and 2 through the address on top. The stack pointer
    // moves up by n - 1, mirroring LOAD.
    let stack = run_stack("ALLOC 2\nLOADC 7\nLOADC 8\nLOADC 1\nSTORE 2");
    assert_eq!(stack, [7, 8, 7, 8, 1, 0]);
}

#[test]
fn load_out_of_range_address_faults() {
    assert!(matches!(
        run_expect_err("LOADC 5000\nLOAD 1"),
        ExecError::AddressOutOfRange { address: 5000, .. }
    ));
}

#[test]
fn loada_pushes_an_addressed_cell() {
    assert_eq!(run_stack("LOADC 9\nSTOREA 0\nPOP\nLOADA 0"), [9]);
}

#[test]
fn storea_keeps_the_top() {
    let machine = run_machine("LOADC 9\nSTOREA 0");
    assert_eq!(machine.stack(), [9]);
}

#[test]
fn loada_out_of_range_faults() {
    assert!(matches!(
        run_expect_err("LOADA 500"),
        ExecError::AddressOutOfRange { address: 500, .. }
    ));
    assert!(matches!(
        run_expect_err("LOADA -1"),
        ExecError::AddressOutOfRange { address: -1, .. }
    ));
}

#[test]
fn alloc_reserves_zeroed_cells() {
    let machine = run_machine("ALLOC 3");
    assert_eq!(machine.stack(), [0, 0, 0]);
    assert_eq!(machine.stack_pointer(), 3);
}

#[test]
fn alloc_negative_releases_cells() {
    assert_eq!(run_stack("LOADC 1\nLOADC 2\nALLOC -1"), [1]);
}

#[test]
fn alloc_past_capacity_overflows() {
    assert!(matches!(
        run_expect_err("ALLOC 1000"),
        ExecError::StackOverflow { .. }
    ));
}

// ==================== Stack bounds ====================

#[test]
fn binary_op_on_short_stack_underflows() {
    assert_eq!(run_expect_err("LOADC 1\nADD"), ExecError::StackUnderflow);
}

#[test]
fn pop_on_empty_stack_underflows() {
    assert_eq!(run_expect_err("POP"), ExecError::StackUnderflow);
}

#[test]
fn push_past_configured_capacity_overflows() {
    let config = MachineConfig {
        stack_capacity: 3,
        step_limit: None,
    };
    assert_eq!(
        run_with_config("LOADC 1\nLOADC 2\nLOADC 3", config),
        Err(ExecError::StackOverflow { capacity: 3 })
    );
}

// ==================== Control flow ====================

#[test]
fn jump_is_unconditional() {
    assert_eq!(run_stack("JUMP end\nLOADC 1\nend: LOADC 2"), [2]);
}

#[test]
fn jumpz_taken_on_zero() {
    let machine = run_machine("LOADC 0\nJUMPZ end\nLOADC 1\nend:");
    assert!(machine.stack().is_empty());
}

#[test]
fn jumpz_consumes_a_nonzero_top_without_jumping() {
    let machine = run_machine("LOADC 5\nJUMPZ end\nLOADC 1\nend:");
    assert_eq!(machine.stack(), [1]);
}

#[test]
fn jumpi_adds_the_top_to_its_offset_without_popping() {
    // Selector 1 plus offset 2 lands on the last instruction.
    let stack = run_stack("LOADC 1\nJUMPI 2\nLOADC 10\nLOADC 20");
    assert_eq!(stack, [1, 20]);
}

#[test]
fn backward_jump_loops() {
    // Count 3 down to 0, then discard the counter.
    let source = r#"
        LOADC 3
        loop: DUP
        JUMPZ done
        LOADC 1
        SUB
        JUMP loop
        done: POP
    "#;
    let machine = run_machine(source);
    assert!(machine.stack().is_empty());
}

// ==================== Termination ====================

#[test]
fn falling_off_the_end_completes() {
    let program = assemble_source("LOADC 1").unwrap();
    let mut machine = Machine::new(program);
    assert_eq!(machine.run(), Ok(Termination { steps: 1 }));
}

#[test]
fn jump_to_exactly_program_length_completes() {
    let program = assemble_source("LOADC 1\nJUMP 2").unwrap();
    let mut machine = Machine::new(program);
    assert_eq!(machine.run(), Ok(Termination { steps: 2 }));
    assert_eq!(machine.stack(), [1]);
}

#[test]
fn jump_past_program_length_faults() {
    assert_eq!(
        run_expect_err("JUMP 99"),
        ExecError::PcOutOfRange { pc: 99, len: 1 }
    );
}

#[test]
fn jump_to_negative_target_faults() {
    assert_eq!(
        run_expect_err("JUMP -1"),
        ExecError::PcOutOfRange { pc: -1, len: 1 }
    );
}

#[test]
fn run_counts_executed_steps() {
    let program = assemble_source("LOADC 3\nLOADC 4\nADD").unwrap();
    let mut machine = Machine::new(program);
    assert_eq!(machine.run(), Ok(Termination { steps: 3 }));
}

#[test]
fn infinite_loop_exhausts_the_step_budget() {
    let config = MachineConfig {
        stack_capacity: 16,
        step_limit: Some(10),
    };
    assert_eq!(
        run_with_config("loop: JUMP loop", config),
        Err(ExecError::StepLimitExceeded { limit: 10 })
    );
}

#[test]
fn program_within_the_step_budget_completes() {
    let config = MachineConfig {
        stack_capacity: 16,
        step_limit: Some(3),
    };
    assert_eq!(
        run_with_config("LOADC 3\nLOADC 4\nADD", config),
        Ok(Termination { steps: 3 })
    );
}

// ==================== Step semantics ====================

#[test]
fn instruction_register_tracks_the_fetch() {
    let program = assemble_source("LOADC 5").unwrap();
    let mut machine = Machine::new(program);
    assert!(machine.instruction_register().is_none());

    assert_eq!(machine.step(), Ok(Status::Running));
    let fetched = machine.instruction_register().unwrap();
    assert_eq!(fetched.opcode(), Opcode::Loadc);
    assert_eq!(machine.program_counter(), 1);

    assert_eq!(machine.step(), Ok(Status::Completed));
}

#[test]
fn faulted_machine_repeats_its_error() {
    let program = assemble_source("POP").unwrap();
    let mut machine = Machine::new(program);
    assert_eq!(machine.step(), Err(ExecError::StackUnderflow));
    assert_eq!(machine.step(), Err(ExecError::StackUnderflow));
    assert_eq!(machine.run(), Err(ExecError::StackUnderflow));
}

#[test]
fn completed_machine_stays_completed() {
    let program = assemble_source("LOADC 1").unwrap();
    let mut machine = Machine::new(program);
    machine.run().unwrap();
    assert_eq!(machine.step(), Ok(Status::Completed));
    assert_eq!(machine.stack(), [1]);
}

#[test]
fn one_program_runs_on_independent_machines() {
    let program = assemble_source("LOADC 3\nLOADC 4\nADD").unwrap();
    let mut first = Machine::new(program.clone());
    let mut second = Machine::new(program);
    first.run().unwrap();
    second.run().unwrap();
    assert_eq!(first.stack(), second.stack());
}
