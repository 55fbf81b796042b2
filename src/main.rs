//! Command-line driver for the CMa runtime.
//!
//! Assembles a source file and runs it to completion, printing the final
//! stack.
//!
//! # Usage
//! ```text
//! cma <program.cma> [OPTIONS]
//! ```
//!
//! # Options
//! - `--stack-size <cells>`: value stack capacity (default 100)
//! - `--step-limit <steps>`: abort after this many executed instructions
//! - `--trace`: log each executed instruction with its index

use cma::assembler::assemble_file;
use cma::config::MachineConfig;
use cma::errors::ExecError;
use cma::machine::{Machine, Status, Termination};
use cma::{error, info};
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let path = &args[1];
    let mut config = MachineConfig::default();
    let mut trace = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--stack-size" => {
                i += 1;
                config.stack_capacity = numeric_option(&args, i, "--stack-size");
            }
            "--step-limit" => {
                i += 1;
                config.step_limit = Some(numeric_option(&args, i, "--step-limit"));
            }
            "--trace" => trace = true,
            other => {
                eprintln!("Unknown option: {}", other);
                print_usage(&args[0]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let program = match assemble_file(path) {
        Ok(program) => program,
        Err(err) => {
            error!("assembly failed: {err}");
            process::exit(1);
        }
    };
    info!("assembled {} instructions from {}", program.len(), path);

    let step_limit = config.step_limit;
    let mut machine = Machine::with_config(program, config);
    let result = if trace {
        run_traced(&mut machine, step_limit)
    } else {
        machine.run()
    };

    match result {
        Ok(termination) => {
            info!("completed after {} steps", termination.steps);
            println!("stack (bottom to top): {:?}", machine.stack());
        }
        Err(err) => {
            error!("execution failed: {err}");
            process::exit(1);
        }
    }
}

/// Step loop that logs each executed instruction with its index.
fn run_traced(machine: &mut Machine, step_limit: Option<u64>) -> Result<Termination, ExecError> {
    let mut steps = 0u64;
    loop {
        let pc = machine.program_counter();
        match machine.step()? {
            Status::Completed => return Ok(Termination { steps }),
            Status::Running => {
                steps += 1;
                if let Some(instruction) = machine.instruction_register() {
                    info!("{pc:>4}: {instruction}");
                }
                if let Some(limit) = step_limit {
                    if steps > limit {
                        return Err(ExecError::StepLimitExceeded { limit });
                    }
                }
            }
        }
    }
}

/// Parses the numeric value following a flag, exiting with usage on error.
fn numeric_option<T: std::str::FromStr>(args: &[String], index: usize, flag: &str) -> T {
    match args.get(index).and_then(|v| v.parse().ok()) {
        Some(value) => value,
        None => {
            eprintln!("{} requires a numeric argument", flag);
            process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <program.cma> [OPTIONS]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --stack-size <cells>   Value stack capacity (default 100)");
    eprintln!("  --step-limit <steps>   Abort after this many executed instructions");
    eprintln!("  --trace                Log each executed instruction");
}
