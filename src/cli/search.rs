use clap::{Arg, ArgMatches, Command};
use itertools::iproduct;
use log::{debug, trace};
use serde_json::json;
use std::path::PathBuf;

use crate::cli::errors::AppError;
use crate::cli::program::{load_program, required};
use crate::events::Event;
use crate::vm::{Program, ProgramError, VMConfig, VM};

pub const NOUN_ADDRESS: usize = 1;
pub const VERB_ADDRESS: usize = 2;

pub fn search_command() -> Command {
    Command::new("search")
        .about("Find the noun and verb that leave the target value in cell 0")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Program file (comma-separated text or .json array)")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .value_name("N")
                .help("Value cell 0 must hold when the program halts")
                .required(true)
                .allow_hyphen_values(true)
                .value_parser(clap::value_parser!(i64)),
        )
}

/// Try every noun and verb in `0..=99`, returning the first pair whose run
/// leaves `target` in cell 0. Candidates whose run faults are skipped.
pub fn find_noun_verb(
    program: &Program,
    config: VMConfig,
    target: i64,
) -> Result<Option<(i64, i64)>, ProgramError> {
    for (noun, verb) in iproduct!(0..=99, 0..=99) {
        let candidate = program.patched(&[(NOUN_ADDRESS, noun), (VERB_ADDRESS, verb)])?;
        let mut vm = VM::new(candidate, config);
        match vm.run_to_completion(std::iter::empty()) {
            Ok(_) if vm.memory().load(0) == Ok(target) => {
                debug!("noun {} verb {} reaches {}", noun, verb, target);
                return Ok(Some((noun, verb)));
            }
            Ok(_) => {}
            Err(e) => trace!("noun {} verb {} faulted: {}", noun, verb, e),
        }
    }
    Ok(None)
}

pub fn handle_search_command(matches: &ArgMatches, config: VMConfig) -> Result<(), AppError> {
    let program = load_program(required::<PathBuf>(matches, "file")?)?;
    let target = *required::<i64>(matches, "target")?;

    match find_noun_verb(&program, config, target)? {
        Some((noun, verb)) => Event::info("search", format!("Answer {}", 100 * noun + verb))
            .with_data(json!({ "noun": noun, "verb": verb, "answer": 100 * noun + verb }))
            .emit()?,
        None => {
            Event::warn("search", format!("No noun and verb produce {}", target)).emit()?;
            return Err(AppError::Other(format!("target {} not reachable", target)));
        }
    }
    Ok(())
}
