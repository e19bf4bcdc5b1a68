use clap::{Arg, ArgAction, ArgMatches, Command};
use log::info;
use serde_json::json;
use std::path::PathBuf;

use crate::cli::errors::AppError;
use crate::cli::program::{load_program, parse_patch, parse_values, required};
use crate::events::Event;
use crate::vm::{VMConfig, VM};

pub fn run_command() -> Command {
    Command::new("run")
        .about("Run a program once and report its outputs")
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Program file (comma-separated text or .json array)")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("LIST")
                .help("Comma-separated input values, consumed in order")
                .allow_hyphen_values(true)
                .default_value(""),
        )
        .arg(
            Arg::new("patch")
                .long("patch")
                .value_name("ADDR=VALUE")
                .help("Overwrite a cell before running (can be used multiple times)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("dump-memory")
                .long("dump-memory")
                .help("Report the final memory contents")
                .action(ArgAction::SetTrue),
        )
}

pub fn handle_run_command(matches: &ArgMatches, config: VMConfig) -> Result<(), AppError> {
    let path = required::<PathBuf>(matches, "file")?;
    let inputs = parse_values(required::<String>(matches, "input")?)?;
    let patches = matches
        .get_many::<String>("patch")
        .into_iter()
        .flatten()
        .map(|raw| parse_patch(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let program = load_program(path)?.patched(&patches)?;
    let mut vm = VM::new(program, config);
    let outputs = vm.run_to_completion(inputs)?;
    info!("{} halted at pc {} with {} outputs", path.display(), vm.pc(), outputs.len());

    for value in &outputs {
        Event::info("output", value.to_string()).emit()?;
    }

    match outputs.last() {
        Some(code) => Event::info("diagnostic", format!("Diagnostic code: {}", code))
            .with_data(json!({ "code": code, "outputs": outputs }))
            .emit()?,
        None => {
            let cell = vm.memory().load(0).ok();
            Event::info("halt", format!("Halted without output; cell 0 = {}", cell.unwrap_or(0)))
                .with_data(json!({ "pc": vm.pc(), "cell0": cell }))
                .emit()?
        }
    }

    if matches.get_flag("dump-memory") {
        let data = match vm.memory().snapshot() {
            Some(cells) => json!(cells),
            None => json!(vm.memory().entries()),
        };
        Event::info("memory", vm.memory().to_string()).with_data(data).emit()?;
    }

    Ok(())
}
