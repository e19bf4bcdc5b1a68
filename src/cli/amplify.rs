use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::json;
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::cli::errors::AppError;
use crate::cli::program::{load_program, parse_values, required};
use crate::events::Event;
use crate::pipeline::Chain;
use crate::vm::VMConfig;

fn file_arg() -> Arg {
    Arg::new("file")
        .value_name("FILE")
        .help("Amplifier controller program")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
}

fn phases_arg(help: &'static str) -> Arg {
    Arg::new("phases")
        .long("phases")
        .value_name("LIST")
        .help(help)
        .required(true)
}

fn feedback_arg() -> Arg {
    Arg::new("feedback")
        .long("feedback")
        .help("Connect the amplifiers in a feedback loop")
        .action(ArgAction::SetTrue)
}

pub fn amplify_command() -> Command {
    Command::new("amplify")
        .about("Run a chain of amplifiers with the given phase settings")
        .arg(file_arg())
        .arg(phases_arg("Comma-separated phase setting for each amplifier"))
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("N")
                .help("Signal fed to the first amplifier")
                .allow_hyphen_values(true)
                .value_parser(clap::value_parser!(i64))
                .default_value("0"),
        )
        .arg(feedback_arg())
}

pub fn max_signal_command() -> Command {
    Command::new("max-signal")
        .about("Find the phase ordering that produces the highest signal")
        .arg(file_arg())
        .arg(phases_arg("Comma-separated phase settings to permute"))
        .arg(feedback_arg())
}

pub fn handle_amplify_command(matches: &ArgMatches, config: VMConfig) -> Result<(), AppError> {
    let chain = Chain::new(load_program(required::<PathBuf>(matches, "file")?)?, config);
    let phases = parse_values(required::<String>(matches, "phases")?)?;
    let seed = *required::<i64>(matches, "seed")?;

    let signal = if matches.get_flag("feedback") {
        Runtime::new()?.block_on(chain.run_feedback(&phases, seed))?
    } else {
        chain.run_serial(&phases, seed)?
    };

    Event::info("signal", format!("Signal {} from phases {:?}", signal, phases))
        .with_data(json!({ "phases": phases, "signal": signal }))
        .emit()?;
    Ok(())
}

pub fn handle_max_signal_command(matches: &ArgMatches, config: VMConfig) -> Result<(), AppError> {
    let chain = Chain::new(load_program(required::<PathBuf>(matches, "file")?)?, config);
    let phase_set = parse_values(required::<String>(matches, "phases")?)?;

    let (phases, signal) = if matches.get_flag("feedback") {
        Runtime::new()?.block_on(chain.max_feedback_signal(&phase_set, 0))?
    } else {
        chain.max_serial_signal(&phase_set, 0)?
    };

    Event::info("signal", format!("Highest signal {} from phases {:?}", signal, phases))
        .with_data(json!({ "phases": phases, "signal": signal }))
        .emit()?;
    Ok(())
}
