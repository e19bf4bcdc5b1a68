//! Command-line interface for the `intcode` binary

pub mod amplify;
pub mod errors;
pub mod program;
pub mod run;
pub mod search;

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::debug;

use crate::config::SETTINGS;
use crate::events::{set_log_file, set_log_format, LogFormat};
use crate::vm::Variant;

pub use amplify::{amplify_command, max_signal_command};
pub use errors::AppError;
pub use program::{load_program, parse_patch, parse_values};
pub use run::run_command;
pub use search::{find_noun_verb, search_command};

pub fn build_cli() -> Command {
    Command::new("intcode")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Intcode virtual machine with amplifier chains")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Display detailed execution information")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Output results in JSON format")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("FILE")
                .help("Also append results to this file")
                .global(true),
        )
        .arg(
            Arg::new("variant")
                .long("variant")
                .value_name("VARIANT")
                .help("Machine generation: basic, extended or relocatable")
                .global(true)
                .value_parser(|raw: &str| raw.parse::<Variant>()),
        )
        .subcommand(run_command())
        .subcommand(amplify_command())
        .subcommand(max_signal_command())
        .subcommand(search_command())
}

/// Apply output settings and dispatch to the selected subcommand
pub fn execute(matches: &ArgMatches) -> Result<(), AppError> {
    let format = if matches.get_flag("json") {
        LogFormat::Json
    } else {
        SETTINGS.log_format
    };
    set_log_format(format);
    set_log_file(
        matches
            .get_one::<String>("log-file")
            .cloned()
            .or_else(|| SETTINGS.log_file.clone()),
    );

    let variant = matches
        .get_one::<Variant>("variant")
        .copied()
        .unwrap_or(SETTINGS.variant);
    debug!("Using the {} variant", variant);
    let config = variant.config();

    match matches.subcommand() {
        Some(("run", sub_matches)) => run::handle_run_command(sub_matches, config),
        Some(("amplify", sub_matches)) => amplify::handle_amplify_command(sub_matches, config),
        Some(("max-signal", sub_matches)) => amplify::handle_max_signal_command(sub_matches, config),
        Some(("search", sub_matches)) => search::handle_search_command(sub_matches, config),
        Some((name, _)) => Err(AppError::Other(format!("unknown command '{}'", name))),
        None => Err(AppError::from("no command given")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["intcode", "run", "prog.txt", "--variant", "basic", "--json"])
            .unwrap();
        assert!(matches.get_flag("json"));
        assert_eq!(matches.get_one::<Variant>("variant"), Some(&Variant::Basic));
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(build_cli()
            .try_get_matches_from(["intcode", "run", "prog.txt", "--variant", "turbo"])
            .is_err());
    }
}
