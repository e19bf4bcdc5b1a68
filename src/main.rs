use intcode::cli::{build_cli, execute};
use intcode::config;
use intcode::events::Event;
use log::LevelFilter;
use std::process;

fn main() {
    let matches = build_cli().get_matches();

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
    config::init();

    if let Err(e) = execute(&matches) {
        let _ = Event::error("error", e.to_string()).emit();
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
