use clap::ArgMatches;
use log::debug;
use std::any::Any;
use std::fs;
use std::path::Path;

use crate::cli::errors::AppError;
use crate::vm::{Program, ProgramError};

/// Load a program from a file
///
/// Files ending in `.json` hold a JSON array of integers; anything else is
/// read as comma-separated text.
pub fn load_program(path: &Path) -> Result<Program, AppError> {
    let source = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    let program = if is_json {
        let program: Program = serde_json::from_str(&source)?;
        if program.is_empty() {
            return Err(ProgramError::Empty.into());
        }
        program
    } else {
        source.parse::<Program>()?
    };

    debug!("Loaded {} cells from {}", program.len(), path.display());
    Ok(program)
}

/// Parse a comma-separated list such as `4,3,2,1,0`. An empty string is an empty list.
pub fn parse_values(raw: &str) -> Result<Vec<i64>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    raw.split(',')
        .map(str::trim)
        .map(|token| {
            token
                .parse::<i64>()
                .map_err(|_| AppError::InvalidArgument(format!("'{}' is not an integer", token)))
        })
        .collect()
}

/// Parse an `ADDR=VALUE` patch
pub fn parse_patch(raw: &str) -> Result<(usize, i64), AppError> {
    let (address, value) = raw
        .split_once('=')
        .ok_or_else(|| AppError::InvalidArgument(format!("expected ADDR=VALUE, got '{}'", raw)))?;
    let address = address
        .trim()
        .parse::<usize>()
        .map_err(|_| AppError::InvalidArgument(format!("'{}' is not an address", address.trim())))?;
    let value = value
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::InvalidArgument(format!("'{}' is not an integer", value.trim())))?;
    Ok((address, value))
}

/// Fetch an argument clap has already validated as present
pub(crate) fn required<'a, T>(matches: &'a ArgMatches, name: &str) -> Result<&'a T, AppError>
where
    T: Any + Clone + Send + Sync + 'static,
{
    matches
        .get_one::<T>(name)
        .ok_or_else(|| AppError::InvalidArgument(format!("missing --{}", name)))
}
