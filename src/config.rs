use log::warn;
use once_cell::sync::Lazy;
use std::env;

use crate::events::LogFormat;
use crate::vm::Variant;

pub const VARIANT_VAR: &str = "INTCODE_VARIANT";
pub const LOG_FORMAT_VAR: &str = "INTCODE_LOG_FORMAT";
pub const LOG_FILE_VAR: &str = "INTCODE_LOG_FILE";

/// Process-wide defaults, overridable from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub variant: Variant,
    pub log_format: LogFormat,
    pub log_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            log_format: LogFormat::Pretty,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Unknown values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(raw) = lookup(VARIANT_VAR) {
            match raw.parse::<Variant>() {
                Ok(variant) => settings.variant = variant,
                Err(e) => warn!("Ignoring {}: {}", VARIANT_VAR, e),
            }
        }

        if let Some(raw) = lookup(LOG_FORMAT_VAR) {
            match raw.trim().to_lowercase().as_str() {
                "pretty" => settings.log_format = LogFormat::Pretty,
                "json" => settings.log_format = LogFormat::Json,
                other => warn!("Ignoring {}: unknown log format '{}'", LOG_FORMAT_VAR, other),
            }
        }

        settings.log_file = lookup(LOG_FILE_VAR).filter(|path| !path.trim().is_empty());
        settings
    }
}

pub static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn init() {
    Lazy::force(&SETTINGS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[]));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.variant, Variant::Relocatable);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (VARIANT_VAR, "Basic"),
            (LOG_FORMAT_VAR, "json"),
            (LOG_FILE_VAR, "/tmp/intcode.log"),
        ]));
        assert_eq!(settings.variant, Variant::Basic);
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.log_file.as_deref(), Some("/tmp/intcode.log"));
    }

    #[test]
    fn test_bad_values_fall_back() {
        let settings = Settings::from_lookup(lookup(&[
            (VARIANT_VAR, "turbo"),
            (LOG_FORMAT_VAR, "xml"),
            (LOG_FILE_VAR, "  "),
        ]));
        assert_eq!(settings, Settings::default());
    }
}
