//! Structured result log
//!
//! Commands report their results as [`Event`]s. Each event is printed to
//! stdout as a coloured line or a JSON object, and optionally appended to a
//! log file.

use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub level: Level,
    pub tag: String, // e.g. "output", "diagnostic", "signal"
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

static LOG_FORMAT: Lazy<Mutex<LogFormat>> = Lazy::new(|| Mutex::new(LogFormat::Pretty));
static LOG_FILE: Lazy<Mutex<Option<String>>> = Lazy::new(|| Mutex::new(None));

impl Event {
    pub fn new<T: Into<String>, M: Into<String>>(level: Level, tag: T, message: M) -> Self {
        Self {
            level,
            tag: tag.into(),
            message: message.into(),
            timestamp: Utc::now(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn info<T: Into<String>, M: Into<String>>(tag: T, message: M) -> Self {
        Self::new(Level::Info, tag, message)
    }

    pub fn warn<T: Into<String>, M: Into<String>>(tag: T, message: M) -> Self {
        Self::new(Level::Warn, tag, message)
    }

    pub fn error<T: Into<String>, M: Into<String>>(tag: T, message: M) -> Self {
        Self::new(Level::Error, tag, message)
    }

    pub fn emit(&self) -> io::Result<()> {
        let format = *LOG_FORMAT.lock().unwrap_or_else(PoisonError::into_inner);
        let log_file = LOG_FILE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let (screen, file) = match format {
            LogFormat::Pretty => (self.pretty_line(), self.plain_line()),
            LogFormat::Json => {
                let json = self.json_line()?;
                (json.clone(), json)
            }
        };

        println!("{}", screen);
        if let Some(path) = log_file {
            append_to_file(&path, &file)?;
        }
        Ok(())
    }

    fn pretty_line(&self) -> String {
        let level = match self.level {
            Level::Info => self.level.to_string().green(),
            Level::Warn => self.level.to_string().yellow(),
            Level::Error => self.level.to_string().red(),
        };
        format!(
            "{} [{}] [{}] {}",
            self.timestamp.format("%H:%M:%S").to_string().dimmed(),
            level,
            self.tag.bold(),
            self.message
        )
    }

    fn plain_line(&self) -> String {
        format!(
            "{} [{}] [{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.tag,
            self.message
        )
    }

    fn json_line(&self) -> io::Result<String> {
        serde_json::to_string(self).map_err(io::Error::from)
    }
}

pub fn set_log_format(format: LogFormat) {
    *LOG_FORMAT.lock().unwrap_or_else(PoisonError::into_inner) = format;
}

pub fn set_log_file(file_path: Option<String>) {
    *LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner) = file_path;
}

fn append_to_file(file_path: &str, content: &str) -> io::Result<()> {
    let path = Path::new(file_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", content)
}
