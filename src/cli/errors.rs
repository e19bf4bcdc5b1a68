use thiserror::Error;

use crate::pipeline::PipelineError;
use crate::vm::{ProgramError, VMError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("VM error: {0}")]
    VM(#[from] VMError),

    #[error("Program error: {0}")]
    Program(#[from] ProgramError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Other(s.to_string())
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Other(s)
    }
}
