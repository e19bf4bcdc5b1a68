pub mod cli;
pub mod config;
pub mod events;
pub mod pipeline;
pub mod vm;

pub use crate::events::Event;
pub use crate::pipeline::{Chain, Interactive, PipelineError};
pub use crate::vm::{Program, VMConfig, VMError, Variant, VM};
