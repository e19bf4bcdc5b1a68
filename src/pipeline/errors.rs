use thiserror::Error;

use crate::vm::VMError;

/// Error type for multi-machine topologies
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A machine in the topology failed
    #[error("machine {index} failed: {source}")]
    Machine {
        index: usize,
        #[source]
        source: VMError,
    },

    /// A coordinator task panicked or was aborted
    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("no phase settings provided")]
    EmptyChain,

    #[error("output group size must be at least 1")]
    InvalidArity,

    /// The topology halted without producing the value it is read for
    #[error("chain halted without producing output")]
    NoOutput,

    /// Shared state still had other owners after every task finished
    #[error("shared state is still referenced after the run")]
    StateInUse,
}
