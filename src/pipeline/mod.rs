//! Multi-machine topologies
//!
//! Machines run as tokio tasks and talk only through channels. Two topologies
//! are provided: a ring of identical machines with a feedback edge
//! ([`Chain`]), and a single machine steered by a policy that reads state
//! folded from the machine's own output ([`Interactive`]).

mod chain;
mod errors;
mod interactive;

pub use chain::Chain;
pub use errors::PipelineError;
pub use interactive::Interactive;
