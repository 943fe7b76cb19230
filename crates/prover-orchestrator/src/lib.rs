//! Orchestrates proving a rollup block through its recursive tree of circuits.

mod block_building;
mod cancel;
mod job;
mod queue;
mod state;

pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod tree_addr;
pub mod validation;

pub use config::OrchestratorConfig;
pub use errors::{OrchestratorError, OrchestratorResult};
pub use job::ProvingJobType;
pub use orchestrator::{BlockResult, ProvingOrchestrator};
pub use state::{ProvingOutcome, ProvingTicket};
pub use validation::{StructuralTxValidator, TxValidationError, TxValidator};
