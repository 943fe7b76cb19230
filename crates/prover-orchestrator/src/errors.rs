use rollup_db::DbError;
use thiserror::Error;

use crate::{job::ProvingJobType, validation::TxValidationError};

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(#[from] TxValidationError),

    /// A circuit output disagrees with the state the orchestrator tracked.
    #[error("consistency check failed: {0}")]
    Consistency(String),

    #[error("block proving was cancelled")]
    Cancelled,

    #[error("block proving aborted: {0}")]
    Aborted(String),

    #[error("failed to prove {job}: {source}")]
    Prover {
        job: ProvingJobType,
        source: anyhow::Error,
    },

    #[error("tree store: {0}")]
    TreeStore(#[from] DbError),

    #[error("{job} job panicked: {reason}")]
    JobPanicked { job: ProvingJobType, reason: String },
}

impl OrchestratorError {
    pub(crate) fn prover(job: ProvingJobType) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Prover { job, source }
    }
}
