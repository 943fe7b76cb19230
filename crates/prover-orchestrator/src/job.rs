use std::{fmt, sync::Arc};

pub use rollup_circuit_prover::CircuitName as ProvingJobType;
use rollup_primitives::circuits::{BaseParityInputs, RootParityInputs};

use crate::{
    state::{MergeInputs, ProvingState},
    tree_addr::TreePosition,
};

/// What a job has to do, with whatever inputs it can't look up in the
/// proving state.
pub(crate) enum JobPayload {
    BaseParity {
        index: usize,
        inputs: BaseParityInputs,
    },
    RootParity {
        inputs: Box<RootParityInputs>,
    },
    PublicKernel {
        tx_index: usize,
        function_index: usize,
    },
    BaseRollup {
        tx_index: usize,
    },
    MergeRollup {
        position: TreePosition,
        inputs: Box<MergeInputs>,
    },
    RootRollup,
}

impl JobPayload {
    pub(crate) fn job_type(&self) -> ProvingJobType {
        match self {
            Self::BaseParity { .. } => ProvingJobType::BaseParity,
            Self::RootParity { .. } => ProvingJobType::RootParity,
            Self::PublicKernel { .. } => ProvingJobType::PublicKernel,
            Self::BaseRollup { .. } => ProvingJobType::BaseRollup,
            Self::MergeRollup { .. } => ProvingJobType::MergeRollup,
            Self::RootRollup => ProvingJobType::RootRollup,
        }
    }
}

impl fmt::Debug for JobPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseParity { index, .. } => write!(f, "base-parity({index})"),
            Self::RootParity { .. } => f.write_str("root-parity"),
            Self::PublicKernel {
                tx_index,
                function_index,
            } => write!(f, "public-kernel({tx_index}, {function_index})"),
            Self::BaseRollup { tx_index } => write!(f, "base-rollup({tx_index})"),
            Self::MergeRollup { position, .. } => write!(
                f,
                "merge-rollup({}, {})",
                position.level(),
                position.index()
            ),
            Self::RootRollup => f.write_str("root-rollup"),
        }
    }
}

/// A unit of work for the job queue, bound to the block it belongs to.
pub(crate) struct ProvingJob {
    pub(crate) state: Arc<ProvingState>,
    pub(crate) payload: JobPayload,
}

impl ProvingJob {
    pub(crate) fn new(state: Arc<ProvingState>, payload: JobPayload) -> Self {
        Self { state, payload }
    }

    pub(crate) fn job_type(&self) -> ProvingJobType {
        self.payload.job_type()
    }
}

impl fmt::Debug for ProvingJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}@block{}",
            self.payload,
            self.state.global_variables().block_number
        )
    }
}
