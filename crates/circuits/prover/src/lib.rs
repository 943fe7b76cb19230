//! Interface to the backend that proves the rollup circuits.

use std::fmt;

use async_trait::async_trait;
use rollup_primitives::{circuits::*, tx::PublicKernelRequest};

/// The circuits a block proof is assembled from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CircuitName {
    BaseParity,
    RootParity,
    PublicKernel,
    BaseRollup,
    MergeRollup,
    RootRollup,
}

impl CircuitName {
    pub const ALL: [CircuitName; 6] = [
        CircuitName::BaseParity,
        CircuitName::RootParity,
        CircuitName::PublicKernel,
        CircuitName::BaseRollup,
        CircuitName::MergeRollup,
        CircuitName::RootRollup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseParity => "base-parity",
            Self::RootParity => "root-parity",
            Self::PublicKernel => "public-kernel",
            Self::BaseRollup => "base-rollup",
            Self::MergeRollup => "merge-rollup",
            Self::RootRollup => "root-rollup",
        }
    }
}

impl fmt::Display for CircuitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proves circuits, returning the circuit's public outputs along with the
/// proof attesting to them.
///
/// Implementations may take arbitrarily long and are called concurrently.
#[async_trait]
pub trait CircuitProver: Sync + Send + 'static {
    async fn get_base_parity_proof(
        &self,
        inputs: &BaseParityInputs,
    ) -> anyhow::Result<(ParityPublicInputs, Proof)>;

    async fn get_root_parity_proof(
        &self,
        inputs: &RootParityInputs,
    ) -> anyhow::Result<(ParityPublicInputs, Proof)>;

    async fn get_public_kernel_proof(
        &self,
        request: &PublicKernelRequest,
    ) -> anyhow::Result<(PublicKernelPublicInputs, Proof)>;

    async fn get_base_rollup_proof(
        &self,
        inputs: &BaseRollupInputs,
    ) -> anyhow::Result<(BaseOrMergeRollupPublicInputs, Proof)>;

    async fn get_merge_rollup_proof(
        &self,
        inputs: &MergeRollupInputs,
    ) -> anyhow::Result<(BaseOrMergeRollupPublicInputs, Proof)>;

    async fn get_root_rollup_proof(
        &self,
        inputs: &RootRollupInputs,
    ) -> anyhow::Result<(RootRollupPublicInputs, Proof)>;
}
