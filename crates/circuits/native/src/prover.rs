use async_trait::async_trait;
use rollup_circuit_prover::{CircuitName, CircuitProver};
use rollup_primitives::{circuits::*, tx::PublicKernelRequest};
use tracing::*;

use crate::{circuits, proof::make_proof};

/// Prover that evaluates the circuits natively.
#[derive(Clone, Debug, Default)]
pub struct NativeCircuitProver;

impl NativeCircuitProver {
    pub fn new() -> Self {
        Self
    }
}

fn prove<I, O: borsh::BorshSerialize>(
    name: CircuitName,
    inputs: &I,
    circuit: impl FnOnce(&I) -> anyhow::Result<O>,
) -> anyhow::Result<(O, Proof)> {
    let output = circuit(inputs).inspect_err(|e| warn!(circuit = %name, %e, "circuit failed"))?;
    let proof = make_proof(&output)?;
    trace!(circuit = %name, proof_len = proof.as_bytes().len(), "native proof");
    Ok((output, proof))
}

#[async_trait]
impl CircuitProver for NativeCircuitProver {
    async fn get_base_parity_proof(
        &self,
        inputs: &BaseParityInputs,
    ) -> anyhow::Result<(ParityPublicInputs, Proof)> {
        prove(CircuitName::BaseParity, inputs, circuits::base_parity)
    }

    async fn get_root_parity_proof(
        &self,
        inputs: &RootParityInputs,
    ) -> anyhow::Result<(ParityPublicInputs, Proof)> {
        prove(CircuitName::RootParity, inputs, circuits::root_parity)
    }

    async fn get_public_kernel_proof(
        &self,
        request: &PublicKernelRequest,
    ) -> anyhow::Result<(PublicKernelPublicInputs, Proof)> {
        prove(CircuitName::PublicKernel, request, circuits::public_kernel)
    }

    async fn get_base_rollup_proof(
        &self,
        inputs: &BaseRollupInputs,
    ) -> anyhow::Result<(BaseOrMergeRollupPublicInputs, Proof)> {
        prove(CircuitName::BaseRollup, inputs, circuits::base_rollup)
    }

    async fn get_merge_rollup_proof(
        &self,
        inputs: &MergeRollupInputs,
    ) -> anyhow::Result<(BaseOrMergeRollupPublicInputs, Proof)> {
        prove(CircuitName::MergeRollup, inputs, circuits::merge_rollup)
    }

    async fn get_root_rollup_proof(
        &self,
        inputs: &RootRollupInputs,
    ) -> anyhow::Result<(RootRollupPublicInputs, Proof)> {
        prove(CircuitName::RootRollup, inputs, circuits::root_rollup)
    }
}

#[cfg(test)]
mod tests {
    use rollup_db::{stubs::StubTreeStore, traits::TreeStore};
    use rollup_primitives::{
        block::GlobalVariables, buf::Buf32, merkle::compute_root, params::*, prelude::*,
    };

    use super::*;

    async fn base_inputs(db: &StubTreeStore, effect: TxEffect) -> BaseRollupInputs {
        let last_archive = db.get_snapshot(MerkleTreeId::Archive).await.unwrap();
        let start = PartialStateReference {
            note_hash_tree: db.get_snapshot(MerkleTreeId::NoteHash).await.unwrap(),
            nullifier_tree: db.get_snapshot(MerkleTreeId::Nullifier).await.unwrap(),
            public_data_tree: db.get_snapshot(MerkleTreeId::PublicData).await.unwrap(),
        };
        let inputs = BaseRollupInputs {
            constants: ConstantRollupData {
                last_archive,
                global_variables: GlobalVariables::default(),
            },
            start,
            note_hash_subtree_sibling_path: db
                .get_subtree_sibling_path(MerkleTreeId::NoteHash, NOTE_HASH_SUBTREE_HEIGHT)
                .await
                .unwrap(),
            nullifier_subtree_sibling_path: db
                .get_subtree_sibling_path(MerkleTreeId::Nullifier, NULLIFIER_SUBTREE_HEIGHT)
                .await
                .unwrap(),
            public_data_subtree_sibling_path: db
                .get_subtree_sibling_path(MerkleTreeId::PublicData, PUBLIC_DATA_SUBTREE_HEIGHT)
                .await
                .unwrap(),
            tx_effect: effect.clone(),
        };

        db.append_leaves(MerkleTreeId::NoteHash, &effect.padded_note_hashes())
            .await
            .unwrap();
        db.append_leaves(MerkleTreeId::Nullifier, &effect.padded_nullifiers())
            .await
            .unwrap();
        db.append_leaves(MerkleTreeId::PublicData, &effect.padded_public_data_leaves())
            .await
            .unwrap();
        inputs
    }

    fn effect(seed: u64) -> TxEffect {
        TxEffect {
            note_hashes: vec![Buf32::from_u64(seed), Buf32::from_u64(seed + 1)],
            nullifiers: vec![Buf32::from_u64(seed + 2)],
            public_data_writes: vec![],
        }
    }

    #[tokio::test]
    async fn test_base_rollup_matches_store() {
        let db = StubTreeStore::new();
        let prover = NativeCircuitProver::new();

        let inputs = base_inputs(&db, effect(10)).await;
        let (out, proof) = prover.get_base_rollup_proof(&inputs).await.unwrap();

        assert_eq!(out.rollup_type, RollupType::Base);
        assert_eq!(
            out.end.note_hash_tree,
            db.get_snapshot(MerkleTreeId::NoteHash).await.unwrap()
        );
        assert_eq!(
            out.end.nullifier_tree,
            db.get_snapshot(MerkleTreeId::Nullifier).await.unwrap()
        );
        assert_eq!(
            out.end.public_data_tree,
            db.get_snapshot(MerkleTreeId::PublicData).await.unwrap()
        );
        crate::verify_proof(&proof, &out).unwrap();
    }

    #[tokio::test]
    async fn test_base_rollup_rejects_stale_path() {
        let db = StubTreeStore::new();
        let prover = NativeCircuitProver::new();

        let first = base_inputs(&db, effect(10)).await;
        // Same inputs again, but the tree has moved on.
        let mut stale = base_inputs(&db, effect(20)).await;
        stale.start = first.start;
        assert!(prover.get_base_rollup_proof(&stale).await.is_err());
    }

    #[tokio::test]
    async fn test_merge_requires_contiguous_children() {
        let db = StubTreeStore::new();
        let prover = NativeCircuitProver::new();

        let a = base_inputs(&db, effect(10)).await;
        let b = base_inputs(&db, effect(20)).await;
        let (a_out, a_proof) = prover.get_base_rollup_proof(&a).await.unwrap();
        let (b_out, b_proof) = prover.get_base_rollup_proof(&b).await.unwrap();

        let left = PreviousRollupData {
            public_inputs: a_out,
            proof: a_proof,
        };
        let right = PreviousRollupData {
            public_inputs: b_out,
            proof: b_proof,
        };

        let ok = MergeRollupInputs {
            previous_rollup_data: [left.clone(), right.clone()],
        };
        let (merged, _) = prover.get_merge_rollup_proof(&ok).await.unwrap();
        assert_eq!(merged.height_in_block_tree, 1);
        assert_eq!(merged.start, left.public_inputs.start);
        assert_eq!(merged.end, right.public_inputs.end);

        let swapped = MergeRollupInputs {
            previous_rollup_data: [right, left],
        };
        assert!(prover.get_merge_rollup_proof(&swapped).await.is_err());
    }

    #[tokio::test]
    async fn test_root_parity_covers_all_messages() {
        let prover = NativeCircuitProver::new();
        let mut msgs = [Buf32::zero(); NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP];
        for (i, m) in msgs.iter_mut().enumerate() {
            *m = Buf32::from_u64(i as u64 + 1);
        }

        let mut children = Vec::new();
        for i in 0..NUM_BASE_PARITY_PER_ROOT_PARITY {
            let inputs = BaseParityInputs::from_slice(&msgs, i);
            let (public_inputs, proof) = prover.get_base_parity_proof(&inputs).await.unwrap();
            children.push(RootParityInput {
                proof,
                public_inputs,
            });
        }

        let inputs = RootParityInputs {
            children: children.try_into().unwrap(),
        };
        let (out, _) = prover.get_root_parity_proof(&inputs).await.unwrap();
        assert_eq!(out.root, compute_root(&msgs));
    }

    #[tokio::test]
    async fn test_recursive_circuit_rejects_bad_proof() {
        let prover = NativeCircuitProver::new();
        let child = RootParityInput {
            proof: Proof::new(vec![1, 2, 3]),
            public_inputs: ParityPublicInputs {
                root: Buf32::zero(),
            },
        };
        let inputs = RootParityInputs {
            children: std::array::from_fn(|_| child.clone()),
        };
        assert!(prover.get_root_parity_proof(&inputs).await.is_err());
    }
}
