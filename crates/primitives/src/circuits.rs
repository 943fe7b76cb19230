//! Inputs and public outputs of the rollup circuits.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    block::{GlobalVariables, Header},
    buf::Buf32,
    params::*,
    tree::{AppendOnlyTreeSnapshot, PartialStateReference},
    tx::{PublicKernelPhase, TxEffect},
};

/// Opaque proof blob produced by a circuit prover.
#[derive(Clone, Debug, Default, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct Proof(Vec<u8>);

impl Proof {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct BaseParityInputs {
    pub msgs: [Buf32; NUM_MSGS_PER_BASE_PARITY],
}

impl BaseParityInputs {
    /// Takes the `index`-th batch of a block's padded messages.
    pub fn from_slice(msgs: &[Buf32; NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP], index: usize) -> Self {
        let start = index * NUM_MSGS_PER_BASE_PARITY;
        let mut batch = [Buf32::zero(); NUM_MSGS_PER_BASE_PARITY];
        batch.copy_from_slice(&msgs[start..start + NUM_MSGS_PER_BASE_PARITY]);
        Self { msgs: batch }
    }
}

#[derive(
    Copy, Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ParityPublicInputs {
    /// Root of the messages covered by the circuit.
    pub root: Buf32,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct RootParityInput {
    pub proof: Proof,
    pub public_inputs: ParityPublicInputs,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct RootParityInputs {
    pub children: [RootParityInput; NUM_BASE_PARITY_PER_ROOT_PARITY],
}

#[derive(
    Copy, Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct PublicKernelPublicInputs {
    /// Hash of the tx the kernel ran for.
    pub tx_hash: Buf32,
    pub phase: PublicKernelPhase,
}

/// Values that must be the same across every rollup circuit of a block.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ConstantRollupData {
    pub last_archive: AppendOnlyTreeSnapshot,
    pub global_variables: GlobalVariables,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct BaseRollupInputs {
    pub tx_effect: TxEffect,
    pub constants: ConstantRollupData,
    pub start: PartialStateReference,
    pub note_hash_subtree_sibling_path: Vec<Buf32>,
    pub nullifier_subtree_sibling_path: Vec<Buf32>,
    pub public_data_subtree_sibling_path: Vec<Buf32>,
}

#[derive(
    Copy, Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum RollupType {
    Base,
    Merge,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct BaseOrMergeRollupPublicInputs {
    pub rollup_type: RollupType,
    /// Height of the subtree of txs this output covers, zero for a base rollup.
    pub height_in_block_tree: u32,
    pub constants: ConstantRollupData,
    pub start: PartialStateReference,
    pub end: PartialStateReference,
    pub txs_effects_hash: Buf32,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct PreviousRollupData {
    pub public_inputs: BaseOrMergeRollupPublicInputs,
    pub proof: Proof,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct MergeRollupInputs {
    pub previous_rollup_data: [PreviousRollupData; 2],
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct RootRollupInputs {
    pub previous_rollup_data: [PreviousRollupData; 2],
    pub l1_to_l2_roots: RootParityInput,
    pub new_l1_to_l2_messages: [Buf32; NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP],
    pub new_l1_to_l2_message_tree_root_sibling_path: Vec<Buf32>,
    pub start_l1_to_l2_message_tree_snapshot: AppendOnlyTreeSnapshot,
    pub start_archive_snapshot: AppendOnlyTreeSnapshot,
    pub new_archive_sibling_path: Vec<Buf32>,
}

#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct RootRollupPublicInputs {
    /// Archive snapshot after the new header was appended.
    pub archive: AppendOnlyTreeSnapshot,
    pub header: Header,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_parity_batches() {
        let mut msgs = [Buf32::zero(); NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP];
        for (i, m) in msgs.iter_mut().enumerate() {
            *m = Buf32::from_u64(i as u64);
        }

        let third = BaseParityInputs::from_slice(&msgs, 2);
        assert_eq!(
            third.msgs,
            [8, 9, 10, 11].map(Buf32::from_u64),
        );
    }
}
