//! Processed transactions and the side effects they commit to.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    buf::Buf32,
    hash::{compute_borsh_hash, hash_pair},
    params::*,
};

/// A write of `value` into `leaf_slot` of the public data tree.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Arbitrary,
)]
pub struct PublicDataWrite {
    pub leaf_slot: Buf32,
    pub value: Buf32,
}

impl PublicDataWrite {
    pub fn new(leaf_slot: Buf32, value: Buf32) -> Self {
        Self { leaf_slot, value }
    }

    /// Leaf this write appends to the public data tree.
    pub fn leaf(&self) -> Buf32 {
        hash_pair(&self.leaf_slot, &self.value)
    }
}

/// Phase of public execution a kernel request belongs to.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Arbitrary,
)]
pub enum PublicKernelPhase {
    Setup,
    AppLogic,
    Teardown,
    Tail,
}

/// One public kernel circuit invocation recorded while the tx was simulated.
#[derive(
    Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize, Arbitrary,
)]
pub struct PublicKernelRequest {
    pub phase: PublicKernelPhase,
    pub tx_hash: Buf32,
    pub call_data: Vec<u8>,
}

/// A tx that has been simulated and is ready to be proven into a block.
#[derive(
    Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize, Arbitrary,
)]
pub struct ProcessedTx {
    pub hash: Buf32,
    pub note_hashes: Vec<Buf32>,
    pub nullifiers: Vec<Buf32>,
    pub public_data_writes: Vec<PublicDataWrite>,
    pub public_kernel_requests: Vec<PublicKernelRequest>,
    pub is_empty: bool,
}

impl ProcessedTx {
    /// Padding tx with no side effects.
    pub fn empty() -> Self {
        Self {
            hash: Buf32::zero(),
            note_hashes: Vec::new(),
            nullifiers: Vec::new(),
            public_data_writes: Vec::new(),
            public_kernel_requests: Vec::new(),
            is_empty: true,
        }
    }

    pub fn to_tx_effect(&self) -> TxEffect {
        TxEffect {
            note_hashes: self.note_hashes.clone(),
            nullifiers: self.nullifiers.clone(),
            public_data_writes: self.public_data_writes.clone(),
        }
    }
}

/// The side effects of a tx as they are published in a block body.
#[derive(
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Arbitrary,
)]
pub struct TxEffect {
    pub note_hashes: Vec<Buf32>,
    pub nullifiers: Vec<Buf32>,
    pub public_data_writes: Vec<PublicDataWrite>,
}

impl TxEffect {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.note_hashes.is_empty()
            && self.nullifiers.is_empty()
            && self.public_data_writes.is_empty()
    }

    pub fn hash(&self) -> Buf32 {
        compute_borsh_hash(self)
    }

    /// Note hash leaves, padded with empty leaves to the per-tx maximum.
    pub fn padded_note_hashes(&self) -> Vec<Buf32> {
        pad_leaves(&self.note_hashes, MAX_NOTE_HASHES_PER_TX)
    }

    pub fn padded_nullifiers(&self) -> Vec<Buf32> {
        pad_leaves(&self.nullifiers, MAX_NULLIFIERS_PER_TX)
    }

    pub fn padded_public_data_leaves(&self) -> Vec<Buf32> {
        let leaves: Vec<_> = self.public_data_writes.iter().map(|w| w.leaf()).collect();
        pad_leaves(&leaves, MAX_PUBLIC_DATA_WRITES_PER_TX)
    }
}

fn pad_leaves(leaves: &[Buf32], width: usize) -> Vec<Buf32> {
    let mut out = leaves.to_vec();
    if out.len() < width {
        out.resize(width, Buf32::zero());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tx_has_empty_effect() {
        let tx = ProcessedTx::empty();
        assert!(tx.is_empty);
        assert!(tx.to_tx_effect().is_empty());
        assert_eq!(tx.to_tx_effect().hash(), TxEffect::empty().hash());
    }

    #[test]
    fn test_padded_leaves() {
        let effect = TxEffect {
            note_hashes: vec![Buf32::from_u64(1)],
            nullifiers: vec![Buf32::from_u64(2), Buf32::from_u64(3)],
            public_data_writes: vec![PublicDataWrite::new(
                Buf32::from_u64(4),
                Buf32::from_u64(5),
            )],
        };

        let notes = effect.padded_note_hashes();
        assert_eq!(notes.len(), MAX_NOTE_HASHES_PER_TX);
        assert_eq!(notes[0], Buf32::from_u64(1));
        assert!(notes[1..].iter().all(Buf32::is_zero));

        assert_eq!(effect.padded_nullifiers().len(), MAX_NULLIFIERS_PER_TX);

        let public = effect.padded_public_data_leaves();
        assert_eq!(public.len(), MAX_PUBLIC_DATA_WRITES_PER_TX);
        assert_eq!(public[0], effect.public_data_writes[0].leaf());
    }
}
