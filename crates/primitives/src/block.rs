//! Block header, body and the assembled block.

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{
    buf::Buf32,
    hash::compute_borsh_hash,
    merkle::compute_root,
    tree::{AppendOnlyTreeSnapshot, StateReference},
    tx::TxEffect,
};

/// Per-block values every tx in the block is executed against.
#[derive(
    Copy,
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
pub struct GlobalVariables {
    pub chain_id: u64,
    pub version: u64,
    pub block_number: u64,
    pub timestamp: u64,
}

/// Commitments to the block's inputs and published data.
#[derive(
    Copy,
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
pub struct ContentCommitment {
    /// Height of the tx effects tree, ie. `log2` of the number of leaves.
    pub tx_tree_height: u32,
    pub txs_effects_hash: Buf32,
    /// Root of the block's L1 to L2 messages.
    pub in_hash: Buf32,
}

#[derive(
    Copy,
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
pub struct Header {
    pub last_archive: AppendOnlyTreeSnapshot,
    pub content_commitment: ContentCommitment,
    pub state: StateReference,
    pub global_variables: GlobalVariables,
}

impl Header {
    /// Leaf this header contributes to the archive tree.
    pub fn hash(&self) -> Buf32 {
        compute_borsh_hash(self)
    }

    pub fn block_number(&self) -> u64 {
        self.global_variables.block_number
    }
}

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
pub struct Body {
    tx_effects: Vec<TxEffect>,
}

impl Body {
    pub fn new(tx_effects: Vec<TxEffect>) -> Self {
        Self { tx_effects }
    }

    pub fn tx_effects(&self) -> &[TxEffect] {
        &self.tx_effects
    }

    /// Computes the root of the tx effects tree of the given height, padding
    /// unused leaves with the hash of the empty effect.
    pub fn txs_effects_hash(&self, tx_tree_height: u32) -> Buf32 {
        let num_leaves = 1usize << tx_tree_height;
        let mut leaves: Vec<_> = self.tx_effects.iter().map(TxEffect::hash).collect();
        leaves.resize(num_leaves.max(leaves.len()), TxEffect::empty().hash());
        compute_root(&leaves)
    }
}

/// A fully proven block.
#[derive(
    Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize, Serialize, Deserialize, Arbitrary,
)]
pub struct L2Block {
    archive: AppendOnlyTreeSnapshot,
    header: Header,
    body: Body,
}

impl L2Block {
    pub fn new(archive: AppendOnlyTreeSnapshot, header: Header, body: Body) -> Self {
        Self {
            archive,
            header,
            body,
        }
    }

    /// Archive snapshot after this block's header was appended.
    pub fn archive(&self) -> &AppendOnlyTreeSnapshot {
        &self.archive
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn number(&self) -> u64 {
        self.header.block_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{hash::hash_pair, tx::TxEffect};

    fn effect(v: u64) -> TxEffect {
        TxEffect {
            nullifiers: vec![Buf32::from_u64(v)],
            ..Default::default()
        }
    }

    #[test]
    fn test_txs_effects_hash_pads_with_empty_effect() {
        let body = Body::new(vec![effect(1)]);
        let expected = hash_pair(&effect(1).hash(), &TxEffect::empty().hash());
        assert_eq!(body.txs_effects_hash(1), expected);
    }

    #[test]
    fn test_txs_effects_hash_full_tree() {
        let effects: Vec<_> = (1..=4).map(effect).collect();
        let body = Body::new(effects.clone());
        let left = hash_pair(&effects[0].hash(), &effects[1].hash());
        let right = hash_pair(&effects[2].hash(), &effects[3].hash());
        assert_eq!(body.txs_effects_hash(2), hash_pair(&left, &right));
    }

    #[test]
    fn test_header_hash_changes_with_content() {
        let mut header = Header::default();
        let h0 = header.hash();
        header.global_variables.block_number = 1;
        assert_ne!(h0, header.hash());
    }
}
