//! Tree identifiers and snapshot types.

use std::fmt;

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{buf::Buf32, params::*};

/// The append-only trees the rollup maintains.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Arbitrary,
)]
pub enum MerkleTreeId {
    NoteHash,
    Nullifier,
    PublicData,
    L1ToL2Message,
    Archive,
}

impl MerkleTreeId {
    pub const ALL: [MerkleTreeId; 5] = [
        MerkleTreeId::NoteHash,
        MerkleTreeId::Nullifier,
        MerkleTreeId::PublicData,
        MerkleTreeId::L1ToL2Message,
        MerkleTreeId::Archive,
    ];

    /// Trees that individual txs append to.
    pub const TX_TREES: [MerkleTreeId; 3] = [
        MerkleTreeId::NoteHash,
        MerkleTreeId::Nullifier,
        MerkleTreeId::PublicData,
    ];

    pub fn height(&self) -> u32 {
        match self {
            Self::NoteHash => NOTE_HASH_TREE_HEIGHT,
            Self::Nullifier => NULLIFIER_TREE_HEIGHT,
            Self::PublicData => PUBLIC_DATA_TREE_HEIGHT,
            Self::L1ToL2Message => L1_TO_L2_MSG_TREE_HEIGHT,
            Self::Archive => ARCHIVE_HEIGHT,
        }
    }
}

impl fmt::Display for MerkleTreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoteHash => "note-hash",
            Self::Nullifier => "nullifier",
            Self::PublicData => "public-data",
            Self::L1ToL2Message => "l1-to-l2-message",
            Self::Archive => "archive",
        };
        f.write_str(s)
    }
}

/// Root and fill level of an append-only tree at some point in time.
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
pub struct AppendOnlyTreeSnapshot {
    pub root: Buf32,
    pub next_available_leaf_index: u64,
}

impl AppendOnlyTreeSnapshot {
    pub fn new(root: Buf32, next_available_leaf_index: u64) -> Self {
        Self {
            root,
            next_available_leaf_index,
        }
    }
}

/// Snapshots of the trees txs write to.
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
pub struct PartialStateReference {
    pub note_hash_tree: AppendOnlyTreeSnapshot,
    pub nullifier_tree: AppendOnlyTreeSnapshot,
    pub public_data_tree: AppendOnlyTreeSnapshot,
}

impl PartialStateReference {
    /// Returns the snapshot of one of the tx trees, `None` for the block level
    /// trees.
    pub fn get(&self, id: MerkleTreeId) -> Option<&AppendOnlyTreeSnapshot> {
        match id {
            MerkleTreeId::NoteHash => Some(&self.note_hash_tree),
            MerkleTreeId::Nullifier => Some(&self.nullifier_tree),
            MerkleTreeId::PublicData => Some(&self.public_data_tree),
            MerkleTreeId::L1ToL2Message | MerkleTreeId::Archive => None,
        }
    }
}

/// Full state committed to by a block header.
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
pub struct StateReference {
    pub l1_to_l2_message_tree: AppendOnlyTreeSnapshot,
    pub partial: PartialStateReference,
}
