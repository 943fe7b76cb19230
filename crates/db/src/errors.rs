use rollup_primitives::tree::MerkleTreeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("tree {0} is full, cannot append {1} leaves")]
    TreeFull(MerkleTreeId, usize),

    /// (tree, next index, subtree height)
    #[error("tree {0} next index {1} is not aligned to a subtree of height {2}")]
    UnalignedSubtree(MerkleTreeId, u64, u32),

    #[error("subtree height {1} exceeds height of tree {0}")]
    InvalidSubtreeHeight(MerkleTreeId, u32),

    #[error("not yet implemented")]
    Unimplemented,

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for DbError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}
