//! Trait definitions for the world state tree store the block builder reads
//! from and writes to.

use async_trait::async_trait;
use rollup_primitives::prelude::*;

use crate::DbResult;

/// Interface to the append-only Merkle trees of the world state.
///
/// Writes are applied immediately, there is no notion of a pending batch.
/// Callers are responsible for not interleaving appends that belong together.
#[async_trait]
pub trait TreeStore: Sync + Send + 'static {
    /// Returns the current root and fill level of a tree.
    async fn get_snapshot(&self, id: MerkleTreeId) -> DbResult<AppendOnlyTreeSnapshot>;

    /// Returns the sibling path of the subtree of height `subtree_height` that
    /// the next append would fill, starting at the level of the subtree root.
    ///
    /// Errors if the next leaf index is not aligned to such a subtree.
    async fn get_subtree_sibling_path(
        &self,
        id: MerkleTreeId,
        subtree_height: u32,
    ) -> DbResult<Vec<Buf32>>;

    /// Appends leaves at the end of a tree.
    async fn append_leaves(&self, id: MerkleTreeId, leaves: &[Buf32]) -> DbResult<()>;

    /// Appends the hash of a block header to the archive tree.
    async fn update_archive(&self, header: &Header) -> DbResult<()>;
}
