use std::collections::*;

use async_trait::async_trait;
use parking_lot::Mutex;
use rollup_primitives::{hash::hash_pair, merkle::zero_hashes, prelude::*};
use tracing::*;

use crate::{errors::*, traits::*, DbResult};

/// In-memory append-only tree keeping every node it has computed.
struct StubTree {
    id: MerkleTreeId,
    zeros: Vec<Buf32>,
    /// `levels[0]` holds the leaves, `levels[height]` the root.
    levels: Vec<Vec<Buf32>>,
    next: u64,
}

impl StubTree {
    fn new(id: MerkleTreeId) -> Self {
        let height = id.height();
        Self {
            id,
            zeros: zero_hashes(height),
            levels: vec![Vec::new(); height as usize + 1],
            next: 0,
        }
    }

    fn height(&self) -> u32 {
        self.id.height()
    }

    fn node(&self, level: usize, index: u64) -> Buf32 {
        self.levels[level]
            .get(index as usize)
            .copied()
            .unwrap_or(self.zeros[level])
    }

    fn set_node(&mut self, level: usize, index: u64, node: Buf32) {
        let zero = self.zeros[level];
        let layer = &mut self.levels[level];
        let index = index as usize;
        if index >= layer.len() {
            layer.resize(index + 1, zero);
        }
        layer[index] = node;
    }

    fn snapshot(&self) -> AppendOnlyTreeSnapshot {
        AppendOnlyTreeSnapshot::new(self.node(self.height() as usize, 0), self.next)
    }

    fn append(&mut self, leaves: &[Buf32]) -> DbResult<()> {
        if leaves.is_empty() {
            return Ok(());
        }

        let capacity = 1u64 << self.height();
        if self.next + leaves.len() as u64 > capacity {
            return Err(DbError::TreeFull(self.id, leaves.len()));
        }

        let start = self.next;
        for (i, leaf) in leaves.iter().enumerate() {
            self.set_node(0, start + i as u64, *leaf);
        }
        self.next += leaves.len() as u64;

        // Rehash only the nodes above the appended range.
        let last = self.next - 1;
        for level in 1..=self.height() as usize {
            let shift = level as u32;
            for index in (start >> shift)..=(last >> shift) {
                let left = self.node(level - 1, index * 2);
                let right = self.node(level - 1, index * 2 + 1);
                self.set_node(level, index, hash_pair(&left, &right));
            }
        }

        Ok(())
    }

    fn subtree_sibling_path(&self, subtree_height: u32) -> DbResult<Vec<Buf32>> {
        if subtree_height > self.height() {
            return Err(DbError::InvalidSubtreeHeight(self.id, subtree_height));
        }

        if self.next % (1u64 << subtree_height) != 0 {
            return Err(DbError::UnalignedSubtree(self.id, self.next, subtree_height));
        }

        let mut index = self.next >> subtree_height;
        let mut path = Vec::with_capacity((self.height() - subtree_height) as usize);
        for level in subtree_height..self.height() {
            path.push(self.node(level as usize, index ^ 1));
            index >>= 1;
        }

        Ok(path)
    }
}

/// Dummy tree store that keeps everything in memory, good enough for tests
/// and local proving runs.
pub struct StubTreeStore {
    trees: Mutex<HashMap<MerkleTreeId, StubTree>>,
}

impl Default for StubTreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StubTreeStore {
    pub fn new() -> Self {
        let trees = MerkleTreeId::ALL
            .into_iter()
            .map(|id| (id, StubTree::new(id)))
            .collect();
        Self {
            trees: Mutex::new(trees),
        }
    }

    fn with_tree<T>(
        &self,
        id: MerkleTreeId,
        f: impl FnOnce(&mut StubTree) -> DbResult<T>,
    ) -> DbResult<T> {
        let mut trees = self.trees.lock();
        let tree = trees
            .get_mut(&id)
            .ok_or_else(|| DbError::Other(format!("missing tree {id}")))?;
        f(tree)
    }
}

#[async_trait]
impl TreeStore for StubTreeStore {
    async fn get_snapshot(&self, id: MerkleTreeId) -> DbResult<AppendOnlyTreeSnapshot> {
        self.with_tree(id, |t| Ok(t.snapshot()))
    }

    async fn get_subtree_sibling_path(
        &self,
        id: MerkleTreeId,
        subtree_height: u32,
    ) -> DbResult<Vec<Buf32>> {
        self.with_tree(id, |t| t.subtree_sibling_path(subtree_height))
    }

    async fn append_leaves(&self, id: MerkleTreeId, leaves: &[Buf32]) -> DbResult<()> {
        trace!(%id, count = leaves.len(), "appending leaves");
        self.with_tree(id, |t| t.append(leaves))
    }

    async fn update_archive(&self, header: &Header) -> DbResult<()> {
        let leaf = header.hash();
        debug!(block_number = header.block_number(), "appending header to archive");
        self.with_tree(MerkleTreeId::Archive, |t| t.append(&[leaf]))
    }
}
