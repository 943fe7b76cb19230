//! Addressing of nodes in the merge tree.
//!
//! The merge tree is a complete binary tree over the block's base rollups.
//! Levels count down from the root at level 0; the base rollups sit at level
//! `log2(num_txs)`.  Merge nodes are stored heap style: the node at `level`,
//! `index` has subscript `2^level - 1 + index`, so the root is subscript 0 and
//! the children of subscript `s` are `2s + 1` and `2s + 2`.

/// Which input of a merge node a child fills.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MergeSlot {
    Left,
    Right,
}

impl MergeSlot {
    pub fn index(&self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

/// Position of a node in the merge tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TreePosition {
    level: u32,
    index: u64,
}

impl TreePosition {
    pub fn new(level: u32, index: u64) -> Self {
        Self { level, index }
    }

    pub fn root() -> Self {
        Self::new(0, 0)
    }

    /// Position of the base rollup for a tx in a block of `num_txs` txs.
    pub fn base(num_txs: usize, tx_index: usize) -> Self {
        Self::new(num_txs.trailing_zeros(), tx_index as u64)
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn is_root(&self) -> bool {
        self.level == 0
    }

    /// Heap subscript of the node.
    pub fn subscript(&self) -> usize {
        (1usize << self.level) - 1 + self.index as usize
    }

    /// Returns the parent node and the slot this node fills in it, or `None`
    /// for the root.
    pub fn parent(&self) -> Option<(TreePosition, MergeSlot)> {
        if self.is_root() {
            return None;
        }

        let slot = if self.index & 1 == 0 {
            MergeSlot::Left
        } else {
            MergeSlot::Right
        };
        Some((TreePosition::new(self.level - 1, self.index >> 1), slot))
    }
}

/// Number of merge levels between the base rollups and the root, not counting
/// the root itself.
pub fn num_merge_levels(num_txs: usize) -> u32 {
    num_txs.trailing_zeros().saturating_sub(1)
}

/// Number of merge nodes, including the root, in a block of `num_txs` txs.
pub fn num_merge_nodes(num_txs: usize) -> usize {
    num_txs.saturating_sub(1)
}
