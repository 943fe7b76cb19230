//! Fixed-height binary Merkle arithmetic over [`Buf32`] nodes.
//!
//! Leaves are stored as-is; an empty leaf is the zero buf and an empty subtree
//! of height `h` hashes to `zero_hashes(h)[h]`.

use crate::{buf::Buf32, hash::hash_pair};

/// Returns the roots of empty subtrees of heights `0..=height`.
pub fn zero_hashes(height: u32) -> Vec<Buf32> {
    let mut zeros = Vec::with_capacity(height as usize + 1);
    zeros.push(Buf32::zero());
    for i in 0..height as usize {
        zeros.push(hash_pair(&zeros[i], &zeros[i]));
    }
    zeros
}

/// Root of an empty subtree of the given height.
pub fn zero_root(height: u32) -> Buf32 {
    zero_hashes(height)[height as usize]
}

/// Computes the root of a subtree over `leaves`, padding with empty leaves up
/// to the next power of two.
pub fn compute_root(leaves: &[Buf32]) -> Buf32 {
    if leaves.is_empty() {
        return Buf32::zero();
    }

    let width = leaves.len().next_power_of_two();
    let mut layer = leaves.to_vec();
    layer.resize(width, Buf32::zero());
    while layer.len() > 1 {
        layer = layer
            .chunks_exact(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    layer[0]
}

/// Folds `node` at position `index` up through `path`, returning the root.
///
/// `path[0]` is the sibling at the level of `node`.
pub fn compute_root_from_sibling_path(node: Buf32, mut index: u64, path: &[Buf32]) -> Buf32 {
    let mut cur = node;
    for sibling in path {
        cur = if index & 1 == 0 {
            hash_pair(&cur, sibling)
        } else {
            hash_pair(sibling, &cur)
        };
        index >>= 1;
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_hashes_chain() {
        let zeros = zero_hashes(3);
        assert_eq!(zeros.len(), 4);
        assert_eq!(zeros[0], Buf32::zero());
        assert_eq!(zeros[2], hash_pair(&zeros[1], &zeros[1]));
        assert_eq!(zero_root(3), zeros[3]);
    }

    #[test]
    fn test_root_of_empty_leaves_is_zero_root() {
        assert_eq!(compute_root(&[Buf32::zero(); 8]), zero_root(3));
    }

    #[test]
    fn test_root_pads_to_power_of_two() {
        let leaves = [Buf32::from_u64(1), Buf32::from_u64(2), Buf32::from_u64(3)];
        let padded = [leaves[0], leaves[1], leaves[2], Buf32::zero()];
        assert_eq!(compute_root(&leaves), compute_root(&padded));
    }

    #[test]
    fn test_sibling_path_matches_full_root() {
        let leaves: Vec<_> = (1..=8).map(Buf32::from_u64).collect();
        let root = compute_root(&leaves);

        // Path for leaf 5: sibling 4, then the pair (6, 7), then the left half.
        let path = [
            leaves[4],
            hash_pair(&leaves[6], &leaves[7]),
            compute_root(&leaves[..4]),
        ];
        assert_eq!(compute_root_from_sibling_path(leaves[5], 5, &path), root);
    }
}
