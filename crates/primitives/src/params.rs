//! Fixed protocol parameters shared by the circuits and the orchestrator.

/// Number of L1 to L2 messages a single block consumes.
pub const NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP: usize = 16;

/// Number of base parity circuits feeding the root parity circuit.
pub const NUM_BASE_PARITY_PER_ROOT_PARITY: usize = 4;

/// Number of messages hashed by each base parity circuit.
pub const NUM_MSGS_PER_BASE_PARITY: usize =
    NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP / NUM_BASE_PARITY_PER_ROOT_PARITY;

/// Height of the subtree a block's messages occupy in the message tree.
pub const L1_TO_L2_MSG_SUBTREE_HEIGHT: u32 = 4;

pub const L1_TO_L2_MSG_TREE_HEIGHT: u32 = 16;

pub const L1_TO_L2_MSG_SUBTREE_SIBLING_PATH_LENGTH: usize =
    (L1_TO_L2_MSG_TREE_HEIGHT - L1_TO_L2_MSG_SUBTREE_HEIGHT) as usize;

pub const NOTE_HASH_TREE_HEIGHT: u32 = 32;
pub const NULLIFIER_TREE_HEIGHT: u32 = 20;
pub const PUBLIC_DATA_TREE_HEIGHT: u32 = 40;
pub const ARCHIVE_HEIGHT: u32 = 16;

pub const MAX_NOTE_HASHES_PER_TX: usize = 64;
pub const MAX_NULLIFIERS_PER_TX: usize = 64;
pub const MAX_PUBLIC_DATA_WRITES_PER_TX: usize = 16;
pub const MAX_PUBLIC_KERNEL_REQUESTS_PER_TX: usize = 16;

/// Subtree heights of a single tx's leaves in each of the per-tx trees.  The
/// per-tx maxima are powers of two so every tx appends an aligned subtree.
pub const NOTE_HASH_SUBTREE_HEIGHT: u32 = MAX_NOTE_HASHES_PER_TX.trailing_zeros();
pub const NULLIFIER_SUBTREE_HEIGHT: u32 = MAX_NULLIFIERS_PER_TX.trailing_zeros();
pub const PUBLIC_DATA_SUBTREE_HEIGHT: u32 = MAX_PUBLIC_DATA_WRITES_PER_TX.trailing_zeros();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_tx_maxima_are_powers_of_two() {
        for max in [
            MAX_NOTE_HASHES_PER_TX,
            MAX_NULLIFIERS_PER_TX,
            MAX_PUBLIC_DATA_WRITES_PER_TX,
        ] {
            assert!(max.is_power_of_two());
        }
        assert_eq!(1 << L1_TO_L2_MSG_SUBTREE_HEIGHT, NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP);
        assert_eq!(NUM_MSGS_PER_BASE_PARITY, 4);
        assert_eq!(NOTE_HASH_SUBTREE_HEIGHT, 6);
        assert_eq!(PUBLIC_DATA_SUBTREE_HEIGHT, 4);
    }
}
