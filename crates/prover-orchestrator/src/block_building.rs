//! Helpers that read and write the tree store on behalf of the orchestrator
//! and check circuit outputs against it.

use rollup_db::traits::TreeStore;
use rollup_primitives::{
    block::GlobalVariables,
    buf::Buf32,
    circuits::*,
    params::*,
    tree::{AppendOnlyTreeSnapshot, MerkleTreeId, PartialStateReference},
    tx::ProcessedTx,
};
use tracing::*;

use crate::errors::{OrchestratorError, OrchestratorResult};

/// Pads a block's messages with zero up to the fixed per-block count.
pub(crate) fn pad_l1_to_l2_messages(
    msgs: &[Buf32],
) -> OrchestratorResult<[Buf32; NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP]> {
    if msgs.len() > NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP {
        return Err(OrchestratorError::InvalidArgument(format!(
            "too many L1 to L2 messages ({} > {NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP})",
            msgs.len()
        )));
    }

    let mut padded = [Buf32::zero(); NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP];
    padded[..msgs.len()].copy_from_slice(msgs);
    Ok(padded)
}

/// Pads or truncates a sibling path to a fixed length.
pub(crate) fn fixed_length_path(mut path: Vec<Buf32>, len: usize) -> Vec<Buf32> {
    path.resize(len, Buf32::zero());
    path
}

pub(crate) async fn get_partial_state<T: TreeStore>(
    db: &T,
) -> OrchestratorResult<PartialStateReference> {
    Ok(PartialStateReference {
        note_hash_tree: db.get_snapshot(MerkleTreeId::NoteHash).await?,
        nullifier_tree: db.get_snapshot(MerkleTreeId::Nullifier).await?,
        public_data_tree: db.get_snapshot(MerkleTreeId::PublicData).await?,
    })
}

/// Captures the sibling path for a tx tree's next subtree, then appends the
/// tx's leaves there.
async fn insert_tx_leaves<T: TreeStore>(
    db: &T,
    id: MerkleTreeId,
    subtree_height: u32,
    leaves: &[Buf32],
) -> OrchestratorResult<Vec<Buf32>> {
    let path = db.get_subtree_sibling_path(id, subtree_height).await?;
    db.append_leaves(id, leaves).await?;
    Ok(path)
}

/// Builds the base rollup inputs for a tx, applying its side effects to the
/// tree store.
pub(crate) async fn build_base_rollup_input<T: TreeStore>(
    tx: &ProcessedTx,
    global_variables: &GlobalVariables,
    db: &T,
) -> OrchestratorResult<BaseRollupInputs> {
    let last_archive = db.get_snapshot(MerkleTreeId::Archive).await?;
    let start = get_partial_state(db).await?;
    let tx_effect = tx.to_tx_effect();

    let note_hash_subtree_sibling_path = insert_tx_leaves(
        db,
        MerkleTreeId::NoteHash,
        NOTE_HASH_SUBTREE_HEIGHT,
        &tx_effect.padded_note_hashes(),
    )
    .await?;
    let nullifier_subtree_sibling_path = insert_tx_leaves(
        db,
        MerkleTreeId::Nullifier,
        NULLIFIER_SUBTREE_HEIGHT,
        &tx_effect.padded_nullifiers(),
    )
    .await?;
    let public_data_subtree_sibling_path = insert_tx_leaves(
        db,
        MerkleTreeId::PublicData,
        PUBLIC_DATA_SUBTREE_HEIGHT,
        &tx_effect.padded_public_data_leaves(),
    )
    .await?;

    trace!(tx_hash = %tx.hash, "built base rollup inputs");
    Ok(BaseRollupInputs {
        tx_effect,
        constants: ConstantRollupData {
            last_archive,
            global_variables: *global_variables,
        },
        start,
        note_hash_subtree_sibling_path,
        nullifier_subtree_sibling_path,
        public_data_subtree_sibling_path,
    })
}

/// Checks a base rollup's end state against the snapshots taken when its tx
/// was applied to the store.
pub(crate) fn validate_partial_state(
    end: &PartialStateReference,
    snapshots: &PartialStateReference,
) -> OrchestratorResult<()> {
    for id in MerkleTreeId::TX_TREES {
        if let (Some(out), Some(tracked)) = (end.get(id), snapshots.get(id)) {
            check_snapshot(id, out, tracked)?;
        }
    }
    Ok(())
}

fn check_snapshot(
    id: MerkleTreeId,
    output: &AppendOnlyTreeSnapshot,
    tracked: &AppendOnlyTreeSnapshot,
) -> OrchestratorResult<()> {
    if output != tracked {
        return Err(OrchestratorError::Consistency(format!(
            "{id} tree mismatch, circuit output {:?}@{} != tracked {:?}@{}",
            output.root,
            output.next_available_leaf_index,
            tracked.root,
            tracked.next_available_leaf_index,
        )));
    }
    Ok(())
}

/// Assembles the root rollup inputs, reading the archive from the store.
pub(crate) async fn build_root_rollup_input<T: TreeStore>(
    previous_rollup_data: [PreviousRollupData; 2],
    l1_to_l2_roots: RootParityInput,
    new_l1_to_l2_messages: [Buf32; NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP],
    start_l1_to_l2_message_tree_snapshot: AppendOnlyTreeSnapshot,
    message_tree_root_sibling_path: Vec<Buf32>,
    db: &T,
) -> OrchestratorResult<RootRollupInputs> {
    let start_archive_snapshot = db.get_snapshot(MerkleTreeId::Archive).await?;
    let new_archive_sibling_path = db
        .get_subtree_sibling_path(MerkleTreeId::Archive, 0)
        .await?;

    Ok(RootRollupInputs {
        previous_rollup_data,
        l1_to_l2_roots,
        new_l1_to_l2_messages,
        new_l1_to_l2_message_tree_root_sibling_path: message_tree_root_sibling_path,
        start_l1_to_l2_message_tree_snapshot,
        start_archive_snapshot,
        new_archive_sibling_path,
    })
}

/// Checks the root rollup's claimed state against the store, after the
/// archive has been updated with the new header.
/// Checks the root output's message tree and partial state against the store.
pub(crate) async fn validate_root_trees<T: TreeStore>(
    outputs: &RootRollupPublicInputs,
    db: &T,
) -> OrchestratorResult<()> {
    let messages = db.get_snapshot(MerkleTreeId::L1ToL2Message).await?;
    check_snapshot(
        MerkleTreeId::L1ToL2Message,
        &outputs.header.state.l1_to_l2_message_tree,
        &messages,
    )?;

    let partial = get_partial_state(db).await?;
    validate_partial_state(&outputs.header.state.partial, &partial)
}

/// Checks the root output's archive once its header has been appended.
pub(crate) async fn validate_root_archive<T: TreeStore>(
    outputs: &RootRollupPublicInputs,
    db: &T,
) -> OrchestratorResult<()> {
    let archive = db.get_snapshot(MerkleTreeId::Archive).await?;
    check_snapshot(MerkleTreeId::Archive, &outputs.archive, &archive)
}
