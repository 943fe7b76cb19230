use anyhow::{bail, ensure};
use rollup_primitives::{
    block::{ContentCommitment, Header},
    buf::Buf32,
    circuits::*,
    hash::hash_pair,
    merkle::{compute_root, compute_root_from_sibling_path, zero_root},
    params::*,
    tree::{AppendOnlyTreeSnapshot, MerkleTreeId, PartialStateReference, StateReference},
    tx::PublicKernelRequest,
};

use crate::proof::verify_proof;

pub fn base_parity(inputs: &BaseParityInputs) -> anyhow::Result<ParityPublicInputs> {
    Ok(ParityPublicInputs {
        root: compute_root(&inputs.msgs),
    })
}

pub fn root_parity(inputs: &RootParityInputs) -> anyhow::Result<ParityPublicInputs> {
    let mut roots = Vec::with_capacity(inputs.children.len());
    for child in &inputs.children {
        verify_proof(&child.proof, &child.public_inputs)?;
        roots.push(child.public_inputs.root);
    }

    Ok(ParityPublicInputs {
        root: compute_root(&roots),
    })
}

pub fn public_kernel(request: &PublicKernelRequest) -> anyhow::Result<PublicKernelPublicInputs> {
    Ok(PublicKernelPublicInputs {
        tx_hash: request.tx_hash,
        phase: request.phase,
    })
}

pub fn base_rollup(inputs: &BaseRollupInputs) -> anyhow::Result<BaseOrMergeRollupPublicInputs> {
    let effect = &inputs.tx_effect;
    ensure!(
        effect.note_hashes.len() <= MAX_NOTE_HASHES_PER_TX,
        "too many note hashes ({})",
        effect.note_hashes.len()
    );
    ensure!(
        effect.nullifiers.len() <= MAX_NULLIFIERS_PER_TX,
        "too many nullifiers ({})",
        effect.nullifiers.len()
    );
    ensure!(
        effect.public_data_writes.len() <= MAX_PUBLIC_DATA_WRITES_PER_TX,
        "too many public data writes ({})",
        effect.public_data_writes.len()
    );

    let start = &inputs.start;
    let end = PartialStateReference {
        note_hash_tree: insert_subtree(
            MerkleTreeId::NoteHash,
            &start.note_hash_tree,
            &effect.padded_note_hashes(),
            &inputs.note_hash_subtree_sibling_path,
        )?,
        nullifier_tree: insert_subtree(
            MerkleTreeId::Nullifier,
            &start.nullifier_tree,
            &effect.padded_nullifiers(),
            &inputs.nullifier_subtree_sibling_path,
        )?,
        public_data_tree: insert_subtree(
            MerkleTreeId::PublicData,
            &start.public_data_tree,
            &effect.padded_public_data_leaves(),
            &inputs.public_data_subtree_sibling_path,
        )?,
    };

    Ok(BaseOrMergeRollupPublicInputs {
        rollup_type: RollupType::Base,
        height_in_block_tree: 0,
        constants: inputs.constants,
        start: *start,
        end,
        txs_effects_hash: effect.hash(),
    })
}

pub fn merge_rollup(inputs: &MergeRollupInputs) -> anyhow::Result<BaseOrMergeRollupPublicInputs> {
    let [left, right] = &inputs.previous_rollup_data;
    check_previous_rollups(left, right)?;

    let (l, r) = (&left.public_inputs, &right.public_inputs);
    Ok(BaseOrMergeRollupPublicInputs {
        rollup_type: RollupType::Merge,
        height_in_block_tree: l.height_in_block_tree + 1,
        constants: l.constants,
        start: l.start,
        end: r.end,
        txs_effects_hash: hash_pair(&l.txs_effects_hash, &r.txs_effects_hash),
    })
}

pub fn root_rollup(inputs: &RootRollupInputs) -> anyhow::Result<RootRollupPublicInputs> {
    let [left, right] = &inputs.previous_rollup_data;
    check_previous_rollups(left, right)?;
    let (l, r) = (&left.public_inputs, &right.public_inputs);

    let parity = &inputs.l1_to_l2_roots;
    verify_proof(&parity.proof, &parity.public_inputs)?;
    let in_hash = parity.public_inputs.root;
    ensure!(
        compute_root(&inputs.new_l1_to_l2_messages) == in_hash,
        "l1 to l2 messages do not match the parity root"
    );

    let l1_to_l2_message_tree = insert_subtree(
        MerkleTreeId::L1ToL2Message,
        &inputs.start_l1_to_l2_message_tree_snapshot,
        &inputs.new_l1_to_l2_messages,
        &inputs.new_l1_to_l2_message_tree_root_sibling_path,
    )?;

    ensure!(
        inputs.start_archive_snapshot == l.constants.last_archive,
        "start archive does not match the last archive of the block"
    );

    let header = Header {
        last_archive: l.constants.last_archive,
        content_commitment: ContentCommitment {
            tx_tree_height: l.height_in_block_tree + 1,
            txs_effects_hash: hash_pair(&l.txs_effects_hash, &r.txs_effects_hash),
            in_hash,
        },
        state: StateReference {
            l1_to_l2_message_tree,
            partial: r.end,
        },
        global_variables: l.constants.global_variables,
    };

    let archive = insert_subtree(
        MerkleTreeId::Archive,
        &inputs.start_archive_snapshot,
        &[header.hash()],
        &inputs.new_archive_sibling_path,
    )?;

    Ok(RootRollupPublicInputs { archive, header })
}

fn check_previous_rollups(
    left: &PreviousRollupData,
    right: &PreviousRollupData,
) -> anyhow::Result<()> {
    verify_proof(&left.proof, &left.public_inputs)?;
    verify_proof(&right.proof, &right.public_inputs)?;

    let (l, r) = (&left.public_inputs, &right.public_inputs);
    ensure!(
        l.constants == r.constants,
        "previous rollups disagree on constants"
    );
    ensure!(
        l.height_in_block_tree == r.height_in_block_tree,
        "previous rollups have different heights ({} != {})",
        l.height_in_block_tree,
        r.height_in_block_tree
    );
    ensure!(
        l.end == r.start,
        "previous rollups are not contiguous, left end does not match right start"
    );
    Ok(())
}

/// Inserts a power-of-two sized batch of leaves as a subtree at the next free
/// position, checking the sibling path against the start snapshot.
fn insert_subtree(
    id: MerkleTreeId,
    start: &AppendOnlyTreeSnapshot,
    leaves: &[Buf32],
    sibling_path: &[Buf32],
) -> anyhow::Result<AppendOnlyTreeSnapshot> {
    if !leaves.len().is_power_of_two() {
        bail!("{id} subtree of {} leaves is not a power of two", leaves.len());
    }

    let height = leaves.len().trailing_zeros();
    let expected_len = (id.height() - height) as usize;
    ensure!(
        sibling_path.len() == expected_len,
        "{id} sibling path has length {}, expected {expected_len}",
        sibling_path.len()
    );

    let next = start.next_available_leaf_index;
    ensure!(
        next % (1u64 << height) == 0,
        "{id} next index {next} is not aligned to a subtree of height {height}"
    );

    let index = next >> height;
    ensure!(
        compute_root_from_sibling_path(zero_root(height), index, sibling_path) == start.root,
        "{id} sibling path does not match the start root"
    );

    let root = compute_root_from_sibling_path(compute_root(leaves), index, sibling_path);
    Ok(AppendOnlyTreeSnapshot::new(root, next + leaves.len() as u64))
}
