use std::{sync::Arc, time::Duration};

use rollup_circuit_prover::{CircuitName, CircuitProver};
use rollup_db::{stubs::StubTreeStore, traits::TreeStore};
use rollup_native_prover::NativeCircuitProver;
use rollup_primitives::{
    block::Header,
    buf::Buf32,
    circuits::RootRollupPublicInputs,
    params::NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP,
    tree::{AppendOnlyTreeSnapshot, MerkleTreeId},
    tx::ProcessedTx,
};
use rollup_prover_orchestrator::{
    OrchestratorConfig, OrchestratorError, ProvingOrchestrator, ProvingTicket, TxValidationError,
};
use rollup_test_utils::{
    provers::{InstrumentedProver, TamperingProver},
    txs::*,
    wait_until,
};

const TIMEOUT: Duration = Duration::from_secs(10);

type Instrumented = InstrumentedProver<NativeCircuitProver>;

fn setup<P: CircuitProver>(
    prover: Arc<P>,
) -> (ProvingOrchestrator<P, StubTreeStore>, Arc<StubTreeStore>) {
    let db = Arc::new(StubTreeStore::new());
    let orchestrator =
        ProvingOrchestrator::new(prover, db.clone(), OrchestratorConfig::default());
    orchestrator.start().unwrap();
    (orchestrator, db)
}

fn instrumented() -> Arc<Instrumented> {
    Arc::new(InstrumentedProver::new(NativeCircuitProver::new()))
}

async fn snapshots(db: &StubTreeStore) -> Vec<AppendOnlyTreeSnapshot> {
    let mut out = Vec::new();
    for id in MerkleTreeId::ALL {
        out.push(db.get_snapshot(id).await.unwrap());
    }
    out
}

async fn settle(ticket: ProvingTicket) -> Result<(), OrchestratorError> {
    tokio::time::timeout(TIMEOUT, ticket)
        .await
        .expect("ticket did not settle")
}

#[tokio::test]
async fn test_rejects_invalid_tx_counts() {
    let (orchestrator, db) = setup(instrumented());
    let before = snapshots(&db).await;

    for num_txs in [0, 1, 3, 6] {
        let res = orchestrator
            .start_new_block(
                num_txs,
                make_global_variables(1),
                make_l1_to_l2_messages(2),
                ProcessedTx::empty(),
            )
            .await;
        assert!(
            matches!(res, Err(OrchestratorError::InvalidArgument(_))),
            "num_txs {num_txs} accepted"
        );
    }

    let too_many = vec![Buf32::from_u64(1); NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP + 1];
    let res = orchestrator
        .start_new_block(4, make_global_variables(1), too_many, ProcessedTx::empty())
        .await;
    assert!(matches!(res, Err(OrchestratorError::InvalidArgument(_))));

    assert_eq!(snapshots(&db).await, before);
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_proves_padded_block() {
    let prover = instrumented();
    let (orchestrator, db) = setup(prover.clone());

    let ticket = orchestrator
        .start_new_block(
            4,
            make_global_variables(1),
            make_l1_to_l2_messages(3),
            ProcessedTx::empty(),
        )
        .await
        .unwrap();
    orchestrator.add_new_tx(make_processed_tx(1)).await.unwrap();
    orchestrator.add_new_tx(make_processed_tx(2)).await.unwrap();
    orchestrator.set_block_completed().await.unwrap();

    settle(ticket).await.unwrap();
    let result = orchestrator.finalise_block().await.unwrap();

    assert_eq!(prover.completed(CircuitName::BaseParity), 4);
    assert_eq!(prover.completed(CircuitName::RootParity), 1);
    assert_eq!(prover.completed(CircuitName::BaseRollup), 4);
    assert_eq!(prover.completed(CircuitName::MergeRollup), 2);
    assert_eq!(prover.completed(CircuitName::RootRollup), 1);

    let block = result.block;
    assert_eq!(block.number(), 1);
    assert_eq!(block.body().tx_effects().len(), 2);
    assert_eq!(block.header().content_commitment.tx_tree_height, 2);
    assert_eq!(
        *block.archive(),
        db.get_snapshot(MerkleTreeId::Archive).await.unwrap()
    );
    assert_eq!(block.archive().next_available_leaf_index, 1);
    let outputs = RootRollupPublicInputs {
        archive: *block.archive(),
        header: *block.header(),
    };
    rollup_native_prover::verify_proof(&result.proof, &outputs).unwrap();

    orchestrator.stop().await;
}

#[tokio::test]
async fn test_single_tx_round_trip() {
    let prover = instrumented();
    let (orchestrator, _db) = setup(prover.clone());
    let tx = make_processed_tx(7);
    let global_variables = make_global_variables(3);

    let ticket = orchestrator
        .start_new_block(2, global_variables, vec![], ProcessedTx::empty())
        .await
        .unwrap();
    orchestrator.add_new_tx(tx.clone()).await.unwrap();
    orchestrator.set_block_completed().await.unwrap();
    // Nothing left to pad.
    orchestrator.set_block_completed().await.unwrap();

    settle(ticket).await.unwrap();
    let block = orchestrator.finalise_block().await.unwrap().block;

    assert_eq!(block.body().tx_effects(), &[tx.to_tx_effect()]);
    assert_eq!(block.header().global_variables, global_variables);
    assert_eq!(prover.completed(CircuitName::MergeRollup), 0);
    assert_eq!(prover.completed(CircuitName::BaseRollup), 2);

    assert!(matches!(
        orchestrator.finalise_block().await,
        Err(OrchestratorError::InvalidState(_))
    ));
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_consecutive_blocks_chain_archive() {
    let (orchestrator, db) = setup(instrumented());

    let mut blocks = Vec::new();
    for block_number in 1..=2 {
        let ticket = orchestrator
            .start_new_block(
                2,
                make_global_variables(block_number),
                make_l1_to_l2_messages(4),
                ProcessedTx::empty(),
            )
            .await
            .unwrap();
        orchestrator
            .add_new_tx(make_processed_tx(block_number * 10))
            .await
            .unwrap();
        orchestrator.set_block_completed().await.unwrap();
        settle(ticket).await.unwrap();
        blocks.push(orchestrator.finalise_block().await.unwrap().block);
    }

    assert_eq!(blocks[1].header().last_archive, *blocks[0].archive());
    assert_eq!(
        db.get_snapshot(MerkleTreeId::Archive)
            .await
            .unwrap()
            .next_available_leaf_index,
        2
    );
    assert_eq!(
        db.get_snapshot(MerkleTreeId::L1ToL2Message)
            .await
            .unwrap()
            .next_available_leaf_index,
        2 * NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP as u64
    );
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_new_block_cancels_previous() {
    let prover =
        Arc::new(InstrumentedProver::new(NativeCircuitProver::new()).with_base_rollup_gate(0));
    let (orchestrator, db) = setup(prover.clone());

    let first = orchestrator
        .start_new_block(2, make_global_variables(1), vec![], ProcessedTx::empty())
        .await
        .unwrap();
    orchestrator.add_new_tx(make_processed_tx(1)).await.unwrap();
    orchestrator.set_block_completed().await.unwrap();

    wait_until(TIMEOUT, || prover.started(CircuitName::BaseRollup) == 2).await;

    let second = orchestrator
        .start_new_block(2, make_global_variables(2), vec![], ProcessedTx::empty())
        .await
        .unwrap();
    assert!(matches!(settle(first).await, Err(OrchestratorError::Cancelled)));

    // Let the stale base rollups finish, they must not touch anything.
    let before = snapshots(&db).await;
    prover.release_base_rollups();
    wait_until(TIMEOUT, || prover.completed(CircuitName::BaseRollup) == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(snapshots(&db).await, before);
    assert_eq!(prover.started(CircuitName::RootRollup), 0);

    orchestrator.add_new_tx(make_processed_tx(2)).await.unwrap();
    orchestrator.set_block_completed().await.unwrap();
    settle(second).await.unwrap();

    let block = orchestrator.finalise_block().await.unwrap().block;
    assert_eq!(block.number(), 2);
    assert_eq!(prover.completed(CircuitName::RootRollup), 1);
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_merges_proceed_as_children_complete() {
    let prover = Arc::new(
        InstrumentedProver::new(NativeCircuitProver::new())
            .with_base_rollup_gate(2)
            .with_root_parity_gate(),
    );
    let (orchestrator, _db) = setup(prover.clone());

    let ticket = orchestrator
        .start_new_block(
            4,
            make_global_variables(1),
            make_l1_to_l2_messages(16),
            ProcessedTx::empty(),
        )
        .await
        .unwrap();
    for seed in 0..4 {
        orchestrator.add_new_tx(make_processed_tx(seed)).await.unwrap();
    }

    // Left half merges while the right half is still held back.
    wait_until(TIMEOUT, || prover.completed(CircuitName::MergeRollup) == 1).await;
    assert_eq!(prover.completed(CircuitName::BaseRollup), 2);

    prover.release_base_rollups();
    wait_until(TIMEOUT, || prover.completed(CircuitName::MergeRollup) == 2).await;
    // Parity is still held, so the root rollup can't run yet.
    assert_eq!(prover.started(CircuitName::RootRollup), 0);
    assert!(matches!(
        orchestrator.finalise_block().await,
        Err(OrchestratorError::InvalidState(_))
    ));

    prover.release_root_parity();
    settle(ticket).await.unwrap();

    let log = prover.completion_log();
    let first_merge = log
        .iter()
        .position(|(c, _)| *c == CircuitName::MergeRollup)
        .unwrap();
    let right_base = log
        .iter()
        .position(|(c, leaf)| *c == CircuitName::BaseRollup && leaf.is_some_and(|l| l >= 2))
        .unwrap();
    assert!(first_merge < right_base);

    let block = orchestrator.finalise_block().await.unwrap().block;
    assert_eq!(block.body().tx_effects().len(), 4);
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_tampered_base_rollup_fails_block() {
    let prover = Arc::new(InstrumentedProver::new(TamperingProver::new(
        NativeCircuitProver::new(),
        1,
    )));
    let (orchestrator, _db) = setup(prover.clone());

    let ticket = orchestrator
        .start_new_block(2, make_global_variables(1), vec![], ProcessedTx::empty())
        .await
        .unwrap();
    orchestrator.add_new_tx(make_processed_tx(1)).await.unwrap();
    orchestrator.add_new_tx(make_processed_tx(2)).await.unwrap();

    assert!(matches!(
        settle(ticket).await,
        Err(OrchestratorError::Consistency(_))
    ));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(prover.started(CircuitName::RootRollup), 0);
    assert!(matches!(
        orchestrator.finalise_block().await,
        Err(OrchestratorError::InvalidState(_))
    ));
    // The block is dead, no more txs.
    assert!(matches!(
        orchestrator.add_new_tx(make_processed_tx(3)).await,
        Err(OrchestratorError::InvalidState(_))
    ));
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_cancel_block_is_idempotent() {
    let (orchestrator, _db) = setup(instrumented());
    // No block yet.
    orchestrator.cancel_block();

    let ticket = orchestrator
        .start_new_block(2, make_global_variables(1), vec![], ProcessedTx::empty())
        .await
        .unwrap();
    orchestrator.cancel_block();
    orchestrator.cancel_block();

    assert!(matches!(settle(ticket).await, Err(OrchestratorError::Cancelled)));
    assert!(matches!(
        orchestrator.add_new_tx(make_processed_tx(1)).await,
        Err(OrchestratorError::InvalidState(_))
    ));
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_public_kernel_calls_run_before_base_rollup() {
    let prover = instrumented();
    let (orchestrator, _db) = setup(prover.clone());

    let ticket = orchestrator
        .start_new_block(2, make_global_variables(1), vec![], ProcessedTx::empty())
        .await
        .unwrap();
    orchestrator
        .add_new_tx(make_processed_tx_with_public_calls(1, 3))
        .await
        .unwrap();
    orchestrator.add_new_tx(make_processed_tx(2)).await.unwrap();
    settle(ticket).await.unwrap();

    assert_eq!(prover.completed(CircuitName::PublicKernel), 3);
    let log = prover.completion_log();
    let last_kernel = log
        .iter()
        .rposition(|(c, _)| *c == CircuitName::PublicKernel)
        .unwrap();
    let first_base = log
        .iter()
        .position(|(c, leaf)| *c == CircuitName::BaseRollup && *leaf == Some(0))
        .unwrap();
    assert!(last_kernel < first_base);
    orchestrator.stop().await;
}

#[tokio::test]
async fn test_tx_admission_errors() {
    let (orchestrator, _db) = setup(instrumented());

    assert!(matches!(
        orchestrator.add_new_tx(make_processed_tx(1)).await,
        Err(OrchestratorError::InvalidState(_))
    ));

    let ticket = orchestrator
        .start_new_block(2, make_global_variables(1), vec![], ProcessedTx::empty())
        .await
        .unwrap();

    let mut invalid = make_processed_tx(1);
    invalid.nullifiers.clear();
    assert!(matches!(
        orchestrator.add_new_tx(invalid).await,
        Err(OrchestratorError::InvalidTransaction(_))
    ));

    // A rejected tx leaves the block usable.
    orchestrator.add_new_tx(make_processed_tx(1)).await.unwrap();
    orchestrator.add_new_tx(make_processed_tx(2)).await.unwrap();
    assert!(matches!(
        orchestrator.add_new_tx(make_processed_tx(3)).await,
        Err(OrchestratorError::InvalidState(_))
    ));

    settle(ticket).await.unwrap();
    orchestrator.stop().await;
}

/// Proves a block with two real txs and waits for its ticket.
async fn prove_two_tx_block(orchestrator: &ProvingOrchestrator<Instrumented, StubTreeStore>) {
    let ticket = orchestrator
        .start_new_block(4, make_global_variables(1), vec![], ProcessedTx::empty())
        .await
        .unwrap();
    orchestrator.add_new_tx(make_processed_tx(1)).await.unwrap();
    orchestrator.add_new_tx(make_processed_tx(2)).await.unwrap();
    orchestrator.set_block_completed().await.unwrap();
    settle(ticket).await.unwrap();
}

#[tokio::test]
async fn test_rejects_padding_tx_mid_block() {
    let (orchestrator, _db) = setup(instrumented());

    let ticket = orchestrator
        .start_new_block(4, make_global_variables(1), vec![], ProcessedTx::empty())
        .await
        .unwrap();
    orchestrator.add_new_tx(make_processed_tx(1)).await.unwrap();
    assert!(matches!(
        orchestrator.add_new_tx(ProcessedTx::empty()).await,
        Err(OrchestratorError::InvalidTransaction(TxValidationError::PaddingTx))
    ));
    orchestrator.add_new_tx(make_processed_tx(2)).await.unwrap();
    orchestrator.set_block_completed().await.unwrap();

    settle(ticket).await.unwrap();
    let result = orchestrator.finalise_block().await.unwrap();
    assert_eq!(result.block.body().tx_effects().len(), 2);

    orchestrator.stop().await;
}

#[tokio::test]
async fn test_failed_tree_check_invalidates_block() {
    let (orchestrator, db) = setup(instrumented());
    prove_two_tx_block(&orchestrator).await;

    // Move the note hash tree past what the root rollup committed to.
    db.append_leaves(MerkleTreeId::NoteHash, &[Buf32::from_u64(9)])
        .await
        .unwrap();

    assert!(matches!(
        orchestrator.finalise_block().await,
        Err(OrchestratorError::Consistency(_))
    ));
    // The header never reached the archive.
    let archive = db.get_snapshot(MerkleTreeId::Archive).await.unwrap();
    assert_eq!(archive.next_available_leaf_index, 0);

    assert!(matches!(
        orchestrator.finalise_block().await,
        Err(OrchestratorError::InvalidState(_))
    ));
    let archive = db.get_snapshot(MerkleTreeId::Archive).await.unwrap();
    assert_eq!(archive.next_available_leaf_index, 0);

    orchestrator.stop().await;
}

#[tokio::test]
async fn test_archive_mismatch_is_not_retried() {
    let (orchestrator, db) = setup(instrumented());
    prove_two_tx_block(&orchestrator).await;

    db.update_archive(&Header::default()).await.unwrap();

    assert!(matches!(
        orchestrator.finalise_block().await,
        Err(OrchestratorError::Consistency(_))
    ));
    assert!(matches!(
        orchestrator.finalise_block().await,
        Err(OrchestratorError::InvalidState(_))
    ));

    // Only the foreign header and the one attempt were appended.
    let archive = db.get_snapshot(MerkleTreeId::Archive).await.unwrap();
    assert_eq!(archive.next_available_leaf_index, 2);

    orchestrator.stop().await;
}

#[tokio::test]
async fn test_stop_cancels_current_block() {
    let prover =
        Arc::new(InstrumentedProver::new(NativeCircuitProver::new()).with_root_parity_gate());
    let (orchestrator, _db) = setup(prover.clone());

    let ticket = orchestrator
        .start_new_block(2, make_global_variables(1), vec![], ProcessedTx::empty())
        .await
        .unwrap();
    wait_until(TIMEOUT, || prover.started(CircuitName::RootParity) == 1).await;

    // Stop waits for the held job, so open the gate from the side.
    let releaser = {
        let prover = prover.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            prover.release_root_parity();
        })
    };
    orchestrator.stop().await;
    releaser.await.unwrap();

    assert!(matches!(settle(ticket).await, Err(OrchestratorError::Cancelled)));
    assert_eq!(prover.started(CircuitName::RootRollup), 0);
}
