//! Mutable record of one block being proven.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use parking_lot::Mutex;
use rollup_primitives::{
    block::{GlobalVariables, L2Block},
    buf::Buf32,
    circuits::*,
    params::*,
    tree::{AppendOnlyTreeSnapshot, PartialStateReference},
    tx::{ProcessedTx, PublicKernelRequest},
};
use tokio::sync::oneshot;
use tracing::*;

use crate::{
    cancel::CancellationToken,
    errors::{OrchestratorError, OrchestratorResult},
    tree_addr::{num_merge_nodes, MergeSlot, TreePosition},
};

/// How proving a block ended.
pub type ProvingOutcome = Result<(), OrchestratorError>;

/// Resolves once the block's root rollup has been proven, or with the reason
/// it never will be.
#[derive(Debug)]
pub struct ProvingTicket {
    rx: oneshot::Receiver<ProvingOutcome>,
}

impl Future for ProvingTicket {
    type Output = ProvingOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the state went away without settling.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(OrchestratorError::Cancelled)))
    }
}

/// Base rollup inputs for a tx along with the tree snapshots taken right after
/// its leaves were appended.
#[derive(Clone, Debug)]
pub(crate) struct PreparedTx {
    pub(crate) inputs: BaseRollupInputs,
    pub(crate) snapshots: PartialStateReference,
}

#[derive(Debug)]
enum PreparedSlot {
    Pending,
    Ready(Box<PreparedTx>),
    Consumed,
}

/// The two child outputs a merge (or the root) rollup consumes.
#[derive(Clone, Debug, Default)]
pub(crate) struct MergeInputs {
    slots: [Option<PreviousRollupData>; 2],
}

impl MergeInputs {
    fn is_ready(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub(crate) fn into_pair(self) -> Option<[PreviousRollupData; 2]> {
        match self.slots {
            [Some(left), Some(right)] => Some([left, right]),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct StateInner {
    all_txs: Vec<ProcessedTx>,
    prepared: Vec<PreparedSlot>,
    merge_inputs: Vec<MergeInputs>,
    root_parity_inputs: Vec<Option<RootParityInput>>,
    final_root_parity_input: Option<RootParityInput>,
    root_rollup_claimed: bool,
    root_rollup_public_inputs: Option<RootRollupPublicInputs>,
    final_proof: Option<Proof>,
    block: Option<L2Block>,
}

/// Everything known about the block currently being proven.
///
/// Shared between the orchestrator and every job working on the block.  The
/// internals sit behind a lock that is never held across an await.
#[derive(Debug)]
pub(crate) struct ProvingState {
    total_num_txs: usize,
    global_variables: GlobalVariables,
    empty_tx: ProcessedTx,
    new_l1_to_l2_messages: [Buf32; NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP],
    message_tree_snapshot: AppendOnlyTreeSnapshot,
    message_tree_root_sibling_path: Vec<Buf32>,
    token: CancellationToken,
    inner: Mutex<StateInner>,
    outcome: Mutex<Option<oneshot::Sender<ProvingOutcome>>>,
}

impl ProvingState {
    pub(crate) fn new(
        total_num_txs: usize,
        global_variables: GlobalVariables,
        empty_tx: ProcessedTx,
        new_l1_to_l2_messages: [Buf32; NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP],
        message_tree_snapshot: AppendOnlyTreeSnapshot,
        message_tree_root_sibling_path: Vec<Buf32>,
    ) -> (Self, ProvingTicket) {
        let (tx, rx) = oneshot::channel();
        let inner = StateInner {
            all_txs: Vec::with_capacity(total_num_txs),
            prepared: (0..total_num_txs).map(|_| PreparedSlot::Pending).collect(),
            merge_inputs: vec![MergeInputs::default(); num_merge_nodes(total_num_txs)],
            root_parity_inputs: vec![None; NUM_BASE_PARITY_PER_ROOT_PARITY],
            final_root_parity_input: None,
            root_rollup_claimed: false,
            root_rollup_public_inputs: None,
            final_proof: None,
            block: None,
        };

        let state = Self {
            total_num_txs,
            global_variables,
            empty_tx,
            new_l1_to_l2_messages,
            message_tree_snapshot,
            message_tree_root_sibling_path,
            token: CancellationToken::new(),
            inner: Mutex::new(inner),
            outcome: Mutex::new(Some(tx)),
        };
        (state, ProvingTicket { rx })
    }

    pub(crate) fn total_num_txs(&self) -> usize {
        self.total_num_txs
    }

    pub(crate) fn global_variables(&self) -> &GlobalVariables {
        &self.global_variables
    }

    pub(crate) fn empty_tx(&self) -> &ProcessedTx {
        &self.empty_tx
    }

    pub(crate) fn new_l1_to_l2_messages(&self) -> &[Buf32; NUMBER_OF_L1_L2_MESSAGES_PER_ROLLUP] {
        &self.new_l1_to_l2_messages
    }

    pub(crate) fn message_tree_snapshot(&self) -> &AppendOnlyTreeSnapshot {
        &self.message_tree_snapshot
    }

    pub(crate) fn message_tree_root_sibling_path(&self) -> &[Buf32] {
        &self.message_tree_root_sibling_path
    }

    pub(crate) fn transactions_received(&self) -> usize {
        self.inner.lock().all_txs.len()
    }

    pub(crate) fn is_accepting_transactions(&self) -> bool {
        self.transactions_received() < self.total_num_txs
    }

    /// Admits a tx, returning its leaf index.
    pub(crate) fn add_new_tx(&self, tx: ProcessedTx) -> OrchestratorResult<usize> {
        let mut inner = self.inner.lock();
        if inner.all_txs.len() >= self.total_num_txs {
            return Err(OrchestratorError::InvalidState(
                "rollup not accepting further transactions".to_owned(),
            ));
        }
        inner.all_txs.push(tx);
        Ok(inner.all_txs.len() - 1)
    }

    pub(crate) fn all_txs(&self) -> Vec<ProcessedTx> {
        self.inner.lock().all_txs.clone()
    }

    pub(crate) fn store_prepared_tx(
        &self,
        tx_index: usize,
        prepared: PreparedTx,
    ) -> OrchestratorResult<()> {
        let mut inner = self.inner.lock();
        let slot = inner.prepared.get_mut(tx_index).ok_or_else(|| {
            OrchestratorError::InvalidState(format!("tx index {tx_index} out of range"))
        })?;
        if !matches!(slot, PreparedSlot::Pending) {
            return Err(OrchestratorError::InvalidState(format!(
                "base rollup inputs for tx {tx_index} already prepared"
            )));
        }
        *slot = PreparedSlot::Ready(Box::new(prepared));
        Ok(())
    }

    /// Hands out the prepared inputs of a tx, exactly once.
    pub(crate) fn take_base_rollup_inputs(&self, tx_index: usize) -> OrchestratorResult<PreparedTx> {
        let mut inner = self.inner.lock();
        let slot = inner.prepared.get_mut(tx_index).ok_or_else(|| {
            OrchestratorError::InvalidState(format!("tx index {tx_index} out of range"))
        })?;

        match std::mem::replace(slot, PreparedSlot::Consumed) {
            PreparedSlot::Ready(prepared) => Ok(*prepared),
            other => {
                *slot = other;
                Err(OrchestratorError::InvalidState(format!(
                    "base rollup inputs for tx {tx_index} not available"
                )))
            }
        }
    }

    /// Returns the tx hash and its `function_index`-th public kernel request,
    /// if there is one.
    pub(crate) fn public_kernel_request(
        &self,
        tx_index: usize,
        function_index: usize,
    ) -> OrchestratorResult<(Buf32, Option<PublicKernelRequest>)> {
        let inner = self.inner.lock();
        let tx = inner.all_txs.get(tx_index).ok_or_else(|| {
            OrchestratorError::InvalidState(format!("no tx at index {tx_index}"))
        })?;
        Ok((
            tx.hash,
            tx.public_kernel_requests.get(function_index).cloned(),
        ))
    }

    /// Stores a child output into its parent merge node.  Returns the node's
    /// inputs to the caller that completes it.
    pub(crate) fn store_merge_inputs(
        &self,
        parent: TreePosition,
        slot: MergeSlot,
        data: PreviousRollupData,
    ) -> OrchestratorResult<Option<MergeInputs>> {
        let subscript = parent.subscript();
        let mut inner = self.inner.lock();
        let node = inner.merge_inputs.get_mut(subscript).ok_or_else(|| {
            OrchestratorError::InvalidState(format!("merge subscript {subscript} out of range"))
        })?;

        let entry = &mut node.slots[slot.index()];
        if entry.is_some() {
            return Err(OrchestratorError::InvalidState(format!(
                "merge inputs at subscript {subscript} slot {slot:?} already set"
            )));
        }
        *entry = Some(data);

        Ok(node.is_ready().then(|| node.clone()))
    }

    /// Reads back whatever has been stored into a merge node so far.
    pub(crate) fn get_merge_inputs(&self, position: TreePosition) -> Option<MergeInputs> {
        self.inner
            .lock()
            .merge_inputs
            .get(position.subscript())
            .cloned()
    }

    /// Both outputs feeding the root rollup, once available.
    pub(crate) fn merge_root_inputs(&self) -> Option<[PreviousRollupData; 2]> {
        self.get_merge_inputs(TreePosition::root())
            .and_then(MergeInputs::into_pair)
    }

    /// Stores a base parity output.  Returns the root parity inputs to the
    /// caller that fills the last slot.
    pub(crate) fn set_root_parity_input(
        &self,
        index: usize,
        input: RootParityInput,
    ) -> OrchestratorResult<Option<RootParityInputs>> {
        let mut inner = self.inner.lock();
        let entry = inner.root_parity_inputs.get_mut(index).ok_or_else(|| {
            OrchestratorError::InvalidState(format!("parity index {index} out of range"))
        })?;
        if entry.is_some() {
            return Err(OrchestratorError::InvalidState(format!(
                "root parity input {index} already set"
            )));
        }
        *entry = Some(input);

        let children: Option<Vec<_>> = inner.root_parity_inputs.iter().cloned().collect();
        Ok(children.and_then(|c| {
            c.try_into()
                .ok()
                .map(|children| RootParityInputs { children })
        }))
    }

    pub(crate) fn are_root_parity_inputs_ready(&self) -> bool {
        self.inner
            .lock()
            .root_parity_inputs
            .iter()
            .all(Option::is_some)
    }

    pub(crate) fn set_final_root_parity_input(&self, input: RootParityInput) -> OrchestratorResult<()> {
        let mut inner = self.inner.lock();
        if inner.final_root_parity_input.is_some() {
            return Err(OrchestratorError::InvalidState(
                "final root parity input already set".to_owned(),
            ));
        }
        inner.final_root_parity_input = Some(input);
        Ok(())
    }

    pub(crate) fn final_root_parity_input(&self) -> Option<RootParityInput> {
        self.inner.lock().final_root_parity_input.clone()
    }

    pub(crate) fn is_ready_for_root_rollup(&self) -> bool {
        let inner = self.inner.lock();
        Self::root_inputs_ready(&inner)
    }

    fn root_inputs_ready(inner: &StateInner) -> bool {
        let merge_root_ready = inner
            .merge_inputs
            .get(TreePosition::root().subscript())
            .is_some_and(MergeInputs::is_ready);
        merge_root_ready && inner.final_root_parity_input.is_some()
    }

    /// Returns `true` to exactly one caller once all root rollup inputs are
    /// available.
    pub(crate) fn try_claim_root_rollup(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.root_rollup_claimed || !Self::root_inputs_ready(&inner) {
            return false;
        }
        inner.root_rollup_claimed = true;
        true
    }

    pub(crate) fn set_root_rollup_result(
        &self,
        outputs: RootRollupPublicInputs,
        proof: Proof,
    ) -> OrchestratorResult<()> {
        let mut inner = self.inner.lock();
        if inner.root_rollup_public_inputs.is_some() {
            return Err(OrchestratorError::InvalidState(
                "root rollup already proven".to_owned(),
            ));
        }
        inner.root_rollup_public_inputs = Some(outputs);
        inner.final_proof = Some(proof);
        Ok(())
    }

    pub(crate) fn root_rollup_result(&self) -> Option<(RootRollupPublicInputs, Proof)> {
        let inner = self.inner.lock();
        match (&inner.root_rollup_public_inputs, &inner.final_proof) {
            (Some(outputs), Some(proof)) => Some((outputs.clone(), proof.clone())),
            _ => None,
        }
    }

    pub(crate) fn has_block(&self) -> bool {
        self.inner.lock().block.is_some()
    }

    pub(crate) fn set_block(&self, block: L2Block) -> OrchestratorResult<()> {
        let mut inner = self.inner.lock();
        if inner.block.is_some() {
            return Err(OrchestratorError::InvalidState(
                "block already finalised".to_owned(),
            ));
        }
        inner.block = Some(block);
        Ok(())
    }

    /// Whether work on this block should continue.
    pub(crate) fn verify_state(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Invalidates the state and fails its ticket with [`OrchestratorError::Cancelled`].
    pub(crate) fn cancel(&self) {
        if self.token.cancel() {
            debug!(block_number = self.global_variables.block_number, "cancelled proving state");
        }
        self.settle(Err(OrchestratorError::Cancelled));
    }

    pub(crate) fn resolve(&self) {
        if !self.settle(Ok(())) {
            debug!("proving state already settled, ignoring resolve");
        }
    }

    /// Fails the ticket and invalidates the state so no further job touches
    /// the block.
    pub(crate) fn reject(&self, err: OrchestratorError) {
        self.token.cancel();
        if !self.settle(Err(err)) {
            debug!("proving state already settled, ignoring rejection");
        }
    }

    fn settle(&self, outcome: ProvingOutcome) -> bool {
        match self.outcome.lock().take() {
            Some(tx) => {
                // Receiver may be gone if nobody is waiting on the ticket.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}
