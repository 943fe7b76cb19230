//! Drives the proving of a block through the tree of rollup circuits.
//!
//! Txs are fed in one at a time.  Each one has its base rollup inputs built
//! right away, against the tree store, and then gets a chain of public kernel
//! jobs ending in a base rollup job.  Base rollups are merged pairwise up the
//! merge tree while the block's L1 to L2 messages go through the parity
//! circuits alongside.  The root rollup runs once both the merge tree root and
//! the root parity are done, and resolves the block's ticket.

use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use borsh::BorshSerialize;
use futures_util::FutureExt;
use parking_lot::Mutex;
use rollup_circuit_prover::CircuitProver;
use rollup_db::traits::TreeStore;
use rollup_primitives::{
    block::{Body, GlobalVariables, L2Block},
    buf::Buf32,
    circuits::*,
    params::*,
    tree::MerkleTreeId,
    tx::ProcessedTx,
};
use tokio::{
    sync::{mpsc, Mutex as AsyncMutex},
    task::JoinHandle,
};
use tracing::*;

use crate::{
    block_building::*,
    cancel::CancellationToken,
    config::OrchestratorConfig,
    errors::{OrchestratorError, OrchestratorResult},
    job::{JobPayload, ProvingJob, ProvingJobType},
    queue::{job_queue, process_job_queue, JobSender},
    state::{MergeInputs, PreparedTx, ProvingState, ProvingTicket},
    tree_addr::{num_merge_levels, TreePosition},
    validation::{StructuralTxValidator, TxValidationError, TxValidator},
};

/// A proven block along with the proof of its root rollup.
#[derive(Clone, Debug)]
pub struct BlockResult {
    pub block: L2Block,
    pub proof: Proof,
}

/// What the running jobs need, shared between the orchestrator and the job
/// queue loop.
struct JobContext<P, T> {
    prover: Arc<P>,
    db: Arc<T>,
    jobs: JobSender<ProvingJob>,
}

/// Orchestrates the proving of one block at a time.
///
/// Starting a new block cancels the one in progress.  Job outputs for a
/// cancelled block are dropped.
pub struct ProvingOrchestrator<P, T> {
    ctx: Arc<JobContext<P, T>>,
    config: OrchestratorConfig,
    validator: Arc<dyn TxValidator>,

    /// The block being proven.
    current: Mutex<Option<Arc<ProvingState>>>,

    /// Held by every operation that writes to the tree store, so their writes
    /// never interleave.
    admission: AsyncMutex<()>,

    pending_jobs: Mutex<Option<mpsc::UnboundedReceiver<ProvingJob>>>,
    stop_signal: CancellationToken,
    queue_task: Mutex<Option<JoinHandle<()>>>,
}

impl<P: CircuitProver, T: TreeStore> ProvingOrchestrator<P, T> {
    pub fn new(prover: Arc<P>, db: Arc<T>, config: OrchestratorConfig) -> Self {
        let (jobs, pending_jobs) = job_queue();
        Self {
            ctx: Arc::new(JobContext { prover, db, jobs }),
            config,
            validator: Arc::new(StructuralTxValidator),
            current: Mutex::new(None),
            admission: AsyncMutex::new(()),
            pending_jobs: Mutex::new(Some(pending_jobs)),
            stop_signal: CancellationToken::new(),
            queue_task: Mutex::new(None),
        }
    }

    /// Replaces the validator txs are checked with before admission.
    pub fn with_validator(mut self, validator: impl TxValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Starts consuming the job queue.  Jobs enqueued before this wait in the
    /// queue.
    pub fn start(&self) -> OrchestratorResult<()> {
        let pending_jobs = self
            .pending_jobs
            .lock()
            .take()
            .ok_or_else(|| OrchestratorError::InvalidState("job queue already started".to_owned()))?;

        let ctx = self.ctx.clone();
        let handler = move |job: ProvingJob| {
            let ctx = ctx.clone();
            async move { ctx.run_job(job).await }
        };

        let task = tokio::spawn(process_job_queue(
            pending_jobs,
            self.config.max_concurrent_jobs,
            handler,
            self.stop_signal.clone(),
        ));
        *self.queue_task.lock() = Some(task);

        info!(
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "started proving orchestrator"
        );
        Ok(())
    }

    /// Cancels the current block and stops the job queue, waiting for the
    /// jobs still running to return.
    pub async fn stop(&self) {
        info!("stopping proving orchestrator");
        self.cancel_block();
        self.stop_signal.cancel();

        let task = self.queue_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(%e, "job queue task failed");
            }
        }
    }

    /// Starts proving a new block of `num_txs` txs, cancelling the block in
    /// progress if there is one.
    ///
    /// The messages are inserted into the message tree right away.  Slots not
    /// filled by [`Self::add_new_tx`] are filled with `empty_tx` by
    /// [`Self::set_block_completed`].
    pub async fn start_new_block(
        &self,
        num_txs: usize,
        global_variables: GlobalVariables,
        l1_to_l2_messages: Vec<Buf32>,
        empty_tx: ProcessedTx,
    ) -> OrchestratorResult<ProvingTicket> {
        if num_txs < 2 || !num_txs.is_power_of_two() {
            return Err(OrchestratorError::InvalidArgument(format!(
                "length of txs for the block should be a power of two and at least two (got {num_txs})"
            )));
        }
        if !empty_tx.is_empty {
            return Err(OrchestratorError::InvalidArgument(
                "padding tx must be empty".to_owned(),
            ));
        }
        let new_l1_to_l2_messages = pad_l1_to_l2_messages(&l1_to_l2_messages)?;

        let _admission = self.admission.lock().await;

        // Only one block at a time.
        self.cancel_block();

        info!(
            num_txs,
            block_number = global_variables.block_number,
            num_messages = l1_to_l2_messages.len(),
            "starting new block"
        );

        let db = &*self.ctx.db;
        let message_tree_snapshot = db.get_snapshot(MerkleTreeId::L1ToL2Message).await?;
        let message_tree_root_sibling_path = fixed_length_path(
            db.get_subtree_sibling_path(MerkleTreeId::L1ToL2Message, L1_TO_L2_MSG_SUBTREE_HEIGHT)
                .await?,
            L1_TO_L2_MSG_SUBTREE_SIBLING_PATH_LENGTH,
        );
        db.append_leaves(MerkleTreeId::L1ToL2Message, &new_l1_to_l2_messages)
            .await?;

        let (state, ticket) = ProvingState::new(
            num_txs,
            global_variables,
            empty_tx,
            new_l1_to_l2_messages,
            message_tree_snapshot,
            message_tree_root_sibling_path,
        );
        let state = Arc::new(state);

        let prev = self.current.lock().replace(state.clone());
        if let Some(prev) = prev {
            prev.cancel();
        }

        for index in 0..NUM_BASE_PARITY_PER_ROOT_PARITY {
            let inputs = BaseParityInputs::from_slice(&new_l1_to_l2_messages, index);
            self.ctx
                .enqueue(&state, JobPayload::BaseParity { index, inputs });
        }

        debug!(
            merge_levels = num_merge_levels(num_txs),
            "enqueued base parity jobs"
        );
        Ok(ticket)
    }

    /// Admits the next tx of the current block.
    ///
    /// Its side effects are applied to the tree store before this returns.
    pub async fn add_new_tx(&self, tx: ProcessedTx) -> OrchestratorResult<()> {
        let _admission = self.admission.lock().await;
        let state = self.active_state("adding transactions")?;

        if !state.is_accepting_transactions() {
            return Err(OrchestratorError::InvalidState(
                "rollup not accepting further transactions".to_owned(),
            ));
        }

        // Padding only comes from `set_block_completed`, at the tail of the block.
        if tx.is_empty {
            return Err(TxValidationError::PaddingTx.into());
        }
        self.validator.validate_tx(&tx)?;

        let tx_index = state.add_new_tx(tx.clone())?;
        info!(tx_hash = %tx.hash, tx_index, "received transaction");

        self.prepare_base_rollup_inputs(&state, tx_index, &tx).await?;
        self.ctx.enqueue(
            &state,
            JobPayload::PublicKernel {
                tx_index,
                function_index: 0,
            },
        );
        Ok(())
    }

    /// Marks the current block as complete, padding the remaining slots with
    /// the block's empty tx.
    pub async fn set_block_completed(&self) -> OrchestratorResult<()> {
        let _admission = self.admission.lock().await;
        let state = self.active_state("completing a block")?;

        let remaining = state.total_num_txs() - state.transactions_received();
        if remaining > 0 {
            info!(remaining, "padding rollup with empty transactions");
        }

        for _ in 0..remaining {
            let tx = state.empty_tx().clone();
            let tx_index = state.add_new_tx(tx.clone())?;
            self.prepare_base_rollup_inputs(&state, tx_index, &tx).await?;
            // Padding txs have no public calls.
            self.ctx.enqueue(&state, JobPayload::BaseRollup { tx_index });
        }

        Ok(())
    }

    /// Cancels the block in progress, if any.  Its ticket fails with
    /// [`OrchestratorError::Cancelled`] and its pending jobs become no-ops.
    pub fn cancel_block(&self) {
        let state = self.current.lock().clone();
        if let Some(state) = state {
            state.cancel();
        }
    }

    /// Assembles the proven block once its ticket has resolved, appending its
    /// header to the archive.
    ///
    /// Any failure invalidates the block, so it cannot be finalised again.
    pub async fn finalise_block(&self) -> OrchestratorResult<BlockResult> {
        let _admission = self.admission.lock().await;
        let state = self
            .current
            .lock()
            .clone()
            .ok_or_else(|| OrchestratorError::InvalidState("no block being proven".to_owned()))?;

        let (outputs, proof) = state.root_rollup_result().ok_or_else(|| {
            OrchestratorError::InvalidState(
                "invalid proving state, a block must be proven before it can be finalised"
                    .to_owned(),
            )
        })?;
        if state.has_block() {
            return Err(OrchestratorError::InvalidState(
                "block already finalised".to_owned(),
            ));
        }
        if !state.verify_state() {
            return Err(OrchestratorError::InvalidState(
                "block was invalidated and cannot be finalised".to_owned(),
            ));
        }

        let block = match self.assemble_block(&state, outputs).await {
            Ok(block) => block,
            Err(e) => {
                warn!(%e, "failed to finalise block");
                state.reject(OrchestratorError::Aborted(format!("finalise failed: {e}")));
                return Err(e);
            }
        };

        info!(
            block_number = block.number(),
            num_tx_effects = block.body().tx_effects().len(),
            "successfully proven block"
        );
        state.set_block(block.clone())?;

        Ok(BlockResult { block, proof })
    }

    async fn assemble_block(
        &self,
        state: &ProvingState,
        outputs: RootRollupPublicInputs,
    ) -> OrchestratorResult<L2Block> {
        let tx_effects = state
            .all_txs()
            .iter()
            .map(ProcessedTx::to_tx_effect)
            .filter(|effect| !effect.is_empty())
            .collect();
        let body = Body::new(tx_effects);

        let header = outputs.header;
        let commitment = &header.content_commitment;
        let txs_effects_hash = body.txs_effects_hash(commitment.tx_tree_height);
        if txs_effects_hash != commitment.txs_effects_hash {
            return Err(OrchestratorError::Consistency(format!(
                "txs effects hash mismatch, {txs_effects_hash:?} != {:?}",
                commitment.txs_effects_hash
            )));
        }

        debug!("updating and validating root trees");
        let db = &*self.ctx.db;
        validate_root_trees(&outputs, db).await?;
        db.update_archive(&header).await?;
        validate_root_archive(&outputs, db).await?;

        Ok(L2Block::new(outputs.archive, header, body))
    }

    fn active_state(&self, action: &str) -> OrchestratorResult<Arc<ProvingState>> {
        let state = self.current.lock().clone().ok_or_else(|| {
            OrchestratorError::InvalidState(format!(
                "invalid proving state, call start_new_block before {action}"
            ))
        })?;

        if !state.verify_state() {
            return Err(OrchestratorError::InvalidState(format!(
                "current block is no longer being proven, cannot proceed with {action}"
            )));
        }
        Ok(state)
    }

    /// Builds and stores the base rollup inputs for a tx.  A failure here
    /// leaves the tree store in an unknown state, so it also fails the block.
    async fn prepare_base_rollup_inputs(
        &self,
        state: &Arc<ProvingState>,
        tx_index: usize,
        tx: &ProcessedTx,
    ) -> OrchestratorResult<()> {
        let db = &*self.ctx.db;
        let res = async {
            let inputs = build_base_rollup_input(tx, state.global_variables(), db).await?;
            let snapshots = get_partial_state(db).await?;
            Ok::<_, OrchestratorError>(PreparedTx { inputs, snapshots })
        }
        .await;

        let prepared = match res {
            Ok(prepared) => prepared,
            Err(e) => {
                state.reject(OrchestratorError::Aborted(format!(
                    "failed to prepare base rollup inputs for tx {tx_index}: {e}"
                )));
                return Err(e);
            }
        };

        if !state.verify_state() {
            debug!(tx_index, "discarding prepared base rollup inputs, state no longer valid");
            return Ok(());
        }

        state.store_prepared_tx(tx_index, prepared)
    }
}

impl<P, T> Drop for ProvingOrchestrator<P, T> {
    fn drop(&mut self) {
        self.stop_signal.cancel();
    }
}

impl<P: CircuitProver, T: TreeStore> JobContext<P, T> {
    fn enqueue(&self, state: &Arc<ProvingState>, payload: JobPayload) {
        if !state.verify_state() {
            debug!(job = ?payload, "not enqueueing job, proving state invalid");
            return;
        }

        let job = ProvingJob::new(state.clone(), payload);
        trace!(?job, "enqueueing job");
        if let Err(job) = self.jobs.put(job) {
            warn!(?job, "job queue closed, failing block");
            job.state.reject(OrchestratorError::InvalidState(
                "job queue is closed".to_owned(),
            ));
        }
    }

    /// Runs a job, turning any error or panic into a rejection of its block.
    #[instrument(skip_all, fields(job = ?job))]
    async fn run_job(&self, job: ProvingJob) {
        let job_type = job.job_type();
        let state = job.state.clone();

        let res = AssertUnwindSafe(self.execute(job)).catch_unwind().await;
        let err = match res {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(panic) => OrchestratorError::JobPanicked {
                job: job_type,
                reason: panic_reason(panic),
            },
        };

        if state.verify_state() {
            error!(job = %job_type, %err, "error thrown when proving job");
        } else {
            debug!(job = %job_type, %err, "job for invalid proving state failed");
        }
        state.reject(err);
    }

    async fn execute(&self, job: ProvingJob) -> OrchestratorResult<()> {
        let ProvingJob { state, payload } = job;
        match payload {
            JobPayload::BaseParity { index, inputs } => {
                self.run_base_parity(&state, index, inputs).await
            }
            JobPayload::RootParity { inputs } => self.run_root_parity(&state, *inputs).await,
            JobPayload::PublicKernel {
                tx_index,
                function_index,
            } => self.run_public_kernel(&state, tx_index, function_index).await,
            JobPayload::BaseRollup { tx_index } => self.run_base_rollup(&state, tx_index).await,
            JobPayload::MergeRollup { position, inputs } => {
                self.run_merge_rollup(&state, position, *inputs).await
            }
            JobPayload::RootRollup => self.run_root_rollup(&state).await,
        }
    }

    async fn run_base_parity(
        &self,
        state: &Arc<ProvingState>,
        index: usize,
        inputs: BaseParityInputs,
    ) -> OrchestratorResult<()> {
        if !still_valid(state, ProvingJobType::BaseParity) {
            return Ok(());
        }

        let started = Instant::now();
        let (public_inputs, proof) = self
            .prover
            .get_base_parity_proof(&inputs)
            .await
            .map_err(OrchestratorError::prover(ProvingJobType::BaseParity))?;
        log_circuit_stats(ProvingJobType::BaseParity, started.elapsed(), &inputs, &public_inputs);

        if !still_valid(state, ProvingJobType::BaseParity) {
            return Ok(());
        }

        let input = RootParityInput {
            proof,
            public_inputs,
        };
        if let Some(inputs) = state.set_root_parity_input(index, input)? {
            debug!("all base parity proofs done");
            self.enqueue(
                state,
                JobPayload::RootParity {
                    inputs: Box::new(inputs),
                },
            );
        }
        Ok(())
    }

    async fn run_root_parity(
        &self,
        state: &Arc<ProvingState>,
        inputs: RootParityInputs,
    ) -> OrchestratorResult<()> {
        if !still_valid(state, ProvingJobType::RootParity) {
            return Ok(());
        }

        let started = Instant::now();
        let (public_inputs, proof) = self
            .prover
            .get_root_parity_proof(&inputs)
            .await
            .map_err(OrchestratorError::prover(ProvingJobType::RootParity))?;
        log_circuit_stats(ProvingJobType::RootParity, started.elapsed(), &inputs, &public_inputs);

        if !still_valid(state, ProvingJobType::RootParity) {
            return Ok(());
        }

        state.set_final_root_parity_input(RootParityInput {
            proof,
            public_inputs,
        })?;
        self.maybe_enqueue_root_rollup(state);
        Ok(())
    }

    async fn run_public_kernel(
        &self,
        state: &Arc<ProvingState>,
        tx_index: usize,
        function_index: usize,
    ) -> OrchestratorResult<()> {
        if !still_valid(state, ProvingJobType::PublicKernel) {
            return Ok(());
        }

        let (tx_hash, request) = state.public_kernel_request(tx_index, function_index)?;
        let Some(request) = request else {
            // Public calls done, on to the base rollup.
            self.enqueue(state, JobPayload::BaseRollup { tx_index });
            return Ok(());
        };

        let started = Instant::now();
        let (outputs, _proof) = self
            .prover
            .get_public_kernel_proof(&request)
            .await
            .map_err(OrchestratorError::prover(ProvingJobType::PublicKernel))?;
        log_circuit_stats(ProvingJobType::PublicKernel, started.elapsed(), &request, &outputs);

        if !still_valid(state, ProvingJobType::PublicKernel) {
            return Ok(());
        }

        if outputs.tx_hash != tx_hash {
            return Err(OrchestratorError::Consistency(format!(
                "public kernel {function_index} of tx {tx_index} committed to tx {:?}, expected {tx_hash:?}",
                outputs.tx_hash
            )));
        }

        self.enqueue(
            state,
            JobPayload::PublicKernel {
                tx_index,
                function_index: function_index + 1,
            },
        );
        Ok(())
    }

    async fn run_base_rollup(
        &self,
        state: &Arc<ProvingState>,
        tx_index: usize,
    ) -> OrchestratorResult<()> {
        if !still_valid(state, ProvingJobType::BaseRollup) {
            return Ok(());
        }

        let PreparedTx { inputs, snapshots } = state.take_base_rollup_inputs(tx_index)?;

        let started = Instant::now();
        let (public_inputs, proof) = self
            .prover
            .get_base_rollup_proof(&inputs)
            .await
            .map_err(OrchestratorError::prover(ProvingJobType::BaseRollup))?;
        log_circuit_stats(ProvingJobType::BaseRollup, started.elapsed(), &inputs, &public_inputs);

        validate_partial_state(&public_inputs.end, &snapshots)?;

        if !still_valid(state, ProvingJobType::BaseRollup) {
            return Ok(());
        }

        debug!(tx_index, "completed base rollup");
        let position = TreePosition::base(state.total_num_txs(), tx_index);
        self.store_and_advance(
            state,
            position,
            PreviousRollupData {
                public_inputs,
                proof,
            },
        )
    }

    async fn run_merge_rollup(
        &self,
        state: &Arc<ProvingState>,
        position: TreePosition,
        inputs: MergeInputs,
    ) -> OrchestratorResult<()> {
        if !still_valid(state, ProvingJobType::MergeRollup) {
            return Ok(());
        }

        let previous_rollup_data = inputs.into_pair().ok_or_else(|| {
            OrchestratorError::InvalidState(format!(
                "merge inputs at level {} index {} incomplete",
                position.level(),
                position.index()
            ))
        })?;
        let inputs = MergeRollupInputs {
            previous_rollup_data,
        };

        let started = Instant::now();
        let (public_inputs, proof) = self
            .prover
            .get_merge_rollup_proof(&inputs)
            .await
            .map_err(OrchestratorError::prover(ProvingJobType::MergeRollup))?;
        log_circuit_stats(ProvingJobType::MergeRollup, started.elapsed(), &inputs, &public_inputs);

        if !still_valid(state, ProvingJobType::MergeRollup) {
            return Ok(());
        }

        debug!(
            level = position.level(),
            index = position.index(),
            "completed merge rollup"
        );
        self.store_and_advance(
            state,
            position,
            PreviousRollupData {
                public_inputs,
                proof,
            },
        )
    }

    async fn run_root_rollup(&self, state: &Arc<ProvingState>) -> OrchestratorResult<()> {
        if !still_valid(state, ProvingJobType::RootRollup) {
            return Ok(());
        }

        let previous_rollup_data = state.merge_root_inputs().ok_or_else(|| {
            OrchestratorError::InvalidState("merge tree root inputs incomplete".to_owned())
        })?;
        let l1_to_l2_roots = state.final_root_parity_input().ok_or_else(|| {
            OrchestratorError::InvalidState("root parity input missing".to_owned())
        })?;

        let inputs = build_root_rollup_input(
            previous_rollup_data,
            l1_to_l2_roots,
            *state.new_l1_to_l2_messages(),
            *state.message_tree_snapshot(),
            state.message_tree_root_sibling_path().to_vec(),
            &*self.db,
        )
        .await?;

        if !still_valid(state, ProvingJobType::RootRollup) {
            return Ok(());
        }

        let started = Instant::now();
        let (public_inputs, proof) = self
            .prover
            .get_root_rollup_proof(&inputs)
            .await
            .map_err(OrchestratorError::prover(ProvingJobType::RootRollup))?;
        log_circuit_stats(ProvingJobType::RootRollup, started.elapsed(), &inputs, &public_inputs);

        if !still_valid(state, ProvingJobType::RootRollup) {
            return Ok(());
        }

        info!(
            block_number = state.global_variables().block_number,
            "completed root rollup"
        );
        state.set_root_rollup_result(public_inputs, proof)?;
        state.resolve();
        Ok(())
    }

    /// Stores a base or merge rollup output into its parent and enqueues
    /// whatever that completes.
    fn store_and_advance(
        &self,
        state: &Arc<ProvingState>,
        position: TreePosition,
        data: PreviousRollupData,
    ) -> OrchestratorResult<()> {
        let (parent, slot) = position.parent().ok_or_else(|| {
            OrchestratorError::InvalidState("merge tree root has no parent".to_owned())
        })?;

        let Some(inputs) = state.store_merge_inputs(parent, slot, data)? else {
            return Ok(());
        };

        if parent.is_root() {
            self.maybe_enqueue_root_rollup(state);
        } else {
            self.enqueue(
                state,
                JobPayload::MergeRollup {
                    position: parent,
                    inputs: Box::new(inputs),
                },
            );
        }
        Ok(())
    }

    fn maybe_enqueue_root_rollup(&self, state: &Arc<ProvingState>) {
        if state.try_claim_root_rollup() {
            debug!("root rollup inputs ready");
            self.enqueue(state, JobPayload::RootRollup);
        } else {
            debug!(
                parity_ready = state.are_root_parity_inputs_ready(),
                ready = state.is_ready_for_root_rollup(),
                "not ready for root rollup"
            );
        }
    }
}

fn still_valid(state: &ProvingState, job: ProvingJobType) -> bool {
    let valid = state.verify_state();
    if !valid {
        debug!(%job, "proving state no longer valid, discarding job");
    }
    valid
}

fn log_circuit_stats<I: BorshSerialize, O: BorshSerialize>(
    circuit: ProvingJobType,
    duration: Duration,
    inputs: &I,
    outputs: &O,
) {
    if !enabled!(Level::DEBUG) {
        return;
    }

    let input_size = borsh::to_vec(inputs).map(|v| v.len()).unwrap_or_default();
    let output_size = borsh::to_vec(outputs).map(|v| v.len()).unwrap_or_default();
    debug!(
        event = "circuit-simulation",
        circuit_name = %circuit,
        duration_ms = saturating_millis(duration),
        input_size,
        output_size,
        "simulated circuit"
    );
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn panic_reason(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(s) => *s,
        Err(panic) => match panic.downcast::<&str>() {
            Ok(s) => s.to_string(),
            Err(_) => "unknown panic".to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_panic_reason() {
        assert_eq!(panic_reason(Box::new("boom")), "boom");
        assert_eq!(panic_reason(Box::new(String::from("bang"))), "bang");
    }
}
