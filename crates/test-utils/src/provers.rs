//! Prover wrappers that let tests count, hold back and corrupt circuit runs.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use rollup_circuit_prover::{CircuitName, CircuitProver};
use rollup_primitives::{circuits::*, params::MAX_NOTE_HASHES_PER_TX, tx::PublicKernelRequest};
use tokio::sync::watch;

/// Position of a base rollup's tx within the note hash tree.
pub fn base_rollup_leaf(inputs: &BaseRollupInputs) -> u64 {
    inputs.start.note_hash_tree.next_available_leaf_index / MAX_NOTE_HASHES_PER_TX as u64
}

/// Holds callers back until opened.
#[derive(Debug)]
struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    fn closed() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    fn open(&self) {
        self.tx.send_replace(true);
    }

    async fn pass(&self) {
        let mut rx = self.tx.subscribe();
        // Sender lives as long as the gate, so this only returns once open.
        let _ = rx.wait_for(|open| *open).await;
    }
}

#[derive(Debug, Default)]
struct Stats {
    started: HashMap<CircuitName, usize>,
    completed: HashMap<CircuitName, usize>,
    /// Completed runs, in order, with the leaf for base rollups.
    log: Vec<(CircuitName, Option<u64>)>,
}

/// Wraps a prover, counting circuit runs and optionally gating some of them.
#[derive(Debug)]
pub struct InstrumentedProver<P> {
    inner: P,
    stats: Mutex<Stats>,
    base_rollup_gate: Option<(u64, Gate)>,
    root_parity_gate: Option<Gate>,
}

impl<P: CircuitProver> InstrumentedProver<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            stats: Mutex::new(Stats::default()),
            base_rollup_gate: None,
            root_parity_gate: None,
        }
    }

    /// Holds back base rollups for leaves from `first_leaf` on until
    /// [`Self::release_base_rollups`].
    pub fn with_base_rollup_gate(mut self, first_leaf: u64) -> Self {
        self.base_rollup_gate = Some((first_leaf, Gate::closed()));
        self
    }

    /// Holds back the root parity circuit until [`Self::release_root_parity`].
    pub fn with_root_parity_gate(mut self) -> Self {
        self.root_parity_gate = Some(Gate::closed());
        self
    }

    pub fn release_base_rollups(&self) {
        if let Some((_, gate)) = &self.base_rollup_gate {
            gate.open();
        }
    }

    pub fn release_root_parity(&self) {
        if let Some(gate) = &self.root_parity_gate {
            gate.open();
        }
    }

    pub fn started(&self, circuit: CircuitName) -> usize {
        self.stats.lock().started.get(&circuit).copied().unwrap_or(0)
    }

    pub fn completed(&self, circuit: CircuitName) -> usize {
        self.stats.lock().completed.get(&circuit).copied().unwrap_or(0)
    }

    pub fn total_started(&self) -> usize {
        self.stats.lock().started.values().sum()
    }

    /// Completed circuit runs in the order they finished.
    pub fn completion_log(&self) -> Vec<(CircuitName, Option<u64>)> {
        self.stats.lock().log.clone()
    }

    fn on_start(&self, circuit: CircuitName) {
        *self.stats.lock().started.entry(circuit).or_default() += 1;
    }

    fn on_complete<T>(&self, circuit: CircuitName, leaf: Option<u64>, res: &anyhow::Result<T>) {
        if res.is_ok() {
            let mut stats = self.stats.lock();
            *stats.completed.entry(circuit).or_default() += 1;
            stats.log.push((circuit, leaf));
        }
    }
}

#[async_trait]
impl<P: CircuitProver> CircuitProver for InstrumentedProver<P> {
    async fn get_base_parity_proof(
        &self,
        inputs: &BaseParityInputs,
    ) -> anyhow::Result<(ParityPublicInputs, Proof)> {
        self.on_start(CircuitName::BaseParity);
        let res = self.inner.get_base_parity_proof(inputs).await;
        self.on_complete(CircuitName::BaseParity, None, &res);
        res
    }

    async fn get_root_parity_proof(
        &self,
        inputs: &RootParityInputs,
    ) -> anyhow::Result<(ParityPublicInputs, Proof)> {
        self.on_start(CircuitName::RootParity);
        if let Some(gate) = &self.root_parity_gate {
            gate.pass().await;
        }
        let res = self.inner.get_root_parity_proof(inputs).await;
        self.on_complete(CircuitName::RootParity, None, &res);
        res
    }

    async fn get_public_kernel_proof(
        &self,
        request: &PublicKernelRequest,
    ) -> anyhow::Result<(PublicKernelPublicInputs, Proof)> {
        self.on_start(CircuitName::PublicKernel);
        let res = self.inner.get_public_kernel_proof(request).await;
        self.on_complete(CircuitName::PublicKernel, None, &res);
        res
    }

    async fn get_base_rollup_proof(
        &self,
        inputs: &BaseRollupInputs,
    ) -> anyhow::Result<(BaseOrMergeRollupPublicInputs, Proof)> {
        self.on_start(CircuitName::BaseRollup);
        let leaf = base_rollup_leaf(inputs);
        if let Some((first_leaf, gate)) = &self.base_rollup_gate {
            if leaf >= *first_leaf {
                gate.pass().await;
            }
        }
        let res = self.inner.get_base_rollup_proof(inputs).await;
        self.on_complete(CircuitName::BaseRollup, Some(leaf), &res);
        res
    }

    async fn get_merge_rollup_proof(
        &self,
        inputs: &MergeRollupInputs,
    ) -> anyhow::Result<(BaseOrMergeRollupPublicInputs, Proof)> {
        self.on_start(CircuitName::MergeRollup);
        let res = self.inner.get_merge_rollup_proof(inputs).await;
        self.on_complete(CircuitName::MergeRollup, None, &res);
        res
    }

    async fn get_root_rollup_proof(
        &self,
        inputs: &RootRollupInputs,
    ) -> anyhow::Result<(RootRollupPublicInputs, Proof)> {
        self.on_start(CircuitName::RootRollup);
        let res = self.inner.get_root_rollup_proof(inputs).await;
        self.on_complete(CircuitName::RootRollup, None, &res);
        res
    }
}

/// Wraps a prover and corrupts the end state claimed by one base rollup.
#[derive(Debug)]
pub struct TamperingProver<P> {
    inner: P,
    leaf: u64,
}

impl<P: CircuitProver> TamperingProver<P> {
    pub fn new(inner: P, leaf: u64) -> Self {
        Self { inner, leaf }
    }
}

#[async_trait]
impl<P: CircuitProver> CircuitProver for TamperingProver<P> {
    async fn get_base_parity_proof(
        &self,
        inputs: &BaseParityInputs,
    ) -> anyhow::Result<(ParityPublicInputs, Proof)> {
        self.inner.get_base_parity_proof(inputs).await
    }

    async fn get_root_parity_proof(
        &self,
        inputs: &RootParityInputs,
    ) -> anyhow::Result<(ParityPublicInputs, Proof)> {
        self.inner.get_root_parity_proof(inputs).await
    }

    async fn get_public_kernel_proof(
        &self,
        request: &PublicKernelRequest,
    ) -> anyhow::Result<(PublicKernelPublicInputs, Proof)> {
        self.inner.get_public_kernel_proof(request).await
    }

    async fn get_base_rollup_proof(
        &self,
        inputs: &BaseRollupInputs,
    ) -> anyhow::Result<(BaseOrMergeRollupPublicInputs, Proof)> {
        let (mut outputs, proof) = self.inner.get_base_rollup_proof(inputs).await?;
        if base_rollup_leaf(inputs) == self.leaf {
            outputs.end.nullifier_tree.next_available_leaf_index += 1;
        }
        Ok((outputs, proof))
    }

    async fn get_merge_rollup_proof(
        &self,
        inputs: &MergeRollupInputs,
    ) -> anyhow::Result<(BaseOrMergeRollupPublicInputs, Proof)> {
        self.inner.get_merge_rollup_proof(inputs).await
    }

    async fn get_root_rollup_proof(
        &self,
        inputs: &RootRollupInputs,
    ) -> anyhow::Result<(RootRollupPublicInputs, Proof)> {
        self.inner.get_root_rollup_proof(inputs).await
    }
}
