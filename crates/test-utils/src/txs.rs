//! Deterministic txs and block inputs for tests.

use rollup_primitives::{
    block::GlobalVariables,
    buf::Buf32,
    hash,
    tx::{ProcessedTx, PublicDataWrite, PublicKernelPhase, PublicKernelRequest},
};

use crate::ArbitraryGenerator;

fn derive(seed: u64, tag: &[u8], i: u64) -> Buf32 {
    let mut buf = Vec::with_capacity(tag.len() + 16);
    buf.extend_from_slice(tag);
    buf.extend_from_slice(&seed.to_be_bytes());
    buf.extend_from_slice(&i.to_be_bytes());
    hash::raw(&buf)
}

/// A tx with a couple of note hashes, one nullifier and one public data
/// write, all derived from `seed`.
pub fn make_processed_tx(seed: u64) -> ProcessedTx {
    ProcessedTx {
        hash: derive(seed, b"tx", 0),
        note_hashes: (0..2).map(|i| derive(seed, b"note", i)).collect(),
        nullifiers: vec![derive(seed, b"nullifier", 0)],
        public_data_writes: vec![PublicDataWrite::new(
            derive(seed, b"slot", 0),
            derive(seed, b"value", 0),
        )],
        public_kernel_requests: Vec::new(),
        is_empty: false,
    }
}

/// Like [`make_processed_tx`] with `num_calls` public kernel requests.
pub fn make_processed_tx_with_public_calls(seed: u64, num_calls: usize) -> ProcessedTx {
    let mut tx = make_processed_tx(seed);
    let phases = [
        PublicKernelPhase::Setup,
        PublicKernelPhase::AppLogic,
        PublicKernelPhase::Teardown,
    ];
    tx.public_kernel_requests = (0..num_calls)
        .map(|i| PublicKernelRequest {
            phase: if i + 1 == num_calls {
                PublicKernelPhase::Tail
            } else {
                phases[i % phases.len()]
            },
            tx_hash: tx.hash,
            call_data: (i as u32).to_be_bytes().to_vec(),
        })
        .collect();
    tx
}

pub fn make_global_variables(block_number: u64) -> GlobalVariables {
    GlobalVariables {
        chain_id: 1,
        version: 1,
        block_number,
        timestamp: 1_700_000_000 + block_number * 12,
    }
}

/// `n` random non-zero messages.
pub fn make_l1_to_l2_messages(n: usize) -> Vec<Buf32> {
    let gen = ArbitraryGenerator::new();
    (0..n)
        .map(|_| {
            let msg: Buf32 = gen.generate();
            if msg.is_zero() {
                Buf32::from_u64(1)
            } else {
                msg
            }
        })
        .collect()
}
