//! Synthetic txs and messages for dev blocks.

use rollup_primitives::{
    block::GlobalVariables,
    buf::Buf32,
    hash,
    tx::{ProcessedTx, PublicDataWrite, PublicKernelPhase, PublicKernelRequest},
};

const DEV_CHAIN_ID: u64 = 31337;
const DEV_GENESIS_TIMESTAMP: u64 = 1_700_000_000;
const DEV_BLOCK_TIME: u64 = 12;

fn dev_hash(parts: &[u64]) -> Buf32 {
    let buf: Vec<u8> = parts.iter().flat_map(|p| p.to_be_bytes()).collect();
    hash::raw(&buf)
}

pub(crate) fn dev_global_variables(block_number: u64) -> GlobalVariables {
    GlobalVariables {
        chain_id: DEV_CHAIN_ID,
        version: 1,
        block_number,
        timestamp: DEV_GENESIS_TIMESTAMP + block_number * DEV_BLOCK_TIME,
    }
}

pub(crate) fn dev_messages(block_number: u64, count: usize) -> Vec<Buf32> {
    (0..count as u64)
        .map(|i| dev_hash(&[0, block_number, i]))
        .collect()
}

/// A tx spending one nullifier, creating two notes and writing one public
/// slot, with `public_calls` public kernel requests.
pub(crate) fn dev_tx(block_number: u64, index: u64, public_calls: usize) -> ProcessedTx {
    let hash = dev_hash(&[1, block_number, index]);
    let public_kernel_requests = (0..public_calls)
        .map(|i| PublicKernelRequest {
            phase: if i + 1 == public_calls {
                PublicKernelPhase::Tail
            } else {
                PublicKernelPhase::AppLogic
            },
            tx_hash: hash,
            call_data: (i as u64).to_be_bytes().to_vec(),
        })
        .collect();

    ProcessedTx {
        hash,
        note_hashes: vec![
            dev_hash(&[2, block_number, index]),
            dev_hash(&[3, block_number, index]),
        ],
        nullifiers: vec![dev_hash(&[4, block_number, index])],
        public_data_writes: vec![PublicDataWrite::new(
            dev_hash(&[5, index]),
            dev_hash(&[6, block_number, index]),
        )],
        public_kernel_requests,
        is_empty: false,
    }
}
