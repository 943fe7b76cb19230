use std::path::PathBuf;

use argh::FromArgs;

pub(super) const DEFAULT_NUM_TXS: usize = 4;

/// Proves a series of dev blocks with the native prover against in-memory
/// trees.
#[derive(Debug, FromArgs)]
pub struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    pub config: Option<PathBuf>,

    #[argh(
        option,
        description = "tx slots per block, a power of two of at least two",
        default = "DEFAULT_NUM_TXS"
    )]
    pub num_txs: usize,

    #[argh(
        option,
        description = "real txs per block, the rest is padding",
        default = "2"
    )]
    pub txs: usize,

    #[argh(
        option,
        description = "public calls made by each real tx",
        default = "1"
    )]
    pub public_calls: usize,

    #[argh(
        option,
        description = "L1 to L2 messages consumed by each block",
        default = "4"
    )]
    pub l1_to_l2_messages: usize,

    #[argh(option, description = "number of blocks to prove", default = "1")]
    pub blocks: u64,

    #[argh(option, description = "maximum number of proving jobs run at once")]
    pub max_concurrent_jobs: Option<usize>,
}
