//! Prover client.
//!
//! Runs the proving orchestrator over a series of synthetic blocks, using the
//! native prover and in-memory trees.

use std::{sync::Arc, time::Instant};

use anyhow::ensure;
use args::Args;
use config::{get_config, Config};
use errors::InitError;
use rollup_common::logging;
use rollup_db::stubs::StubTreeStore;
use rollup_native_prover::NativeCircuitProver;
use rollup_primitives::tx::ProcessedTx;
use rollup_prover_orchestrator::ProvingOrchestrator;
use tracing::*;

mod args;
mod config;
mod dev_txs;
mod errors;

type DevOrchestrator = ProvingOrchestrator<NativeCircuitProver, StubTreeStore>;

fn main() {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args) {
        eprintln!("FATAL ERROR: {e}");
        std::process::exit(1);
    }
}

fn main_inner(args: Args) -> anyhow::Result<()> {
    let config = get_config(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("rollup-prover-rt")
        .build()?;

    runtime.block_on(run(args, config))
}

async fn run(args: Args, config: Config) -> anyhow::Result<()> {
    init_logging(&config)?;

    let prover = Arc::new(NativeCircuitProver::new());
    let db = Arc::new(StubTreeStore::new());
    let orchestrator = ProvingOrchestrator::new(prover, db, config.orchestrator);
    orchestrator.start()?;

    let res = prove_dev_blocks(&orchestrator, &args).await;
    if let Err(e) = &res {
        error!(%e, "failed to prove dev blocks");
    }

    orchestrator.stop().await;
    logging::finalize();
    res
}

fn init_logging(config: &Config) -> Result<(), InitError> {
    let mut lconfig = logging::LoggerConfig::with_base_name("rollup-prover-client");

    // The envvar takes precedence over the config file.
    let otlp_url = logging::get_otlp_url_from_env().or_else(|| config.logging.otlp_url.clone());
    if let Some(url) = &otlp_url {
        lconfig.set_otlp_url(url.clone());
    }

    logging::init(lconfig)?;

    if let Some(url) = &otlp_url {
        info!(%url, "using OpenTelemetry tracing output");
    }
    Ok(())
}

async fn prove_dev_blocks(orchestrator: &DevOrchestrator, args: &Args) -> anyhow::Result<()> {
    ensure!(
        args.txs <= args.num_txs,
        "more txs ({}) than tx slots ({})",
        args.txs,
        args.num_txs
    );

    for block_number in 1..=args.blocks {
        let started = Instant::now();
        let ticket = orchestrator
            .start_new_block(
                args.num_txs,
                dev_txs::dev_global_variables(block_number),
                dev_txs::dev_messages(block_number, args.l1_to_l2_messages),
                ProcessedTx::empty(),
            )
            .await?;

        for index in 0..args.txs as u64 {
            let tx = dev_txs::dev_tx(block_number, index, args.public_calls);
            orchestrator.add_new_tx(tx).await?;
        }
        orchestrator.set_block_completed().await?;

        ticket.await?;
        let result = orchestrator.finalise_block().await?;

        info!(
            block_number = result.block.number(),
            block_hash = %result.block.header().hash(),
            archive_root = %result.block.archive().root,
            num_tx_effects = result.block.body().tx_effects().len(),
            proof_len = result.proof.as_bytes().len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "proved dev block"
        );
    }

    Ok(())
}
