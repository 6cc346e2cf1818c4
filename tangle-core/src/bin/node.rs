//! Tangle Node Binary
//!
//! Reads newline-delimited JSON submissions on stdin and writes one JSON
//! reply per line to stdout.
//!
//! Pass `--mock-consensus` to attest payloads in-process instead of calling
//! the consensus application.

use anyhow::Context;
use std::sync::Arc;
use tangle_core::{
    spawn_persistence_actor, Config, ConsensusGate, Error, GrpcConsensusGate, IngestionPipeline,
    MockConsensusGate, Storage, Submission, SubmitReply, TransactionGraph,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries replies
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting tangle node");

    let config = if let Ok(config_path) = std::env::var("TANGLE_CONFIG") {
        info!("Loading config from: {}", config_path);
        Config::from_file(&config_path)?
    } else {
        info!("Loading config from environment variables");
        Config::from_env()?
    };

    let storage = Arc::new(Storage::open(&config).context("opening storage")?);
    let graph = Arc::new(TransactionGraph::from_config(&config.dag));
    graph.restore(storage.load_transactions()?);

    let store = spawn_persistence_actor(storage, &config.persistence);

    let gate: Arc<dyn ConsensusGate> = if std::env::args().any(|a| a == "--mock-consensus") {
        warn!("Using in-process mock consensus");
        Arc::new(MockConsensusGate::new())
    } else {
        Arc::new(GrpcConsensusGate::connect_lazy(&config.consensus)?)
    };

    let pipeline =
        IngestionPipeline::from_config(&config, graph.clone(), gate, Arc::new(store.clone()))?;

    info!(
        transactions = graph.len(),
        tips = graph.tip_count(),
        "Tangle node ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                if line.trim().is_empty() {
                    continue;
                }

                let reply = match serde_json::from_str::<Submission>(&line).map_err(Error::from) {
                    Ok(submission) => {
                        info!(
                            attester = %submission.attester,
                            attestee = %submission.attestee,
                            "Submission received"
                        );
                        pipeline.submit_reply(&submission).await
                    }
                    Err(e) => {
                        warn!(error = %e, "Rejecting submission");
                        SubmitReply::rejected(&e)
                    }
                };

                let mut out = serde_json::to_vec(&reply)?;
                out.push(b'\n');
                stdout.write_all(&out).await?;
                stdout.flush().await?;
            }

            result = signal::ctrl_c() => {
                if let Err(err) = result {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
                info!("Received shutdown signal");
                break;
            }
        }
    }

    info!("Shutting down tangle node...");
    store.flush().await?;
    store.shutdown().await?;

    info!("Tangle node stopped");
    Ok(())
}
