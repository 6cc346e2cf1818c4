//! Ingestion pipeline
//!
//! Turns an external submission into a committed tangle transaction:
//!
//! 1. Select tips to approve (read-only against the graph)
//! 2. Validate the payload with the consensus application, bounded by a
//!    deadline and outside any graph lock
//! 3. Build the transaction and compute its content address
//! 4. Insert into the graph (the only mutation)
//! 5. Hand the serialized transaction to durable storage
//!
//! A failure in steps 1-4 leaves the graph and the store untouched. A
//! persistence failure in step 5 is logged and counted but does not undo the
//! graph insert: the hash is still returned to the caller.

use crate::{
    config::Config,
    consensus::ConsensusGate,
    dag::TransactionGraph,
    metrics::Metrics,
    storage::TransactionStore,
    tip_selection::TipSelector,
    types::{Hash, SubmitReply, Submission, Transaction},
    Error, Result,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Orchestrates tip selection, validation, insertion and persistence
pub struct IngestionPipeline {
    graph: Arc<TransactionGraph>,
    selector: TipSelector,
    gate: Arc<dyn ConsensusGate>,
    store: Arc<dyn TransactionStore>,
    validation_timeout: Duration,
    metrics: Metrics,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("transactions", &self.graph.len())
            .field("selector", &self.selector)
            .field("validation_timeout", &self.validation_timeout)
            .finish()
    }
}

impl IngestionPipeline {
    /// Create a pipeline over a shared graph
    pub fn new(
        graph: Arc<TransactionGraph>,
        selector: TipSelector,
        gate: Arc<dyn ConsensusGate>,
        store: Arc<dyn TransactionStore>,
        validation_timeout: Duration,
    ) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;

        Ok(Self {
            graph,
            selector,
            gate,
            store,
            validation_timeout,
            metrics,
        })
    }

    /// Create a pipeline using the tip selection and consensus settings
    pub fn from_config(
        config: &Config,
        graph: Arc<TransactionGraph>,
        gate: Arc<dyn ConsensusGate>,
        store: Arc<dyn TransactionStore>,
    ) -> Result<Self> {
        Self::new(
            graph,
            TipSelector::from_config(&config.tip_selection),
            gate,
            store,
            Duration::from_millis(config.consensus.timeout_ms),
        )
    }

    /// Shared graph
    pub fn graph(&self) -> &Arc<TransactionGraph> {
        &self.graph
    }

    /// Pipeline metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Ingest one submission, returning the new transaction's hash
    pub async fn submit(&self, submission: &Submission) -> Result<Hash> {
        let started = Instant::now();
        let result = self.ingest(submission).await;
        self.metrics
            .record_submit_duration(started.elapsed().as_secs_f64());
        result
    }

    /// Ingest and render the boundary reply
    pub async fn submit_reply(&self, submission: &Submission) -> SubmitReply {
        match self.submit(submission).await {
            Ok(hash) => SubmitReply::accepted(hash),
            Err(e) => SubmitReply::rejected(&e),
        }
    }

    async fn ingest(&self, submission: &Submission) -> Result<Hash> {
        debug!(
            attester = %submission.attester,
            attestee = %submission.attestee,
            "Submission received"
        );

        let tips = self.selector.select(&self.graph);
        debug!(tips = ?tips, "Tips selected");

        let attestation = self.validate(submission).await?;
        info!(attestation = %attestation, "Payload attested");

        let tx = Transaction::new(tips, attestation, submission);
        // Proof-of-work, if ever added, belongs here: after construction,
        // before the graph insert.
        let hash = tx.hash;
        let bytes = tx.to_bytes()?;

        if let Err(e) = self.graph.add(tx) {
            warn!(hash = %hash, error = %e, "Graph rejected transaction");
            self.metrics.record_graph_rejection();
            return Err(e);
        }
        self.metrics
            .record_accepted(self.graph.len(), self.graph.tip_count());

        if let Err(e) = self.persist(hash, &bytes).await {
            error!(
                hash = %hash,
                error = %e,
                code = e.code(),
                "Keeping in-memory commit"
            );
            self.metrics.record_persistence_failure();
        } else {
            info!(hash = %hash, "Transaction stored");
        }

        Ok(hash)
    }

    async fn persist(&self, hash: Hash, bytes: &[u8]) -> Result<()> {
        self.store
            .save(hash.as_bytes(), bytes)
            .await
            .map_err(|e| Error::PersistenceFailure(format!("{}: {}", hash, e)))
    }

    async fn validate(&self, submission: &Submission) -> Result<Hash> {
        let payload = submission.payload_bytes();
        let outcome = tokio::time::timeout(
            self.validation_timeout,
            self.gate.validate(&payload, self.validation_timeout),
        )
        .await;

        let error = match outcome {
            Ok(Ok(attestation)) => return Ok(attestation),
            Ok(Err(Error::ValidationFailure(msg))) => Error::ValidationFailure(msg),
            Ok(Err(other)) => Error::ValidationFailure(other.to_string()),
            Err(_) => Error::ValidationFailure(format!(
                "Consensus application did not answer within {:?}",
                self.validation_timeout
            )),
        };

        warn!(error = %error, "Validation failed");
        self.metrics.record_validation_failure();
        Err(error)
    }
}
