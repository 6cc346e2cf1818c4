//! In-process consensus gate for tests and `--mock-consensus` nodes

use super::ConsensusGate;
use crate::{crypto::hash_bytes, types::Hash, Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// In-process consensus gate
///
/// Attests each payload with its SHA-256 digest, so distinct payloads get
/// distinct attestations.
#[derive(Debug, Default)]
pub struct MockConsensusGate {
    latency: Duration,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl MockConsensusGate {
    /// Gate that answers immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate that waits `latency` before answering
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Gate that rejects every payload
    pub fn failing() -> Self {
        let gate = Self::default();
        gate.set_failing(true);
        gate
    }

    /// Switch forced failure on or off
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of validation calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsensusGate for MockConsensusGate {
    async fn validate(&self, payload: &[u8], deadline: Duration) -> Result<Hash> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.latency.is_zero() {
            if self.latency > deadline {
                tokio::time::sleep(deadline).await;
                warn!("Mock consensus: deadline exceeded");
                return Err(Error::ValidationFailure("Deadline exceeded".to_string()));
            }
            tokio::time::sleep(self.latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            warn!("Mock consensus: simulated rejection");
            return Err(Error::ValidationFailure(
                "Simulated consensus failure".to_string(),
            ));
        }

        let attestation = hash_bytes(payload);
        info!(attestation = %attestation, "Mock consensus: payload attested");
        Ok(attestation)
    }
}
