//! Consensus gate: validation by the external consensus application
//!
//! Every submission is sent to the application before it may enter the
//! tangle. The application answers with a hex-encoded attestation hash,
//! which becomes the transaction's `attestation`.

pub mod grpc;
pub mod mock;

pub use grpc::GrpcConsensusGate;
pub use mock::MockConsensusGate;

use crate::{types::Hash, Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// External validation boundary
///
/// Implementations must surface every network or application failure as
/// `Error::ValidationFailure`. Callers do not retry at this layer.
#[async_trait]
pub trait ConsensusGate: Send + Sync {
    /// Validate a serialized submission, returning its attestation hash
    ///
    /// `deadline` bounds the whole call.
    async fn validate(&self, payload: &[u8], deadline: Duration) -> Result<Hash>;
}

/// Turn the application's textual reply into an attestation hash
///
/// The reply must be a 32-byte hex hash, with or without `0x`. An empty or
/// malformed reply means the application did not accept the payload.
pub fn attestation_from_reply(reply: &str) -> Result<Hash> {
    let reply = reply.trim();
    if reply.is_empty() {
        return Err(Error::ValidationFailure(
            "Consensus application returned an empty result".to_string(),
        ));
    }

    Hash::from_hex(reply).map_err(|e| {
        Error::ValidationFailure(format!("Malformed attestation {:?}: {}", reply, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_reply_used_verbatim() {
        let hash = Hash::from_bytes([0x42; 32]);
        assert_eq!(attestation_from_reply(&hash.to_string()).unwrap(), hash);
        assert_eq!(attestation_from_reply(&hash.to_hex()).unwrap(), hash);
    }

    #[test]
    fn test_non_hex_reply_is_failure() {
        assert!(matches!(
            attestation_from_reply("block-17"),
            Err(Error::ValidationFailure(_))
        ));
        assert!(matches!(
            attestation_from_reply("rpc error: unavailable"),
            Err(Error::ValidationFailure(_))
        ));
    }

    #[test]
    fn test_short_hex_reply_is_failure() {
        assert!(matches!(
            attestation_from_reply("0xdeadbeef"),
            Err(Error::ValidationFailure(_))
        ));
    }

    #[test]
    fn test_empty_reply_is_failure() {
        assert!(matches!(
            attestation_from_reply("  "),
            Err(Error::ValidationFailure(_))
        ));
    }
}
