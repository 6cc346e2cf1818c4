//! Core types for the tangle
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Content addressing (SHA-256 over canonical bytes)

use crate::{crypto, Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte content address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Hash length in bytes
    pub const LEN: usize = 32;

    /// All-zero hash, used as "no reference"
    pub const NIL: Hash = Hash([0u8; 32]);

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the nil hash
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Lowercase hex without prefix
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex, with or without a `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(digits)
            .map_err(|e| Error::Other(format!("Invalid hex hash {:?}: {}", s, e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            Error::Other(format!("Hash must be {} bytes, got {}", Self::LEN, v.len()))
        })?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps logs readable
        write!(f, "Hash({}..)", &self.to_hex()[..12])
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Externally submitted attestation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Party making the attestation
    pub attester: String,

    /// Party being attested
    pub attestee: String,

    /// Free-form payload
    #[serde(default)]
    pub data: String,
}

impl Submission {
    /// Create new submission
    pub fn new(
        attester: impl Into<String>,
        attestee: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            attester: attester.into(),
            attestee: attestee.into(),
            data: data.into(),
        }
    }

    /// Bytes handed to the consensus application
    pub fn payload_bytes(&self) -> Vec<u8> {
        // Serializing plain strings to JSON cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// A tangle transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Content address over `approves` and `attestation`
    pub hash: Hash,

    /// Approved transactions, in selection order (trunk first)
    pub approves: Vec<Hash>,

    /// Attestation reference returned by the consensus application
    pub attestation: Hash,

    /// Submitter of the attestation (audit only, not hashed)
    pub attester: String,

    /// Subject of the attestation (audit only, not hashed)
    pub attestee: String,

    /// Creation timestamp (nanoseconds since Unix epoch, not hashed)
    pub timestamp_nanos: i64,
}

impl Transaction {
    /// Build a transaction and compute its hash
    pub fn new(approves: Vec<Hash>, attestation: Hash, submission: &Submission) -> Self {
        let mut tx = Self {
            hash: Hash::NIL,
            approves,
            attestation,
            attester: submission.attester.clone(),
            attestee: submission.attestee.clone(),
            timestamp_nanos: Utc::now().timestamp_nanos_opt().unwrap_or(0),
        };
        tx.hash = crypto::hash_transaction(&tx);
        tx
    }

    /// Genesis transactions approve nothing
    pub fn is_genesis(&self) -> bool {
        self.approves.is_empty()
    }

    /// Trunk reference (first approval)
    pub fn trunk(&self) -> Option<Hash> {
        self.approves.first().copied()
    }

    /// Branch reference (second approval)
    pub fn branch(&self) -> Option<Hash> {
        self.approves.get(1).copied()
    }

    /// Serialized form handed to durable storage
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from the durable form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Reply returned at the submission boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReply {
    /// 0 on success, error code otherwise
    pub code: u32,

    /// Transaction hash as `0x`-prefixed hex, empty on failure
    pub hash: String,
}

impl SubmitReply {
    /// Successful submission
    pub fn accepted(hash: Hash) -> Self {
        Self {
            code: 0,
            hash: hash.to_string(),
        }
    }

    /// Failed submission
    pub fn rejected(error: &Error) -> Self {
        Self {
            code: error.code(),
            hash: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_display_has_prefix() {
        let hash = Hash::from_bytes([0xab; 32]);
        let rendered = hash.to_string();
        assert!(rendered.starts_with("0xabab"));
        assert_eq!(rendered.len(), 2 + 64);
    }

    #[test]
    fn test_hash_from_hex_accepts_both_forms() {
        let hash = Hash::from_bytes([7u8; 32]);
        assert_eq!(Hash::from_hex(&hash.to_string()).unwrap(), hash);
        assert_eq!(Hash::from_hex(&hash.to_hex()).unwrap(), hash);
    }

    #[test]
    fn test_hash_from_hex_rejects_bad_input() {
        assert!(Hash::from_hex("").is_err());
        assert!(Hash::from_hex("0xzz").is_err());
        assert!(Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_nil_hash() {
        assert!(Hash::NIL.is_nil());
        assert!(!Hash::from_bytes([1u8; 32]).is_nil());
    }

    #[test]
    fn test_transaction_trunk_and_branch() {
        let a = Hash::from_bytes([1u8; 32]);
        let b = Hash::from_bytes([2u8; 32]);
        let submission = Submission::new("alice", "bob", "");
        let tx = Transaction::new(vec![a, b], Hash::from_bytes([9u8; 32]), &submission);

        assert_eq!(tx.trunk(), Some(a));
        assert_eq!(tx.branch(), Some(b));
        assert!(!tx.is_genesis());
        assert_eq!(tx.attester, "alice");
    }

    #[test]
    fn test_transaction_bytes_roundtrip() {
        let submission = Submission::new("alice", "bob", "hello");
        let tx = Transaction::new(vec![], Hash::from_bytes([3u8; 32]), &submission);
        let decoded = Transaction::from_bytes(&tx.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, tx);
    }

    #[test]
    fn test_submit_reply() {
        let reply = SubmitReply::accepted(Hash::from_bytes([0xff; 32]));
        assert_eq!(reply.code, 0);
        assert!(reply.hash.starts_with("0xff"));

        let reply = SubmitReply::rejected(&Error::ValidationFailure("down".into()));
        assert_eq!(reply.code, 1);
        assert!(reply.hash.is_empty());
    }
}
