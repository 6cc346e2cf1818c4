//! Content hashing for the tangle
//!
//! This module provides:
//! - SHA-256 hashing of arbitrary bytes
//! - The canonical, versioned byte encoding of a transaction
//! - Transaction content addresses

use crate::types::{Hash, Transaction};
use sha2::{Digest, Sha256};

/// Version tag of the canonical transaction encoding
pub const HASH_VERSION: u8 = 1;

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Hash::from_bytes(hasher.finalize().into())
}

/// Canonical bytes of the content-addressed fields
///
/// Layout: `version || u32_be(len(approves)) || approves... || attestation`.
/// Audit metadata (attester, attestee, timestamp) is not part of the encoding.
pub fn canonical_bytes(approves: &[Hash], attestation: &Hash) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + 4 + (approves.len() + 1) * Hash::LEN);
    buf.push(HASH_VERSION);
    buf.extend_from_slice(&(approves.len() as u32).to_be_bytes());
    for approved in approves {
        buf.extend_from_slice(approved.as_bytes());
    }
    buf.extend_from_slice(attestation.as_bytes());
    buf
}

/// Compute the content address of a transaction
pub fn hash_transaction(tx: &Transaction) -> Hash {
    hash_bytes(&canonical_bytes(&tx.approves, &tx.attestation))
}

/// Check that a transaction's stored hash matches its contents
pub fn verify_transaction_hash(tx: &Transaction) -> bool {
    hash_transaction(tx) == tx.hash
}
