//! Tangle Core
//!
//! DAG ledger ingestion: every accepted attestation becomes a transaction
//! that approves existing tips, is validated by an external consensus
//! application, is content-addressed with SHA-256 and is durably recorded.
//!
//! # Architecture
//!
//! - **Transaction Graph**: Concurrency-safe DAG with approvers, tips and weights
//! - **Tip Selection**: Seedable weighted random walks toward the tips
//! - **Consensus Gate**: Deadline-bound validation over gRPC
//! - **Single Writer**: Graph inserts serialize on one lock; durable writes go
//!   through one persistence actor
//!
//! # Invariants
//!
//! - Acyclic: transactions only approve transactions that already exist
//! - No dangling references: every approved hash is in the graph
//! - Tip correctness: a hash is a tip iff nothing approves it
//! - Weight monotonicity: inserts never decrease any weight

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod crypto;
pub mod dag;
pub mod tip_selection;
pub mod consensus;
pub mod storage;
pub mod actor;
pub mod pipeline;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use error::{Error, Result};
pub use types::{Hash, SubmitReply, Submission, Transaction};
pub use dag::TransactionGraph;
pub use tip_selection::TipSelector;
pub use consensus::{ConsensusGate, GrpcConsensusGate, MockConsensusGate};
pub use storage::{Storage, TransactionStore};
pub use actor::{spawn_persistence_actor, StoreHandle};
pub use pipeline::IngestionPipeline;
pub use config::Config;
