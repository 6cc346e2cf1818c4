//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring ingestion.
//!
//! # Metrics
//!
//! - `tangle_submissions_accepted_total` - Transactions committed to the graph
//! - `tangle_validation_failures_total` - Submissions rejected by consensus
//! - `tangle_graph_rejections_total` - Inserts refused by the graph
//! - `tangle_persistence_failures_total` - Durable writes that failed after commit
//! - `tangle_transactions` - Transactions in the graph
//! - `tangle_tips` - Current tip count
//! - `tangle_submit_duration_seconds` - Histogram of submit latencies
//!
//! Each collector lives on its own `Registry`, so several pipelines can run
//! in one process (as they do in tests).

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Accepted submissions
    pub accepted_total: IntCounter,

    /// Consensus rejections
    pub validation_failures: IntCounter,

    /// Graph rejections (duplicate, missing tip, invalid)
    pub graph_rejections: IntCounter,

    /// Post-commit persistence failures
    pub persistence_failures: IntCounter,

    /// Graph size
    pub transactions: IntGauge,

    /// Tip count
    pub tips: IntGauge,

    /// Submit duration histogram
    pub submit_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("accepted_total", &self.accepted_total.get())
            .field("tips", &self.tips.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let accepted_total = IntCounter::new(
            "tangle_submissions_accepted_total",
            "Transactions committed to the graph",
        )?;
        registry.register(Box::new(accepted_total.clone()))?;

        let validation_failures = IntCounter::new(
            "tangle_validation_failures_total",
            "Submissions rejected by the consensus application",
        )?;
        registry.register(Box::new(validation_failures.clone()))?;

        let graph_rejections = IntCounter::new(
            "tangle_graph_rejections_total",
            "Inserts refused by the transaction graph",
        )?;
        registry.register(Box::new(graph_rejections.clone()))?;

        let persistence_failures = IntCounter::new(
            "tangle_persistence_failures_total",
            "Durable writes that failed after the graph commit",
        )?;
        registry.register(Box::new(persistence_failures.clone()))?;

        let transactions = IntGauge::new("tangle_transactions", "Transactions in the graph")?;
        registry.register(Box::new(transactions.clone()))?;

        let tips = IntGauge::new("tangle_tips", "Current tip count")?;
        registry.register(Box::new(tips.clone()))?;

        let submit_duration = Histogram::with_opts(
            HistogramOpts::new("tangle_submit_duration_seconds", "Histogram of submit latencies")
                .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 5.0]),
        )?;
        registry.register(Box::new(submit_duration.clone()))?;

        Ok(Self {
            accepted_total,
            validation_failures,
            graph_rejections,
            persistence_failures,
            transactions,
            tips,
            submit_duration,
            registry,
        })
    }

    /// Record a committed transaction and the resulting graph shape
    pub fn record_accepted(&self, transactions: usize, tips: usize) {
        self.accepted_total.inc();
        self.transactions.set(transactions as i64);
        self.tips.set(tips as i64);
    }

    /// Record a consensus rejection
    pub fn record_validation_failure(&self) {
        self.validation_failures.inc();
    }

    /// Record a graph rejection
    pub fn record_graph_rejection(&self) {
        self.graph_rejections.inc();
    }

    /// Record a persistence failure
    pub fn record_persistence_failure(&self) {
        self.persistence_failures.inc();
    }

    /// Record submit duration
    pub fn record_submit_duration(&self, duration_seconds: f64) {
        self.submit_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
