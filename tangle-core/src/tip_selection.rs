//! Tip selection by weighted random walk
//!
//! Each of the K walks:
//!
//! 1. Picks an entry point: the reference transaction when one is given and
//!    known, otherwise a random tip stepped back up to `depth` approvals
//!    toward genesis.
//! 2. Walks forward along approvers, choosing each next step with
//!    probability proportional to cumulative weight.
//! 3. Stops on a tip, or after `depth` forward steps; a walk that runs out
//!    of budget settles on the nearest tip reachable from where it stopped.
//!
//! Walks landing on an already selected tip are retried up to `max_retries`
//! times; after that the duplicate is accepted and collapses, so the result
//! holds between 1 and K distinct hashes (none for an empty graph).
//!
//! The RNG is injected and seedable so selections are reproducible in tests.

use crate::{
    config::TipSelectionConfig,
    dag::{GraphView, TransactionGraph},
    types::Hash,
};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::{HashSet, VecDeque};

/// Chooses approval targets for new transactions
#[derive(Debug)]
pub struct TipSelector {
    rng: Mutex<StdRng>,
    approvals: usize,
    walk_depth: usize,
    max_retries: usize,
}

impl TipSelector {
    /// Create a selector
    ///
    /// With `seed` set the sequence of selections is deterministic for a
    /// given sequence of graph states.
    pub fn new(approvals: usize, walk_depth: usize, max_retries: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            rng: Mutex::new(rng),
            approvals,
            walk_depth,
            max_retries,
        }
    }

    /// Create from configuration
    pub fn from_config(config: &TipSelectionConfig) -> Self {
        Self::new(
            config.approvals,
            config.walk_depth,
            config.max_retries,
            config.seed,
        )
    }

    /// Select approval targets using `depth` as the walk budget
    ///
    /// `reference` of `Hash::NIL` means an unbiased selection. The returned
    /// hashes are distinct, exist in the graph and are in trunk, branch order.
    pub fn select_tips(&self, graph: &TransactionGraph, depth: usize, reference: Hash) -> Vec<Hash> {
        let view = graph.view();
        if view.is_empty() {
            return Vec::new();
        }

        let mut rng = self.rng.lock();
        let mut selected: Vec<Hash> = Vec::with_capacity(self.approvals);

        for _ in 0..self.approvals {
            let mut tip = walk(&view, &mut *rng, depth, reference);

            let mut retries = 0;
            while selected.contains(&tip) && retries < self.max_retries {
                tip = walk(&view, &mut *rng, depth, reference);
                retries += 1;
            }

            if selected.contains(&tip) {
                tracing::trace!(tip = %tip, "Walk kept landing on a selected tip");
            } else {
                selected.push(tip);
            }
        }

        tracing::debug!(count = selected.len(), depth, "Selected tips");
        selected
    }

    /// Select with the configured walk budget and no reference
    pub fn select(&self, graph: &TransactionGraph) -> Vec<Hash> {
        self.select_tips(graph, self.walk_depth, Hash::NIL)
    }
}

/// One walk from an entry point to a tip
fn walk(view: &GraphView<'_>, rng: &mut StdRng, depth: usize, reference: Hash) -> Hash {
    let mut current = entry_point(view, rng, depth, reference);

    for _ in 0..depth {
        if view.is_tip(&current) {
            return current;
        }
        match weighted_step(view, rng, &current) {
            Some(next) => current = next,
            None => break,
        }
    }

    if view.is_tip(&current) {
        current
    } else {
        nearest_tip(view, current)
    }
}

fn entry_point(view: &GraphView<'_>, rng: &mut StdRng, depth: usize, reference: Hash) -> Hash {
    if !reference.is_nil() && view.contains(&reference) {
        return reference;
    }

    let tips = view.tips();
    let mut current = match tips.iter().nth(rng.gen_range(0..tips.len().max(1))) {
        Some(tip) => *tip,
        None => return Hash::NIL,
    };

    for _ in 0..depth {
        let approves = view.approves(&current);
        if approves.is_empty() {
            break;
        }
        current = approves[rng.gen_range(0..approves.len())];
    }

    current
}

/// Pick an approver with probability proportional to its weight
fn weighted_step(view: &GraphView<'_>, rng: &mut StdRng, current: &Hash) -> Option<Hash> {
    let candidates: Vec<(Hash, u64)> = view
        .approvers(current)
        .map(|h| (*h, view.weight(h).max(1)))
        .collect();

    let total: u64 = candidates.iter().map(|(_, w)| w).sum();
    if total == 0 {
        return None;
    }

    let mut roll = rng.gen_range(0..total);
    for (hash, weight) in candidates {
        if roll < weight {
            return Some(hash);
        }
        roll -= weight;
    }

    None
}

/// Breadth-first search along approvers for the closest tip
fn nearest_tip(view: &GraphView<'_>, from: Hash) -> Hash {
    let mut queue = VecDeque::from([from]);
    let mut visited = HashSet::from([from]);

    while let Some(current) = queue.pop_front() {
        if view.is_tip(&current) {
            return current;
        }
        for approver in view.approvers(&current) {
            if visited.insert(*approver) {
                queue.push_back(*approver);
            }
        }
    }

    // Unreachable for a finite DAG: every non-tip has an approver
    from
}
