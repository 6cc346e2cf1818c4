//! Transaction graph (the tangle DAG)
//!
//! Stores transactions keyed by hash together with the reverse approval
//! edges, the live tip set and cumulative weights.
//!
//! # Concurrency
//!
//! All state sits behind one `RwLock`. `add` takes the write lock, so inserts
//! are serialized and each one is observed atomically: membership checks, the
//! tip update and weight propagation never interleave with another insert.
//! Readers (`get_tips`, `weight`, tip selection walks) share the read lock and
//! always see the graph as of some prefix of completed inserts.
//!
//! # Invariants
//!
//! - Write-once nodes: a hash is never overwritten or removed
//! - No dangling references: every approved hash is present in `nodes`
//! - Acyclic: a transaction can only approve transactions inserted before it
//! - Tips: a hash is a tip iff its approver set is empty

use crate::{
    config::DagConfig,
    crypto::verify_transaction_hash,
    types::{Hash, Transaction},
    Error, Result,
};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Default)]
struct GraphState {
    /// hash → transaction (write-once)
    nodes: HashMap<Hash, Transaction>,

    /// hash → hashes approving it (reverse edges)
    approvers: HashMap<Hash, BTreeSet<Hash>>,

    /// Hashes with no approvers; ordered so seeded walks are reproducible
    tips: BTreeSet<Hash>,

    /// Cumulative weight (own weight 1 plus transitive approvers)
    weights: HashMap<Hash, u64>,
}

/// Concurrency-safe transaction DAG
#[derive(Debug)]
pub struct TransactionGraph {
    state: RwLock<GraphState>,
    propagation_depth: usize,
}

impl Default for TransactionGraph {
    fn default() -> Self {
        Self::new(DagConfig::default().weight_propagation_depth)
    }
}

impl TransactionGraph {
    /// Create an empty graph
    ///
    /// `propagation_depth` bounds how many approval levels a new
    /// transaction's weight increment travels.
    pub fn new(propagation_depth: usize) -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
            propagation_depth,
        }
    }

    /// Create from configuration
    pub fn from_config(config: &DagConfig) -> Self {
        Self::new(config.weight_propagation_depth)
    }

    /// Up to `count` distinct tips, never including `exclude`
    ///
    /// Returns fewer (possibly none) when the graph has fewer tips.
    pub fn get_tips(&self, count: usize, exclude: Hash) -> Vec<Hash> {
        let state = self.state.read();
        state
            .tips
            .iter()
            .filter(|tip| **tip != exclude)
            .take(count)
            .copied()
            .collect()
    }

    /// Insert a transaction
    ///
    /// Rejects without mutation when the hash already exists, when any
    /// approved hash is unknown, or when the transaction is malformed.
    pub fn add(&self, tx: Transaction) -> Result<()> {
        let mut state = self.state.write();

        if state.nodes.contains_key(&tx.hash) {
            return Err(Error::DuplicateTransaction(tx.hash.to_string()));
        }

        for approved in &tx.approves {
            if !state.nodes.contains_key(approved) {
                return Err(Error::MissingTip(approved.to_string()));
            }
        }

        let distinct: HashSet<&Hash> = tx.approves.iter().collect();
        if distinct.len() != tx.approves.len() {
            return Err(Error::InvalidTransaction(format!(
                "{} approves the same transaction twice",
                tx.hash
            )));
        }

        if tx.is_genesis() && !state.nodes.is_empty() {
            return Err(Error::InvalidTransaction(format!(
                "{} approves nothing but genesis already exists",
                tx.hash
            )));
        }

        if !verify_transaction_hash(&tx) {
            return Err(Error::InvalidTransaction(format!(
                "{} does not match its contents",
                tx.hash
            )));
        }

        let hash = tx.hash;
        let GraphState {
            nodes,
            approvers,
            tips,
            weights,
        } = &mut *state;

        for approved in &tx.approves {
            approvers.entry(*approved).or_default().insert(hash);
            tips.remove(approved);
        }
        approvers.insert(hash, BTreeSet::new());
        tips.insert(hash);
        weights.insert(hash, 1);

        // Breadth-first over approves edges so every ancestor gains exactly 1
        let mut frontier = tx.approves.clone();
        let mut visited: HashSet<Hash> = frontier.iter().copied().collect();
        let mut depth = 0;
        while !frontier.is_empty() && depth < self.propagation_depth {
            let mut next = Vec::new();
            for ancestor in frontier {
                *weights.entry(ancestor).or_insert(1) += 1;
                if let Some(node) = nodes.get(&ancestor) {
                    for parent in &node.approves {
                        if visited.insert(*parent) {
                            next.push(*parent);
                        }
                    }
                }
            }
            frontier = next;
            depth += 1;
        }

        tracing::debug!(
            hash = %hash,
            approves = tx.approves.len(),
            tips = tips.len(),
            "Transaction added to graph"
        );

        nodes.insert(hash, tx);
        Ok(())
    }

    /// Rebuild from persisted transactions given in any order
    ///
    /// Inserts in topological order: a transaction becomes ready once every
    /// approval it references is in the graph. Transactions whose approvals
    /// never become available, or that fail validation, are skipped.
    /// Returns the number inserted.
    pub fn restore(&self, transactions: Vec<Transaction>) -> usize {
        let total = transactions.len();
        let mut pending: HashMap<Hash, Transaction> = transactions
            .into_iter()
            .map(|tx| (tx.hash, tx))
            .collect();

        // Unresolved approval count per pending hash, and the reverse edges
        // along which resolution travels
        let mut unresolved: HashMap<Hash, usize> = HashMap::with_capacity(pending.len());
        let mut children: HashMap<Hash, Vec<Hash>> = HashMap::new();
        let mut ready = Vec::new();
        {
            let state = self.state.read();
            for (hash, tx) in &pending {
                let parents: BTreeSet<Hash> = tx.approves.iter().copied().collect();
                let mut count = 0;
                for parent in parents {
                    if state.nodes.contains_key(&parent) {
                        continue;
                    }
                    count += 1;
                    if pending.contains_key(&parent) {
                        children.entry(parent).or_default().push(*hash);
                    }
                }
                if count == 0 {
                    ready.push(*hash);
                } else {
                    unresolved.insert(*hash, count);
                }
            }
        }

        // Reverse-sorted so pops are deterministic and genesis-first for a
        // fresh graph
        ready.sort_unstable_by(|a, b| b.cmp(a));
        let mut restored = 0;

        while let Some(hash) = ready.pop() {
            let Some(tx) = pending.remove(&hash) else {
                continue;
            };
            if let Err(e) = self.add(tx) {
                tracing::warn!(hash = %hash, error = %e, "Skipping stored transaction");
                continue;
            }
            restored += 1;

            for child in children.remove(&hash).unwrap_or_default() {
                if let Some(count) = unresolved.get_mut(&child) {
                    *count -= 1;
                    if *count == 0 {
                        unresolved.remove(&child);
                        ready.push(child);
                    }
                }
            }
        }

        if !pending.is_empty() {
            tracing::warn!(
                unresolved = pending.len(),
                "Stored transactions reference unknown approvals"
            );
        }

        tracing::info!(restored, total, "Graph restored");
        restored
    }

    /// Cumulative weight, 0 if unknown
    pub fn weight(&self, hash: &Hash) -> u64 {
        self.state.read().weights.get(hash).copied().unwrap_or(0)
    }

    /// Whether the hash is in the graph
    pub fn contains(&self, hash: &Hash) -> bool {
        self.state.read().nodes.contains_key(hash)
    }

    /// Get a transaction by hash
    pub fn get(&self, hash: &Hash) -> Option<Transaction> {
        self.state.read().nodes.get(hash).cloned()
    }

    /// Whether the hash is a current tip
    pub fn is_tip(&self, hash: &Hash) -> bool {
        self.state.read().tips.contains(hash)
    }

    /// Hashes approving `hash`
    pub fn approvers(&self, hash: &Hash) -> Vec<Hash> {
        self.state
            .read()
            .approvers
            .get(hash)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All transaction hashes
    pub fn hashes(&self) -> Vec<Hash> {
        self.state.read().nodes.keys().copied().collect()
    }

    /// Number of transactions
    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    /// Whether the graph holds no transactions
    pub fn is_empty(&self) -> bool {
        self.state.read().nodes.is_empty()
    }

    /// Number of current tips
    pub fn tip_count(&self) -> usize {
        self.state.read().tips.len()
    }

    /// Consistent read-only view for multi-step traversals
    pub(crate) fn view(&self) -> GraphView<'_> {
        GraphView {
            state: self.state.read(),
        }
    }
}

/// Read-locked snapshot of the graph
///
/// Holding a view blocks inserts; keep it for the duration of one
/// selection only.
pub(crate) struct GraphView<'a> {
    state: RwLockReadGuard<'a, GraphState>,
}

impl GraphView<'_> {
    pub(crate) fn is_empty(&self) -> bool {
        self.state.nodes.is_empty()
    }

    pub(crate) fn contains(&self, hash: &Hash) -> bool {
        self.state.nodes.contains_key(hash)
    }

    pub(crate) fn tips(&self) -> &BTreeSet<Hash> {
        &self.state.tips
    }

    pub(crate) fn is_tip(&self, hash: &Hash) -> bool {
        self.state.tips.contains(hash)
    }

    pub(crate) fn approves(&self, hash: &Hash) -> &[Hash] {
        self.state
            .nodes
            .get(hash)
            .map(|tx| tx.approves.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn approvers(&self, hash: &Hash) -> impl Iterator<Item = &Hash> + '_ {
        self.state.approvers.get(hash).into_iter().flatten()
    }

    pub(crate) fn weight(&self, hash: &Hash) -> u64 {
        self.state.weights.get(hash).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_bytes;
    use crate::types::Submission;

    fn tx(approves: Vec<Hash>, seed: &str) -> Transaction {
        Transaction::new(
            approves,
            hash_bytes(seed.as_bytes()),
            &Submission::new("alice", "bob", seed),
        )
    }

    #[test]
    fn test_empty_graph() {
        let graph = TransactionGraph::default();
        assert!(graph.is_empty());
        assert!(graph.get_tips(2, Hash::NIL).is_empty());
        assert_eq!(graph.weight(&Hash::from_bytes([1u8; 32])), 0);
    }

    #[test]
    fn test_genesis_is_tip() {
        let graph = TransactionGraph::default();
        let genesis = tx(vec![], "genesis");
        graph.add(genesis.clone()).unwrap();

        assert_eq!(graph.len(), 1);
        assert!(graph.is_tip(&genesis.hash));
        assert_eq!(graph.weight(&genesis.hash), 1);
        assert_eq!(graph.get_tips(2, Hash::NIL), vec![genesis.hash]);
    }

    #[test]
    fn test_child_replaces_parent_as_tip() {
        let graph = TransactionGraph::default();
        let genesis = tx(vec![], "genesis");
        graph.add(genesis.clone()).unwrap();

        let child = tx(vec![genesis.hash], "child");
        graph.add(child.clone()).unwrap();

        assert!(!graph.is_tip(&genesis.hash));
        assert!(graph.is_tip(&child.hash));
        assert_eq!(graph.weight(&genesis.hash), 2);
        assert_eq!(graph.weight(&child.hash), 1);
        assert_eq!(graph.approvers(&genesis.hash), vec![child.hash]);
    }

    #[test]
    fn test_diamond_counts_ancestor_once() {
        let graph = TransactionGraph::default();
        let g = tx(vec![], "g");
        graph.add(g.clone()).unwrap();
        let a = tx(vec![g.hash], "a");
        let b = tx(vec![g.hash], "b");
        graph.add(a.clone()).unwrap();
        graph.add(b.clone()).unwrap();
        assert_eq!(graph.weight(&g.hash), 3);

        // Reaches g through both a and b
        let c = tx(vec![a.hash, b.hash], "c");
        graph.add(c.clone()).unwrap();

        assert_eq!(graph.weight(&g.hash), 4);
        assert_eq!(graph.weight(&a.hash), 2);
        assert_eq!(graph.weight(&b.hash), 2);
        assert_eq!(graph.tip_count(), 1);
    }

    #[test]
    fn test_propagation_depth_bound() {
        let graph = TransactionGraph::new(1);
        let g = tx(vec![], "g");
        graph.add(g.clone()).unwrap();
        let a = tx(vec![g.hash], "a");
        graph.add(a.clone()).unwrap();
        let b = tx(vec![a.hash], "b");
        graph.add(b).unwrap();

        // Only the direct parent is incremented by the last insert
        assert_eq!(graph.weight(&a.hash), 2);
        assert_eq!(graph.weight(&g.hash), 2);
    }

    #[test]
    fn test_duplicate_rejected_without_mutation() {
        let graph = TransactionGraph::default();
        let genesis = tx(vec![], "genesis");
        graph.add(genesis.clone()).unwrap();

        let result = graph.add(genesis.clone());
        assert!(matches!(result, Err(Error::DuplicateTransaction(_))));
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.weight(&genesis.hash), 1);
    }

    #[test]
    fn test_missing_approval_rejected() {
        let graph = TransactionGraph::default();
        graph.add(tx(vec![], "genesis")).unwrap();

        let orphan = tx(vec![Hash::from_bytes([9u8; 32])], "orphan");
        assert!(matches!(graph.add(orphan), Err(Error::MissingTip(_))));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_self_reference_rejected() {
        let graph = TransactionGraph::default();
        let genesis = tx(vec![], "genesis");
        graph.add(genesis.clone()).unwrap();

        let mut looped = tx(vec![genesis.hash], "loop");
        looped.approves.push(looped.hash);
        assert!(matches!(graph.add(looped), Err(Error::MissingTip(_))));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_repeated_approval_rejected() {
        let graph = TransactionGraph::default();
        let genesis = tx(vec![], "genesis");
        graph.add(genesis.clone()).unwrap();

        let doubled = tx(vec![genesis.hash, genesis.hash], "doubled");
        assert!(matches!(graph.add(doubled), Err(Error::InvalidTransaction(_))));
        assert!(graph.is_tip(&genesis.hash));
    }

    #[test]
    fn test_second_genesis_rejected() {
        let graph = TransactionGraph::default();
        graph.add(tx(vec![], "genesis")).unwrap();
        assert!(matches!(
            graph.add(tx(vec![], "another")),
            Err(Error::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_tampered_hash_rejected() {
        let graph = TransactionGraph::default();
        let mut genesis = tx(vec![], "genesis");
        genesis.hash = Hash::from_bytes([1u8; 32]);
        assert!(matches!(graph.add(genesis), Err(Error::InvalidTransaction(_))));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_restore_out_of_order() {
        let source = TransactionGraph::default();
        let g = tx(vec![], "g");
        source.add(g.clone()).unwrap();
        let a = tx(vec![g.hash], "a");
        source.add(a.clone()).unwrap();
        let b = tx(vec![g.hash, a.hash], "b");
        source.add(b.clone()).unwrap();

        let restored = TransactionGraph::default();
        let orphan = tx(vec![Hash::from_bytes([7u8; 32])], "orphan");
        assert_eq!(restored.restore(vec![b.clone(), orphan, a.clone(), g.clone()]), 3);

        assert_eq!(restored.len(), 3);
        assert_eq!(restored.weight(&g.hash), source.weight(&g.hash));
        assert_eq!(restored.get_tips(10, Hash::NIL), vec![b.hash]);
    }

    #[test]
    fn test_restore_long_chain_in_reverse() {
        let source = TransactionGraph::new(usize::MAX);
        let mut chain = vec![tx(vec![], "link-0")];
        source.add(chain[0].clone()).unwrap();
        for i in 1..500 {
            let next = tx(vec![chain[i - 1].hash], &format!("link-{}", i));
            source.add(next.clone()).unwrap();
            chain.push(next);
        }

        let restored = TransactionGraph::new(usize::MAX);
        let reversed: Vec<Transaction> = chain.iter().rev().cloned().collect();
        assert_eq!(restored.restore(reversed), 500);

        assert_eq!(restored.len(), 500);
        assert_eq!(restored.weight(&chain[0].hash), 500);
        assert_eq!(restored.get_tips(10, Hash::NIL), vec![chain[499].hash]);
    }

    #[test]
    fn test_restore_skips_descendants_of_rejected() {
        let g = tx(vec![], "g");
        let mut bad = tx(vec![g.hash], "bad");
        bad.attestation = Hash::from_bytes([9u8; 32]);
        let child = tx(vec![bad.hash], "child");

        let restored = TransactionGraph::default();
        assert_eq!(restored.restore(vec![child, bad, g.clone()]), 1);
        assert_eq!(restored.get_tips(10, Hash::NIL), vec![g.hash]);
    }

    #[test]
    fn test_get_tips_excludes_and_limits() {
        let graph = TransactionGraph::default();
        let g = tx(vec![], "g");
        graph.add(g.clone()).unwrap();
        let a = tx(vec![g.hash], "a");
        let b = tx(vec![g.hash], "b");
        let c = tx(vec![g.hash], "c");
        for t in [&a, &b, &c] {
            graph.add(t.clone()).unwrap();
        }

        assert_eq!(graph.get_tips(10, Hash::NIL).len(), 3);
        assert_eq!(graph.get_tips(2, Hash::NIL).len(), 2);

        let without_a = graph.get_tips(10, a.hash);
        assert_eq!(without_a.len(), 2);
        assert!(!without_a.contains(&a.hash));
        assert!(!without_a.contains(&g.hash));
    }
}
