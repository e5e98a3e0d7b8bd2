//! The outcome cache: memoizes each node's simulated outcome, keyed by
//! `(treeId, nodeId)`, tagged with the epoch and simulation-parameter
//! fingerprint at which it was produced.
//!
//! Each key owns a `tokio::sync::Mutex`. A concurrent caller for the same
//! key blocks on that mutex rather than racing a second simulation, which
//! is what gives single-flight semantics without a separate in-flight
//! registry.

use crate::domain::models::ids::{NodeId, TreeId};
use crate::domain::models::outcome::Outcome;
use crate::domain::models::primitives::Epoch;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

struct CachedEntry {
    epoch: Epoch,
    fingerprint: u64,
    outcome: Outcome,
}

type KeyLock = Arc<Mutex<Option<CachedEntry>>>;

#[derive(Default)]
pub struct OutcomeCache {
    entries: DashMap<(TreeId, NodeId), KeyLock>,
}

impl OutcomeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the per-key lock, creating it on first access. Holding the
    /// lock across a simulation is what serializes concurrent callers for
    /// the same `(tree, node)`.
    pub fn lock_for(&self, tree_id: TreeId, node_id: NodeId) -> KeyLock {
        self.entries
            .entry((tree_id, node_id))
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// A cached value is usable only when both its epoch and its
    /// simulation-parameter fingerprint match the caller's. A lookup at
    /// a stale epoch is treated as a miss.
    pub fn hit(entry: &Option<CachedEntry>, epoch: Epoch, fingerprint: u64) -> Option<Outcome> {
        entry.as_ref().and_then(|cached| {
            (cached.epoch == epoch && cached.fingerprint == fingerprint).then(|| cached.outcome.clone())
        })
    }

    pub fn store(slot: &mut Option<CachedEntry>, epoch: Epoch, fingerprint: u64, outcome: Outcome) {
        *slot = Some(CachedEntry { epoch, fingerprint, outcome });
    }

    /// Evicts every cached entry for the given nodes of one tree, called
    /// with the ancestor path of a mutated node. Descendants are left
    /// alone: their leaves and structure did not change.
    pub fn invalidate(&self, tree_id: TreeId, node_ids: &[NodeId]) {
        self.entries
            .retain(|&(t, n), _| !(t == tree_id && node_ids.contains(&n)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_store_then_hit() {
        let cache = OutcomeCache::new();
        let tree_id = TreeId::generate();
        let node_id = NodeId::generate();
        let lock = cache.lock_for(tree_id, node_id);
        let mut guard = lock.lock().await;

        assert!(OutcomeCache::hit(&guard, Epoch::default(), 42).is_none());

        let outcome = Outcome::empty(10);
        OutcomeCache::store(&mut guard, Epoch::default(), 42, outcome.clone());
        assert_eq!(OutcomeCache::hit(&guard, Epoch::default(), 42), Some(outcome));
    }

    #[tokio::test]
    async fn stale_epoch_is_a_miss() {
        let cache = OutcomeCache::new();
        let tree_id = TreeId::generate();
        let node_id = NodeId::generate();
        let lock = cache.lock_for(tree_id, node_id);
        let mut guard = lock.lock().await;
        OutcomeCache::store(&mut guard, Epoch(1), 42, Outcome::empty(10));

        assert!(OutcomeCache::hit(&guard, Epoch(2), 42).is_none());
    }

    #[tokio::test]
    async fn stale_fingerprint_is_a_miss() {
        let cache = OutcomeCache::new();
        let tree_id = TreeId::generate();
        let node_id = NodeId::generate();
        let lock = cache.lock_for(tree_id, node_id);
        let mut guard = lock.lock().await;
        OutcomeCache::store(&mut guard, Epoch::default(), 1, Outcome::empty(10));

        assert!(OutcomeCache::hit(&guard, Epoch::default(), 2).is_none());
    }

    #[tokio::test]
    async fn invalidate_drops_only_listed_nodes_for_the_tree() {
        let cache = OutcomeCache::new();
        let tree_id = TreeId::generate();
        let kept = NodeId::generate();
        let dropped = NodeId::generate();

        {
            let lock = cache.lock_for(tree_id, kept);
            let mut guard = lock.lock().await;
            OutcomeCache::store(&mut guard, Epoch::default(), 1, Outcome::empty(10));
        }
        {
            let lock = cache.lock_for(tree_id, dropped);
            let mut guard = lock.lock().await;
            OutcomeCache::store(&mut guard, Epoch::default(), 1, Outcome::empty(10));
        }

        cache.invalidate(tree_id, &[dropped]);

        assert!(cache.entries.contains_key(&(tree_id, kept)));
        assert!(!cache.entries.contains_key(&(tree_id, dropped)));
    }
}
