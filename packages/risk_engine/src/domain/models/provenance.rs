//! `NodeProvenance` / `TreeProvenance`: enough detail to reproduce a
//! simulation's outcomes exactly, attached lazily to responses that ask
//! for it.

use crate::domain::models::distribution::Distribution;
use crate::domain::models::ids::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The PRNG stream ids and distribution snapshot that determined one
/// leaf's outcome map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProvenance {
    pub node_id: NodeId,
    pub entity_id: u64,
    pub occ_var_id: u64,
    pub loss_var_id: u64,
    pub global_seeds: (u64, u64),
    pub distribution: Distribution,
    pub timestamp: DateTime<Utc>,
}

/// Provenance for every simulated node of one resolved query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeProvenance {
    pub tree_id: crate::domain::models::ids::TreeId,
    pub global_seeds: (u64, u64),
    pub n_trials: u32,
    pub parallelism: u32,
    pub per_node: HashMap<NodeId, NodeProvenance>,
}

impl TreeProvenance {
    pub fn new(
        tree_id: crate::domain::models::ids::TreeId,
        global_seeds: (u64, u64),
        n_trials: u32,
        parallelism: u32,
    ) -> Self {
        TreeProvenance {
            tree_id,
            global_seeds,
            n_trials,
            parallelism,
            per_node: HashMap::new(),
        }
    }

    pub fn record(&mut self, provenance: NodeProvenance) {
        self.per_node.insert(provenance.node_id, provenance);
    }

    pub fn for_node(&self, id: NodeId) -> Option<&NodeProvenance> {
        self.per_node.get(&id)
    }
}
