//! Push events emitted by [`crate::domain::services::tree_service::TreeService`]
//! onto the tree's broadcast channel.
//!
//! Emission is fire-and-forget: a lagging or absent subscriber never
//! blocks a mutation.

use crate::domain::models::ids::{NodeId, TreeId};
use serde::{Deserialize, Serialize};

/// Which way a node changed, carried alongside [`TreeEvent::NodeChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeChangeKind {
    Added,
    Updated,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TreeEvent {
    NodeChanged {
        tree_id: TreeId,
        node_id: NodeId,
        kind: NodeChangeKind,
    },
    CacheInvalidated {
        tree_id: TreeId,
        node_ids: Vec<NodeId>,
    },
    LECUpdated {
        tree_id: TreeId,
        node_id: NodeId,
    },
    ConnectionStatus {
        connected: bool,
    },
}

impl TreeEvent {
    pub fn tree_id(&self) -> Option<TreeId> {
        match self {
            TreeEvent::NodeChanged { tree_id, .. } => Some(*tree_id),
            TreeEvent::CacheInvalidated { tree_id, .. } => Some(*tree_id),
            TreeEvent::LECUpdated { tree_id, .. } => Some(*tree_id),
            TreeEvent::ConnectionStatus { .. } => None,
        }
    }
}
