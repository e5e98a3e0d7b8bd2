//! `RiskLeaf` / `RiskPortfolio` / `RiskNode`: the flat node types that make
//! up a [`super::tree::RiskTree`].

use crate::domain::errors::{ErrorCode, FieldError};
use crate::domain::models::distribution::Distribution;
use crate::domain::models::ids::NodeId;
use crate::domain::models::primitives::Name;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLeaf {
    pub id: NodeId,
    pub name: Name,
    pub parent_id: Option<NodeId>,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPortfolio {
    pub id: NodeId,
    pub name: Name,
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
}

impl RiskPortfolio {
    /// Constructs a portfolio, enforcing the non-empty-children invariant
    /// at the type boundary.
    pub fn new(
        id: NodeId,
        name: Name,
        parent_id: Option<NodeId>,
        child_ids: Vec<NodeId>,
    ) -> Result<Self, FieldError> {
        if child_ids.is_empty() {
            return Err(FieldError::new(
                format!("node[{id}].childIds"),
                ErrorCode::EmptyCollection,
                "a portfolio must have at least one child",
            ));
        }
        Ok(RiskPortfolio {
            id,
            name,
            parent_id,
            child_ids,
        })
    }
}

/// A tagged union over the two node shapes a `RiskTree` can hold.
/// Pattern-match exhaustively; do not model as a subclass hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType")]
pub enum RiskNode {
    Leaf(RiskLeaf),
    Portfolio(RiskPortfolio),
}

impl RiskNode {
    pub fn id(&self) -> NodeId {
        match self {
            RiskNode::Leaf(leaf) => leaf.id,
            RiskNode::Portfolio(portfolio) => portfolio.id,
        }
    }

    pub fn name(&self) -> &Name {
        match self {
            RiskNode::Leaf(leaf) => &leaf.name,
            RiskNode::Portfolio(portfolio) => &portfolio.name,
        }
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        match self {
            RiskNode::Leaf(leaf) => leaf.parent_id,
            RiskNode::Portfolio(portfolio) => portfolio.parent_id,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, RiskNode::Leaf(_))
    }

    pub fn is_portfolio(&self) -> bool {
        matches!(self, RiskNode::Portfolio(_))
    }

    pub fn child_ids(&self) -> &[NodeId] {
        match self {
            RiskNode::Leaf(_) => &[],
            RiskNode::Portfolio(portfolio) => &portfolio.child_ids,
        }
    }

    pub fn as_leaf(&self) -> Option<&RiskLeaf> {
        match self {
            RiskNode::Leaf(leaf) => Some(leaf),
            RiskNode::Portfolio(_) => None,
        }
    }

    pub fn as_portfolio(&self) -> Option<&RiskPortfolio> {
        match self {
            RiskNode::Leaf(_) => None,
            RiskNode::Portfolio(portfolio) => Some(portfolio),
        }
    }
}
