//! `TreeIndex` / `RiskTree`: the parent/child adjacency derived from a flat
//! node set, and the tree that owns it.
//!
//! Parent pointers are stored as ids, not references. There is no owning
//! cyclic graph. The index is a derived map, rebuilt and validated whenever
//! the node set changes.

use crate::domain::errors::{ErrorCode, FieldError, ValidationErrors};
use crate::domain::models::ids::{NodeId, TreeId};
use crate::domain::models::node::RiskNode;
use crate::domain::models::primitives::{Epoch, Name};
use std::collections::{HashMap, HashSet};

/// Derived `{parents, children}` adjacency over a node set, with O(1)
/// parent lookup, O(depth) ancestor paths, and O(descendants) subtree
/// enumeration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeIndex {
    parents: HashMap<NodeId, NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
    root_id: Option<NodeId>,
}

impl TreeIndex {
    /// Builds and validates the index from a flat node set. Accumulates
    /// every violated topology rule rather than stopping at the first one.
    pub fn build(nodes: &HashMap<NodeId, RiskNode>) -> Result<TreeIndex, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut parents = HashMap::new();
        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for node in nodes.values() {
            if let Some(parent_id) = node.parent_id() {
                parents.insert(node.id(), parent_id);
            }
            if node.is_portfolio() {
                children.insert(node.id(), node.child_ids().to_vec());
            }
        }

        // Rule: every leaf/portfolio parent refers to an existing portfolio.
        for node in nodes.values() {
            if let Some(parent_id) = node.parent_id() {
                match nodes.get(&parent_id) {
                    None => errors.push(FieldError::new(
                        format!("node[{}].parentId", node.id()),
                        ErrorCode::MissingReference,
                        format!("parent {parent_id} does not exist"),
                    )),
                    Some(parent) if !parent.is_portfolio() => errors.push(FieldError::new(
                        format!("node[{}].parentId", node.id()),
                        ErrorCode::InvalidNodeType,
                        format!("parent {parent_id} must be a portfolio"),
                    )),
                    Some(_) => {}
                }
            }
        }

        // Rule: parent/child bidirectional consistency: children[p]
        // contains c iff parents[c] = p.
        for (&portfolio_id, child_ids) in &children {
            for &child_id in child_ids {
                match nodes.get(&child_id) {
                    None => errors.push(FieldError::new(
                        format!("node[{portfolio_id}].childIds"),
                        ErrorCode::MissingReference,
                        format!("child {child_id} does not exist"),
                    )),
                    Some(child) if child.parent_id() != Some(portfolio_id) => {
                        errors.push(FieldError::new(
                            format!("node[{portfolio_id}].childIds"),
                            ErrorCode::InvalidCombination,
                            format!(
                                "child {child_id} does not list {portfolio_id} as its parent"
                            ),
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        // Rule: exactly one root (a node with no parent). Prefer a
        // portfolio root when portfolios exist; a lone leaf is allowed
        // when no portfolios are present at all.
        let roots: Vec<NodeId> = nodes
            .values()
            .filter(|n| n.parent_id().is_none())
            .map(|n| n.id())
            .collect();
        let has_portfolios = nodes.values().any(|n| n.is_portfolio());

        let root_id = if nodes.is_empty() {
            errors.push(FieldError::new(
                "tree.nodes",
                ErrorCode::EmptyCollection,
                "a tree must contain at least one node",
            ));
            None
        } else if roots.is_empty() {
            errors.push(FieldError::new(
                "tree.rootId",
                ErrorCode::MissingReference,
                "no node without a parent was found",
            ));
            None
        } else if roots.len() > 1 {
            errors.push(FieldError::new(
                "request.portfolios",
                ErrorCode::AmbiguousReference,
                format!("{} nodes have no parent; exactly one root is required", roots.len()),
            ));
            None
        } else {
            let candidate = roots[0];
            if has_portfolios && !nodes[&candidate].is_portfolio() {
                errors.push(FieldError::new(
                    "tree.rootId",
                    ErrorCode::InvalidNodeType,
                    "root must be a portfolio when any portfolio exists",
                ));
                None
            } else {
                Some(candidate)
            }
        };

        // Rule: names unique across portfolios and leaves.
        let mut seen_names: HashMap<&str, NodeId> = HashMap::new();
        for node in nodes.values() {
            let name = node.name().as_str();
            if let Some(&existing) = seen_names.get(name) {
                errors.push(FieldError::new(
                    "request.names",
                    ErrorCode::AmbiguousReference,
                    format!("name '{name}' is used by both {existing} and {}", node.id()),
                ));
            } else {
                seen_names.insert(name, node.id());
            }
        }

        // Rule: no cycles. Every parent-walk terminates within node_count steps.
        for node in nodes.values() {
            let mut current = node.id();
            let mut steps = 0usize;
            let limit = nodes.len() + 1;
            loop {
                match parents.get(&current) {
                    None => break,
                    Some(&next) => {
                        current = next;
                        steps += 1;
                        if steps > limit {
                            errors.push(FieldError::new(
                                format!("node[{}]", node.id()),
                                ErrorCode::ConstraintViolation,
                                "cycle detected while walking to root",
                            ));
                            break;
                        }
                    }
                }
            }
        }

        errors.into_result(TreeIndex {
            parents,
            children,
            root_id,
        })
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `(n, parent, ..., root)` in O(depth).
    pub fn ancestor_path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.parents.get(&current) {
            path.push(*parent);
            current = *parent;
        }
        path
    }

    /// DFS subtree enumeration (does not include `id` itself).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_of(id).to_vec();
        let mut seen = HashSet::new();
        while let Some(next) = stack.pop() {
            if !seen.insert(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children_of(next).iter().copied());
        }
        out
    }

    pub fn leaf_ids<'a>(&'a self, nodes: &'a HashMap<NodeId, RiskNode>) -> Vec<NodeId> {
        nodes
            .values()
            .filter(|n| n.is_leaf())
            .map(|n| n.id())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskTree {
    pub id: TreeId,
    pub name: Name,
    pub epoch: Epoch,
    nodes: HashMap<NodeId, RiskNode>,
    index: TreeIndex,
}

impl RiskTree {
    /// Assembles and validates a full tree from a flat node set. A fresh
    /// index is constructed and validated before the tree is returned.
    /// This is the single choke point every mutation routes through.
    pub fn new(
        id: TreeId,
        name: Name,
        nodes: Vec<RiskNode>,
        epoch: Epoch,
    ) -> Result<RiskTree, ValidationErrors> {
        let nodes: HashMap<NodeId, RiskNode> = nodes.into_iter().map(|n| (n.id(), n)).collect();
        let index = TreeIndex::build(&nodes)?;
        Ok(RiskTree {
            id,
            name,
            epoch,
            nodes,
            index,
        })
    }

    pub fn root_id(&self) -> NodeId {
        self.index
            .root_id()
            .expect("a validated RiskTree always has a root")
    }

    pub fn node(&self, id: NodeId) -> Option<&RiskNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> &HashMap<NodeId, RiskNode> {
        &self.nodes
    }

    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    pub fn leaf_ids(&self) -> Vec<NodeId> {
        self.index.leaf_ids(&self.nodes)
    }

    /// Replaces the node set, re-validating and re-indexing, and bumping
    /// the epoch. This is the shape every mutation shares.
    pub fn with_nodes(
        &self,
        nodes: Vec<RiskNode>,
    ) -> Result<RiskTree, ValidationErrors> {
        RiskTree::new(self.id, self.name.clone(), nodes, self.epoch.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::distribution::Distribution;
    use crate::domain::models::node::{RiskLeaf, RiskPortfolio};

    fn name(s: &str) -> Name {
        Name::parse("name", s).unwrap()
    }

    fn leaf(id: NodeId, parent: NodeId, name_str: &str) -> RiskNode {
        RiskNode::Leaf(RiskLeaf {
            id,
            name: name(name_str),
            parent_id: Some(parent),
            distribution: Distribution::new_lognormal("leaf", 0.5, 1000, 10000).unwrap(),
        })
    }

    #[test]
    fn single_leaf_tree_is_valid_with_no_portfolios() {
        let root = NodeId::generate();
        let node = RiskNode::Leaf(RiskLeaf {
            id: root,
            name: name("lone-leaf"),
            parent_id: None,
            distribution: Distribution::new_lognormal("leaf", 0.5, 1000, 10000).unwrap(),
        });
        let tree = RiskTree::new(TreeId::generate(), name("tree"), vec![node], Epoch::default());
        assert!(tree.is_ok());
        assert_eq!(tree.unwrap().root_id(), root);
    }

    #[test]
    fn portfolio_with_two_leaves_builds_correct_index() {
        let root_id = NodeId::generate();
        let a = NodeId::generate();
        let b = NodeId::generate();
        let root = RiskNode::Portfolio(
            RiskPortfolio::new(root_id, name("root"), None, vec![a, b]).unwrap(),
        );
        let tree = RiskTree::new(
            TreeId::generate(),
            name("tree"),
            vec![root, leaf(a, root_id, "a"), leaf(b, root_id, "b")],
            Epoch::default(),
        )
        .unwrap();

        assert_eq!(tree.root_id(), root_id);
        assert_eq!(tree.index().children_of(root_id), &[a, b]);
        assert_eq!(tree.index().ancestor_path(a), vec![a, root_id]);
        let mut descendants = tree.index().descendants(root_id);
        descendants.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(descendants, expected);
    }

    #[test]
    fn rejects_duplicate_names() {
        let root_id = NodeId::generate();
        let a = NodeId::generate();
        let b = NodeId::generate();
        let root = RiskNode::Portfolio(
            RiskPortfolio::new(root_id, name("root"), None, vec![a, b]).unwrap(),
        );
        let result = RiskTree::new(
            TreeId::generate(),
            name("tree"),
            vec![root, leaf(a, root_id, "dup"), leaf(b, root_id, "dup")],
            Epoch::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_two_roots() {
        let a = NodeId::generate();
        let b = NodeId::generate();
        let node_a = RiskNode::Leaf(RiskLeaf {
            id: a,
            name: name("a"),
            parent_id: None,
            distribution: Distribution::new_lognormal("leaf", 0.5, 1000, 10000).unwrap(),
        });
        let node_b = RiskNode::Leaf(RiskLeaf {
            id: b,
            name: name("b"),
            parent_id: None,
            distribution: Distribution::new_lognormal("leaf", 0.5, 1000, 10000).unwrap(),
        });
        let result = RiskTree::new(TreeId::generate(), name("tree"), vec![node_a, node_b], Epoch::default());
        assert!(result.is_err());
    }

    #[test]
    fn rejects_leaf_parent_pointing_to_leaf() {
        let leaf_a = NodeId::generate();
        let leaf_b = NodeId::generate();
        let node_a = RiskNode::Leaf(RiskLeaf {
            id: leaf_a,
            name: name("a"),
            parent_id: None,
            distribution: Distribution::new_lognormal("leaf", 0.5, 1000, 10000).unwrap(),
        });
        let node_b = leaf(leaf_b, leaf_a, "b");
        let result = RiskTree::new(TreeId::generate(), name("tree"), vec![node_a, node_b], Epoch::default());
        assert!(result.is_err());
    }

    #[test]
    fn rejects_missing_parent_reference() {
        let phantom_parent = NodeId::generate();
        let child = NodeId::generate();
        let node = leaf(child, phantom_parent, "orphan");
        let result = RiskTree::new(TreeId::generate(), name("tree"), vec![node], Epoch::default());
        assert!(result.is_err());
    }

    #[test]
    fn with_nodes_bumps_epoch() {
        let root = NodeId::generate();
        let node = RiskNode::Leaf(RiskLeaf {
            id: root,
            name: name("lone-leaf"),
            parent_id: None,
            distribution: Distribution::new_lognormal("leaf", 0.5, 1000, 10000).unwrap(),
        });
        let tree = RiskTree::new(TreeId::generate(), name("tree"), vec![node.clone()], Epoch::default()).unwrap();
        let updated = tree.with_nodes(vec![node]).unwrap();
        assert_eq!(updated.epoch, Epoch(1));
    }
}
