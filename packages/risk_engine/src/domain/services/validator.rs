//! DTO resolution and validation: turns wire-shaped requests into a
//! validated `RiskTree`, accumulating every violated rule instead of
//! stopping at the first one.

use crate::domain::errors::{ErrorCode, FieldError, ValidationErrors};
use crate::domain::models::distribution::{Distribution, METALOG_DEFAULT_TERMS};
use crate::domain::models::dto::{
    CreateTreeRequest, DistributionDto, PatchDistributionRequest, RenameNodeRequest, UpdateTreeRequest,
};
use crate::domain::models::ids::NodeId;
use crate::domain::models::node::{RiskLeaf, RiskNode, RiskPortfolio};
use crate::domain::models::primitives::Name;
use crate::domain::models::tree::RiskTree;
use std::collections::HashMap;

pub fn parse_distribution(field_prefix: &str, dto: &DistributionDto) -> Result<Distribution, FieldError> {
    match dto {
        DistributionDto::Lognormal { probability, min_loss, max_loss } => {
            Distribution::new_lognormal(field_prefix, *probability, *min_loss, *max_loss)
        }
        DistributionDto::Expert { probability, percentiles, quantiles, terms } => Distribution::new_expert(
            field_prefix,
            *probability,
            percentiles.clone(),
            quantiles.clone(),
            terms.unwrap_or(METALOG_DEFAULT_TERMS),
        ),
    }
}

fn resolve_parent(
    name_to_id: &HashMap<String, NodeId>,
    parent_name: &Option<String>,
    errors: &mut ValidationErrors,
    field: &str,
) -> Option<NodeId> {
    let raw = parent_name.as_ref()?;
    match name_to_id.get(raw.trim()) {
        Some(&id) => Some(id),
        None => {
            errors.push(FieldError::new(
                field,
                ErrorCode::MissingReference,
                format!("parent '{raw}' does not match any node name in this request"),
            ));
            None
        }
    }
}

struct PendingPortfolio {
    id: NodeId,
    name: Option<Name>,
    parent_name: Option<String>,
}

struct PendingLeaf {
    id: NodeId,
    name: Option<Name>,
    parent_name: Option<String>,
    distribution: Option<Distribution>,
}

/// `createTree`: allocates a fresh `NodeId` for every node, resolves
/// `parentName` references within the request, and assembles and
/// validates the full tree.
pub fn validate_create_tree(tree_id: crate::domain::models::ids::TreeId, req: CreateTreeRequest) -> Result<RiskTree, ValidationErrors> {
    use crate::domain::models::primitives::Epoch;

    let mut errors = ValidationErrors::new();
    let name = errors.push_if_err(Name::parse("name", req.name));

    let mut name_to_id: HashMap<String, NodeId> = HashMap::new();

    let portfolios: Vec<PendingPortfolio> = req
        .portfolios
        .into_iter()
        .map(|p| {
            let id = NodeId::generate();
            let parsed_name = errors.push_if_err(Name::parse("portfolios[].name", p.name));
            if let Some(n) = &parsed_name {
                name_to_id.insert(n.as_str().to_string(), id);
            }
            PendingPortfolio { id, name: parsed_name, parent_name: p.parent_name }
        })
        .collect();

    let leaves: Vec<PendingLeaf> = req
        .leaves
        .into_iter()
        .map(|l| {
            let id = NodeId::generate();
            let parsed_name = errors.push_if_err(Name::parse("leaves[].name", l.name));
            if let Some(n) = &parsed_name {
                name_to_id.insert(n.as_str().to_string(), id);
            }
            let distribution = errors.push_if_err(parse_distribution("leaves[].distribution", &l.distribution));
            PendingLeaf { id, name: parsed_name, parent_name: l.parent_name, distribution }
        })
        .collect();

    let mut children_of: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let portfolio_parents: Vec<Option<NodeId>> = portfolios
        .iter()
        .map(|p| {
            let parent_id = resolve_parent(&name_to_id, &p.parent_name, &mut errors, "portfolios[].parentName");
            if let Some(pid) = parent_id {
                children_of.entry(pid).or_default().push(p.id);
            }
            parent_id
        })
        .collect();
    let leaf_parents: Vec<Option<NodeId>> = leaves
        .iter()
        .map(|l| {
            let parent_id = resolve_parent(&name_to_id, &l.parent_name, &mut errors, "leaves[].parentName");
            if let Some(pid) = parent_id {
                children_of.entry(pid).or_default().push(l.id);
            }
            parent_id
        })
        .collect();

    let mut nodes = Vec::with_capacity(portfolios.len() + leaves.len());
    for (portfolio, parent_id) in portfolios.iter().zip(portfolio_parents) {
        if let Some(name) = &portfolio.name {
            let child_ids = children_of.remove(&portfolio.id).unwrap_or_default();
            match RiskPortfolio::new(portfolio.id, name.clone(), parent_id, child_ids) {
                Ok(p) => nodes.push(RiskNode::Portfolio(p)),
                Err(e) => errors.push(e),
            }
        }
    }
    for (leaf, parent_id) in leaves.iter().zip(leaf_parents) {
        if let (Some(name), Some(distribution)) = (&leaf.name, &leaf.distribution) {
            nodes.push(RiskNode::Leaf(RiskLeaf {
                id: leaf.id,
                name: name.clone(),
                parent_id,
                distribution: distribution.clone(),
            }));
        }
    }

    let name = match name {
        Some(n) => n,
        None => return Err(errors),
    };
    if !errors.is_empty() {
        return Err(errors);
    }

    RiskTree::new(tree_id, name, nodes, Epoch::default()).map_err(|mut tree_errors| {
        tree_errors.merge(errors);
        tree_errors
    })
}

/// `updateTree` (full PUT): resolves a mix of existing (identified by id)
/// and new (allocated server-side) nodes, then re-validates the combined
/// topology. A portfolio omitted from the request, or left with no
/// remaining children, is rejected by `RiskPortfolio::new`'s
/// non-empty-children invariant when the combined set is assembled.
pub fn validate_update_tree(tree: &RiskTree, req: UpdateTreeRequest) -> Result<RiskTree, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = errors.push_if_err(Name::parse("name", req.name));

    let mut name_to_id: HashMap<String, NodeId> = HashMap::new();
    let mut portfolios = Vec::new();

    for p in req.existing_portfolios {
        let id = match NodeId::parse(&p.id) {
            Ok(id) => id,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        let parsed_name = errors.push_if_err(Name::parse("existingPortfolios[].name", p.name));
        if let Some(n) = &parsed_name {
            name_to_id.insert(n.as_str().to_string(), id);
        }
        portfolios.push(PendingPortfolio { id, name: parsed_name, parent_name: p.parent_name });
    }
    for p in req.new_portfolios {
        let id = NodeId::generate();
        let parsed_name = errors.push_if_err(Name::parse("newPortfolios[].name", p.name));
        if let Some(n) = &parsed_name {
            name_to_id.insert(n.as_str().to_string(), id);
        }
        portfolios.push(PendingPortfolio { id, name: parsed_name, parent_name: p.parent_name });
    }

    let mut leaves = Vec::new();
    for l in req.existing_leaves {
        let id = match NodeId::parse(&l.id) {
            Ok(id) => id,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        let parsed_name = errors.push_if_err(Name::parse("existingLeaves[].name", l.name));
        if let Some(n) = &parsed_name {
            name_to_id.insert(n.as_str().to_string(), id);
        }
        let distribution = errors.push_if_err(parse_distribution("existingLeaves[].distribution", &l.distribution));
        leaves.push(PendingLeaf { id, name: parsed_name, parent_name: l.parent_name, distribution });
    }
    for l in req.new_leaves {
        let id = NodeId::generate();
        let parsed_name = errors.push_if_err(Name::parse("newLeaves[].name", l.name));
        if let Some(n) = &parsed_name {
            name_to_id.insert(n.as_str().to_string(), id);
        }
        let distribution = errors.push_if_err(parse_distribution("newLeaves[].distribution", &l.distribution));
        leaves.push(PendingLeaf { id, name: parsed_name, parent_name: l.parent_name, distribution });
    }

    let mut children_of: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let portfolio_parents: Vec<Option<NodeId>> = portfolios
        .iter()
        .map(|p| {
            let parent_id = resolve_parent(&name_to_id, &p.parent_name, &mut errors, "portfolios[].parentName");
            if let Some(pid) = parent_id {
                children_of.entry(pid).or_default().push(p.id);
            }
            parent_id
        })
        .collect();
    let leaf_parents: Vec<Option<NodeId>> = leaves
        .iter()
        .map(|l| {
            let parent_id = resolve_parent(&name_to_id, &l.parent_name, &mut errors, "leaves[].parentName");
            if let Some(pid) = parent_id {
                children_of.entry(pid).or_default().push(l.id);
            }
            parent_id
        })
        .collect();

    let mut nodes = Vec::with_capacity(portfolios.len() + leaves.len());
    for (portfolio, parent_id) in portfolios.iter().zip(portfolio_parents) {
        if let Some(name) = &portfolio.name {
            let child_ids = children_of.remove(&portfolio.id).unwrap_or_default();
            match RiskPortfolio::new(portfolio.id, name.clone(), parent_id, child_ids) {
                Ok(p) => nodes.push(RiskNode::Portfolio(p)),
                Err(e) => errors.push(e),
            }
        }
    }
    for (leaf, parent_id) in leaves.iter().zip(leaf_parents) {
        if let (Some(name), Some(distribution)) = (&leaf.name, &leaf.distribution) {
            nodes.push(RiskNode::Leaf(RiskLeaf {
                id: leaf.id,
                name: name.clone(),
                parent_id,
                distribution: distribution.clone(),
            }));
        }
    }

    if name.is_none() || !errors.is_empty() {
        return Err(errors);
    }

    tree.with_nodes(nodes).map_err(|mut tree_errors| {
        tree_errors.merge(errors);
        tree_errors
    })
}

/// Renames one node in place, re-validating uniqueness over the combined
/// set.
pub fn validate_rename(tree: &RiskTree, node_id: NodeId, req: RenameNodeRequest) -> Result<RiskTree, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = errors.push_if_err(Name::parse("name", req.name));

    if !tree.nodes().contains_key(&node_id) {
        errors.push(FieldError::new(
            "nodeId",
            ErrorCode::MissingReference,
            format!("node {node_id} does not exist in this tree"),
        ));
    }
    let name = match name {
        Some(n) if errors.is_empty() => n,
        _ => return Err(errors),
    };

    let nodes: Vec<RiskNode> = tree
        .nodes()
        .values()
        .cloned()
        .map(|node| {
            if node.id() != node_id {
                return node;
            }
            match node {
                RiskNode::Leaf(mut leaf) => {
                    leaf.name = name.clone();
                    RiskNode::Leaf(leaf)
                }
                RiskNode::Portfolio(mut portfolio) => {
                    portfolio.name = name.clone();
                    RiskNode::Portfolio(portfolio)
                }
            }
        })
        .collect();

    tree.with_nodes(nodes)
}

/// Replaces a leaf's distribution, leaving the rest of the tree untouched.
/// Rejects a target that is a portfolio, since only leaves carry a
/// distribution.
pub fn validate_patch_distribution(
    tree: &RiskTree,
    node_id: NodeId,
    req: PatchDistributionRequest,
) -> Result<RiskTree, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let distribution = errors.push_if_err(parse_distribution("distribution", &req.distribution));

    match tree.node(node_id) {
        None => errors.push(FieldError::new(
            "nodeId",
            ErrorCode::MissingReference,
            format!("node {node_id} does not exist in this tree"),
        )),
        Some(RiskNode::Portfolio(_)) => errors.push(FieldError::new(
            "nodeId",
            ErrorCode::InvalidNodeType,
            "a distribution can only be patched on a leaf",
        )),
        Some(RiskNode::Leaf(_)) => {}
    }

    let distribution = match distribution {
        Some(d) if errors.is_empty() => d,
        _ => return Err(errors),
    };

    let nodes: Vec<RiskNode> = tree
        .nodes()
        .values()
        .cloned()
        .map(|node| match node {
            RiskNode::Leaf(mut leaf) if leaf.id == node_id => {
                leaf.distribution = distribution.clone();
                RiskNode::Leaf(leaf)
            }
            other => other,
        })
        .collect();

    tree.with_nodes(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::dto::{CreateTreeRequest, NewLeafDto, NewPortfolioDto};
    use crate::domain::models::ids::TreeId;

    fn lognormal_dto() -> DistributionDto {
        DistributionDto::Lognormal { probability: 0.5, min_loss: 1000, max_loss: 10000 }
    }

    #[test]
    fn create_tree_resolves_parent_names_into_a_valid_tree() {
        let req = CreateTreeRequest {
            name: "portfolio".to_string(),
            portfolios: vec![NewPortfolioDto { name: "root".to_string(), parent_name: None }],
            leaves: vec![NewLeafDto {
                name: "fire".to_string(),
                parent_name: Some("root".to_string()),
                distribution: lognormal_dto(),
            }],
        };
        let tree = validate_create_tree(TreeId::generate(), req).unwrap();
        assert_eq!(tree.leaf_ids().len(), 1);
        assert_eq!(tree.index().children_of(tree.root_id()).len(), 1);
    }

    #[test]
    fn create_tree_rejects_unresolvable_parent_name() {
        let req = CreateTreeRequest {
            name: "portfolio".to_string(),
            portfolios: vec![],
            leaves: vec![NewLeafDto {
                name: "fire".to_string(),
                parent_name: Some("ghost".to_string()),
                distribution: lognormal_dto(),
            }],
        };
        let err = validate_create_tree(TreeId::generate(), req).unwrap_err();
        assert!(err.as_slice().iter().any(|e| e.code == ErrorCode::MissingReference));
    }

    #[test]
    fn create_tree_accumulates_multiple_errors_without_short_circuiting() {
        let req = CreateTreeRequest {
            name: "".to_string(),
            portfolios: vec![],
            leaves: vec![NewLeafDto {
                name: "".to_string(),
                parent_name: None,
                distribution: DistributionDto::Lognormal { probability: 2.0, min_loss: 10, max_loss: 5 },
            }],
        };
        let err = validate_create_tree(TreeId::generate(), req).unwrap_err();
        assert!(err.len() >= 2);
    }

    #[test]
    fn patch_distribution_rejects_portfolio_target() {
        let req = CreateTreeRequest {
            name: "portfolio".to_string(),
            portfolios: vec![NewPortfolioDto { name: "root".to_string(), parent_name: None }],
            leaves: vec![NewLeafDto {
                name: "fire".to_string(),
                parent_name: Some("root".to_string()),
                distribution: lognormal_dto(),
            }],
        };
        let tree = validate_create_tree(TreeId::generate(), req).unwrap();
        let root_id = tree.root_id();
        let patch = PatchDistributionRequest { distribution: lognormal_dto() };
        let err = validate_patch_distribution(&tree, root_id, patch).unwrap_err();
        assert!(err.as_slice().iter().any(|e| e.code == ErrorCode::InvalidNodeType));
    }

    #[test]
    fn patch_distribution_replaces_only_the_target_leaf() {
        let req = CreateTreeRequest {
            name: "portfolio".to_string(),
            portfolios: vec![NewPortfolioDto { name: "root".to_string(), parent_name: None }],
            leaves: vec![NewLeafDto {
                name: "fire".to_string(),
                parent_name: Some("root".to_string()),
                distribution: lognormal_dto(),
            }],
        };
        let tree = validate_create_tree(TreeId::generate(), req).unwrap();
        let leaf_id = tree.leaf_ids()[0];
        let new_distribution = DistributionDto::Lognormal { probability: 0.9, min_loss: 500, max_loss: 90_000 };
        let updated = validate_patch_distribution(&tree, leaf_id, PatchDistributionRequest { distribution: new_distribution }).unwrap();
        assert_eq!(updated.epoch, tree.epoch.next());
        let RiskNode::Leaf(leaf) = updated.node(leaf_id).unwrap() else {
            panic!("expected a leaf");
        };
        assert_eq!(leaf.distribution.occurrence_probability.get(), 0.9);
    }

    #[test]
    fn rename_rejects_unknown_node() {
        let req = CreateTreeRequest {
            name: "portfolio".to_string(),
            portfolios: vec![],
            leaves: vec![NewLeafDto { name: "fire".to_string(), parent_name: None, distribution: lognormal_dto() }],
        };
        let tree = validate_create_tree(TreeId::generate(), req).unwrap();
        let err = validate_rename(&tree, NodeId::generate(), RenameNodeRequest { name: "flood".to_string() }).unwrap_err();
        assert!(err.as_slice().iter().any(|e| e.code == ErrorCode::MissingReference));
    }
}
