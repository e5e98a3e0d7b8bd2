//! `TreeService`: the public facade over CRUD, LEC queries, and the event
//! stream. Orchestrates validation, the repository, the outcome cache,
//! and event emission. This is the single entry point an embedding
//! transport crate talks to.

use crate::config::EngineConfig;
use crate::domain::errors::{EngineError, EngineResult, ErrorCode, FieldError};
use crate::domain::models::curve::{CurveBundle, TickDomain};
use crate::domain::models::dto::{
    CreateTreeRequest, LecCurveResponse, LecPointDto, PatchDistributionRequest, RenameNodeRequest, UpdateTreeRequest,
};
use crate::domain::models::events::{NodeChangeKind, TreeEvent};
use crate::domain::models::ids::{NodeId, TreeId};
use crate::domain::models::node::RiskNode;
use crate::domain::models::outcome::Outcome;
use crate::domain::models::primitives::Loss;
use crate::domain::models::provenance::{NodeProvenance, TreeProvenance};
use crate::domain::models::tree::RiskTree;
use crate::domain::services::cache::OutcomeCache;
use crate::domain::services::curve_builder;
use crate::domain::services::leaf_simulator::{self, SimulationParams};
use crate::domain::services::prng;
use crate::domain::services::repository::TreeRepository;
use crate::domain::services::validator;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub struct TreeService {
    repository: Arc<dyn TreeRepository>,
    cache: OutcomeCache,
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
    events: broadcast::Sender<TreeEvent>,
}

impl TreeService {
    pub fn new(repository: Arc<dyn TreeRepository>, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        TreeService {
            repository,
            cache: OutcomeCache::new(),
            config,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_simulations as usize)),
            events,
        }
    }

    /// The process-wide event stream: `NodeChanged`, `CacheInvalidated`,
    /// `LECUpdated`, `ConnectionStatus`. Emission never blocks on a
    /// lagging or absent subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: TreeEvent) {
        let _ = self.events.send(event);
    }

    fn default_params(&self) -> SimulationParams {
        SimulationParams {
            n_trials: self.config.default_n_trials,
            seed3: self.config.default_seed3,
            seed4: self.config.default_seed4,
        }
    }

    /// `createTree`.
    pub async fn create_tree(&self, req: CreateTreeRequest) -> EngineResult<RiskTree> {
        let tree_id = TreeId::generate();
        let tree = validator::validate_create_tree(tree_id, req).map_err(|e| EngineError::validation(e.into_vec()))?;
        self.repository.insert(tree.clone()).await?;
        tracing::info!(tree_id = %tree_id, node_count = tree.nodes().len(), "tree created");
        for node in tree.nodes().values() {
            self.emit(TreeEvent::NodeChanged { tree_id, node_id: node.id(), kind: NodeChangeKind::Added });
        }
        Ok(tree)
    }

    pub async fn get_tree(&self, tree_id: TreeId) -> EngineResult<RiskTree> {
        self.repository.get(tree_id).await
    }

    pub async fn list_trees(&self) -> Vec<RiskTree> {
        self.repository.list().await
    }

    /// `updateTree` (full PUT). Diffs the old and new node sets to emit
    /// one `NodeChanged` per added/updated/removed node, then invalidates
    /// the cache for every node either set touched.
    pub async fn update_tree(&self, tree_id: TreeId, req: UpdateTreeRequest) -> EngineResult<RiskTree> {
        let current = self.repository.get(tree_id).await?;
        let updated =
            validator::validate_update_tree(&current, req).map_err(|e| EngineError::validation(e.into_vec()))?;
        self.repository.replace(updated.clone()).await?;

        let old_ids: HashSet<NodeId> = current.nodes().keys().copied().collect();
        let new_ids: HashSet<NodeId> = updated.nodes().keys().copied().collect();

        for &id in new_ids.difference(&old_ids) {
            self.emit(TreeEvent::NodeChanged { tree_id, node_id: id, kind: NodeChangeKind::Added });
        }
        for &id in old_ids.intersection(&new_ids) {
            if current.node(id) != updated.node(id) {
                self.emit(TreeEvent::NodeChanged { tree_id, node_id: id, kind: NodeChangeKind::Updated });
            }
        }
        for &id in old_ids.difference(&new_ids) {
            self.emit(TreeEvent::NodeChanged { tree_id, node_id: id, kind: NodeChangeKind::Removed });
        }

        let touched: Vec<NodeId> = old_ids.union(&new_ids).copied().collect();
        tracing::debug!(tree_id = %tree_id, touched = touched.len(), "invalidating cache after full update");
        self.cache.invalidate(tree_id, &touched);
        self.emit(TreeEvent::CacheInvalidated { tree_id, node_ids: touched.clone() });
        for node_id in touched {
            self.emit(TreeEvent::LECUpdated { tree_id, node_id });
        }

        Ok(updated)
    }

    /// `patchDistribution`.
    pub async fn patch_distribution(
        &self,
        tree_id: TreeId,
        node_id: NodeId,
        req: PatchDistributionRequest,
    ) -> EngineResult<RiskTree> {
        let tree = self.repository.get(tree_id).await?;
        let updated = validator::validate_patch_distribution(&tree, node_id, req)
            .map_err(|e| EngineError::validation(e.into_vec()))?;
        self.repository.replace(updated.clone()).await?;

        let ancestors = updated.index().ancestor_path(node_id);
        tracing::info!(tree_id = %tree_id, node_id = %node_id, ancestors = ancestors.len(), "distribution patched, ancestor path invalidated");
        self.cache.invalidate(tree_id, &ancestors);
        self.emit(TreeEvent::NodeChanged { tree_id, node_id, kind: NodeChangeKind::Updated });
        self.emit(TreeEvent::CacheInvalidated { tree_id, node_ids: ancestors.clone() });
        for &ancestor_id in &ancestors {
            self.emit(TreeEvent::LECUpdated { tree_id, node_id: ancestor_id });
        }
        Ok(updated)
    }

    /// `renameNode`.
    pub async fn rename_node(
        &self,
        tree_id: TreeId,
        node_id: NodeId,
        req: RenameNodeRequest,
    ) -> EngineResult<RiskTree> {
        let tree = self.repository.get(tree_id).await?;
        let updated =
            validator::validate_rename(&tree, node_id, req).map_err(|e| EngineError::validation(e.into_vec()))?;
        self.repository.replace(updated.clone()).await?;
        self.emit(TreeEvent::NodeChanged { tree_id, node_id, kind: NodeChangeKind::Updated });
        Ok(updated)
    }

    /// `deleteNode`: rejects the root and the only child of a portfolio;
    /// a portfolio's subtree is deleted with it.
    pub async fn delete_node(&self, tree_id: TreeId, node_id: NodeId) -> EngineResult<RiskTree> {
        let tree = self.repository.get(tree_id).await?;
        if node_id == tree.root_id() {
            return Err(EngineError::OperationNotAllowed("cannot delete the root node".to_string()));
        }
        let node = tree
            .node(node_id)
            .ok_or_else(|| EngineError::NotFound(format!("node {node_id}")))?;
        let parent_id = node.parent_id().expect("a non-root node always has a parent");
        if tree.index().children_of(parent_id).len() <= 1 {
            return Err(EngineError::OperationNotAllowed(format!(
                "{node_id} is the only child of portfolio {parent_id}"
            )));
        }

        let mut removed: HashSet<NodeId> = tree.index().descendants(node_id).into_iter().collect();
        removed.insert(node_id);

        let nodes: Vec<RiskNode> = tree
            .nodes()
            .values()
            .filter(|n| !removed.contains(&n.id()))
            .cloned()
            .map(|n| match n {
                RiskNode::Portfolio(mut portfolio) if portfolio.id == parent_id => {
                    portfolio.child_ids.retain(|&child| child != node_id);
                    RiskNode::Portfolio(portfolio)
                }
                other => other,
            })
            .collect();

        let updated = tree.with_nodes(nodes).map_err(|e| EngineError::validation(e.into_vec()))?;
        self.repository.replace(updated.clone()).await?;

        for &id in &removed {
            self.emit(TreeEvent::NodeChanged { tree_id, node_id: id, kind: NodeChangeKind::Removed });
        }
        self.emit(TreeEvent::NodeChanged { tree_id, node_id: parent_id, kind: NodeChangeKind::Updated });

        let ancestors = updated.index().ancestor_path(parent_id);
        tracing::info!(tree_id = %tree_id, node_id = %node_id, removed = removed.len(), "node deleted, ancestor path invalidated");
        self.cache.invalidate(tree_id, &ancestors);
        self.emit(TreeEvent::CacheInvalidated { tree_id, node_ids: ancestors.clone() });
        for &node_id in &ancestors {
            self.emit(TreeEvent::LECUpdated { tree_id, node_id });
        }

        Ok(updated)
    }

    pub async fn delete_tree(&self, tree_id: TreeId) -> EngineResult<()> {
        self.repository.remove(tree_id).await
    }

    /// Resolves a node's simulated outcome, recursing through portfolio
    /// children and memoizing per `(tree, node, fingerprint)`. Direct
    /// recursion through `async fn` is not expressible in Rust, so the
    /// future is boxed by hand.
    ///
    /// The simulation permit is acquired only around the leaf-level
    /// simulation, not held across the recursive calls for a portfolio's
    /// children. Holding it through the whole subtree would let a deep
    /// tree exhaust `maxConcurrentSimulations` against itself.
    fn resolve_outcome<'a>(
        &'a self,
        tree: &'a RiskTree,
        node_id: NodeId,
        params: SimulationParams,
    ) -> Pin<Box<dyn Future<Output = EngineResult<Outcome>> + Send + 'a>> {
        Box::pin(async move {
            let fingerprint = prng::fingerprint(params.n_trials, params.seed3, params.seed4);
            let lock = self.cache.lock_for(tree.id, node_id);
            let mut slot = lock.lock().await;
            if let Some(outcome) = OutcomeCache::hit(&slot, tree.epoch, fingerprint) {
                tracing::debug!(tree_id = %tree.id, node_id = %node_id, "outcome cache hit");
                return Ok(outcome);
            }

            let node = tree
                .node(node_id)
                .ok_or_else(|| EngineError::NotFound(format!("node {node_id}")))?;

            let outcome = match node {
                RiskNode::Leaf(leaf) => {
                    let _permit = self.semaphore.acquire().await.map_err(|_| EngineError::Cancelled)?;
                    tracing::debug!(tree_id = %tree.id, node_id = %node_id, n_trials = params.n_trials, "simulating leaf");
                    leaf_simulator::simulate_leaf(leaf, params).map_err(|e| EngineError::validation(vec![e]))?
                }
                RiskNode::Portfolio(portfolio) => {
                    let mut children = Vec::with_capacity(portfolio.child_ids.len());
                    for &child_id in &portfolio.child_ids {
                        children.push(self.resolve_outcome(tree, child_id, params).await?);
                    }
                    Outcome::combine_all(params.n_trials, &children)?
                }
            };

            OutcomeCache::store(&mut slot, tree.epoch, fingerprint, outcome.clone());
            Ok(outcome)
        })
    }

    fn build_provenance(&self, tree: &RiskTree, node_id: NodeId, params: SimulationParams) -> TreeProvenance {
        let mut provenance =
            TreeProvenance::new(tree.id, (params.seed3, params.seed4), params.n_trials, self.config.default_trial_parallelism);

        let leaf_ids: Vec<NodeId> = match tree.node(node_id) {
            Some(node) if node.is_leaf() => vec![node_id],
            _ => tree
                .index()
                .descendants(node_id)
                .into_iter()
                .filter(|&id| tree.node(id).map(RiskNode::is_leaf).unwrap_or(false))
                .collect(),
        };

        for leaf_id in leaf_ids {
            if let Some(RiskNode::Leaf(leaf)) = tree.node(leaf_id) {
                let (entity_id, occ_var_id, loss_var_id) = prng::derive_streams(&leaf_id.to_string());
                provenance.record(NodeProvenance {
                    node_id: leaf_id,
                    entity_id,
                    occ_var_id,
                    loss_var_id,
                    global_seeds: (params.seed3, params.seed4),
                    distribution: leaf.distribution.clone(),
                    timestamp: chrono::Utc::now(),
                });
            }
        }
        provenance
    }

    /// `getLECCurve`.
    pub async fn get_lec_curve(
        &self,
        tree_id: TreeId,
        node_id: NodeId,
        ticks: Option<Vec<f64>>,
        include_provenance: bool,
    ) -> EngineResult<LecCurveResponse> {
        let tree = self.repository.get(tree_id).await?;
        let node = tree
            .node(node_id)
            .ok_or_else(|| EngineError::NotFound(format!("node {node_id}")))?
            .clone();

        let params = self.default_params();
        let outcome = self.resolve_outcome(&tree, node_id, params).await?;

        let domain = match ticks {
            Some(t) => TickDomain::new("ticks", t).map_err(|e| EngineError::validation(vec![e]))?,
            None => TickDomain::standard(),
        };
        let losses = curve_builder::build_curve(&outcome, &domain);
        let quantiles = curve_builder::extract_quantiles(&outcome);

        let mut bundle = CurveBundle::empty(domain);
        bundle.insert(node_id, losses);
        let points = bundle.points_for(node_id).expect("just inserted above");

        let provenances = include_provenance.then(|| self.build_provenance(&tree, node_id, params));

        Ok(LecCurveResponse {
            id: node_id,
            name: node.name().to_string(),
            curve: points.into_iter().map(LecPointDto::from).collect(),
            quantiles: quantiles.into(),
            child_ids: (!node.child_ids().is_empty()).then(|| node.child_ids().to_vec()),
            provenances,
        })
    }

    /// `getLECCurvesMulti`: each node's curve on its own simulation,
    /// aligned onto the union of the requested domain.
    pub async fn get_lec_curves_multi(
        &self,
        tree_id: TreeId,
        node_ids: Vec<NodeId>,
        ticks: Option<Vec<f64>>,
    ) -> EngineResult<CurveBundle> {
        if node_ids.is_empty() {
            return Err(EngineError::validation(vec![FieldError::new(
                "nodeIds",
                ErrorCode::EmptyCollection,
                "at least one node id is required",
            )]));
        }
        let tree = self.repository.get(tree_id).await?;
        let domain = match ticks {
            Some(t) => TickDomain::new("ticks", t).map_err(|e| EngineError::validation(vec![e]))?,
            None => TickDomain::standard(),
        };
        let params = self.default_params();

        let mut curves = Vec::with_capacity(node_ids.len());
        for node_id in node_ids {
            tree.node(node_id)
                .ok_or_else(|| EngineError::NotFound(format!("node {node_id}")))?;
            let outcome = self.resolve_outcome(&tree, node_id, params).await?;
            let losses = curve_builder::build_curve(&outcome, &domain);
            curves.push((node_id, domain.clone(), losses));
        }
        Ok(curve_builder::align_curves(curves))
    }

    /// `probOfExceedance`.
    pub async fn prob_of_exceedance(&self, tree_id: TreeId, node_id: NodeId, threshold: Loss) -> EngineResult<f64> {
        let tree = self.repository.get(tree_id).await?;
        tree.node(node_id)
            .ok_or_else(|| EngineError::NotFound(format!("node {node_id}")))?;
        let params = self.default_params();
        let outcome = self.resolve_outcome(&tree, node_id, params).await?;
        Ok(curve_builder::prob_of_exceedance(&outcome, threshold))
    }
}
