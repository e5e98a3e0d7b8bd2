//! `TreeRepository`: the persistence seam. A durable backend is out of
//! this crate's scope. [`InMemoryTreeRepository`] is the only
//! implementation this crate ships; a transport crate that needs
//! durability provides its own.

use crate::domain::errors::EngineError;
use crate::domain::models::ids::TreeId;
use crate::domain::models::tree::RiskTree;
use async_trait::async_trait;
use dashmap::DashMap;

#[async_trait]
pub trait TreeRepository: Send + Sync {
    async fn insert(&self, tree: RiskTree) -> Result<(), EngineError>;
    async fn get(&self, tree_id: TreeId) -> Result<RiskTree, EngineError>;
    async fn list(&self) -> Vec<RiskTree>;
    async fn replace(&self, tree: RiskTree) -> Result<(), EngineError>;
    async fn remove(&self, tree_id: TreeId) -> Result<(), EngineError>;
}

#[derive(Default)]
pub struct InMemoryTreeRepository {
    trees: DashMap<TreeId, RiskTree>,
}

impl InMemoryTreeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TreeRepository for InMemoryTreeRepository {
    async fn insert(&self, tree: RiskTree) -> Result<(), EngineError> {
        let id = tree.id;
        if self.trees.contains_key(&id) {
            return Err(EngineError::Conflict { current_epoch: tree.epoch.0 });
        }
        self.trees.insert(id, tree);
        Ok(())
    }

    async fn get(&self, tree_id: TreeId) -> Result<RiskTree, EngineError> {
        self.trees
            .get(&tree_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::NotFound(format!("tree {tree_id}")))
    }

    async fn list(&self) -> Vec<RiskTree> {
        self.trees.iter().map(|entry| entry.value().clone()).collect()
    }

    async fn replace(&self, tree: RiskTree) -> Result<(), EngineError> {
        if !self.trees.contains_key(&tree.id) {
            return Err(EngineError::NotFound(format!("tree {}", tree.id)));
        }
        self.trees.insert(tree.id, tree);
        Ok(())
    }

    async fn remove(&self, tree_id: TreeId) -> Result<(), EngineError> {
        self.trees
            .remove(&tree_id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(format!("tree {tree_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ids::NodeId;
    use crate::domain::models::node::{RiskLeaf, RiskNode};
    use crate::domain::models::primitives::{Epoch, Name};

    fn sample_tree() -> RiskTree {
        let id = NodeId::generate();
        let node = RiskNode::Leaf(RiskLeaf {
            id,
            name: Name::parse("name", "leaf").unwrap(),
            parent_id: None,
            distribution: crate::domain::models::distribution::Distribution::new_lognormal("leaf", 0.5, 1000, 10000)
                .unwrap(),
        });
        RiskTree::new(TreeId::generate(), Name::parse("name", "tree").unwrap(), vec![node], Epoch::default()).unwrap()
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let repo = InMemoryTreeRepository::new();
        let tree = sample_tree();
        let id = tree.id;
        repo.insert(tree.clone()).await.unwrap();
        assert_eq!(repo.get(id).await.unwrap(), tree);
    }

    #[tokio::test]
    async fn insert_twice_conflicts() {
        let repo = InMemoryTreeRepository::new();
        let tree = sample_tree();
        repo.insert(tree.clone()).await.unwrap();
        assert!(repo.insert(tree).await.is_err());
    }

    #[tokio::test]
    async fn get_missing_tree_is_not_found() {
        let repo = InMemoryTreeRepository::new();
        assert!(repo.get(TreeId::generate()).await.is_err());
    }

    #[tokio::test]
    async fn replace_requires_existing_tree() {
        let repo = InMemoryTreeRepository::new();
        let tree = sample_tree();
        assert!(repo.replace(tree.clone()).await.is_err());
        repo.insert(tree.clone()).await.unwrap();
        let updated = tree.with_nodes(tree.nodes().values().cloned().collect()).unwrap();
        repo.replace(updated.clone()).await.unwrap();
        assert_eq!(repo.get(tree.id).await.unwrap().epoch, updated.epoch);
    }

    #[tokio::test]
    async fn remove_deletes_and_is_idempotent_on_error() {
        let repo = InMemoryTreeRepository::new();
        let tree = sample_tree();
        repo.insert(tree.clone()).await.unwrap();
        repo.remove(tree.id).await.unwrap();
        assert!(repo.get(tree.id).await.is_err());
        assert!(repo.remove(tree.id).await.is_err());
    }

    #[tokio::test]
    async fn list_returns_every_inserted_tree() {
        let repo = InMemoryTreeRepository::new();
        repo.insert(sample_tree()).await.unwrap();
        repo.insert(sample_tree()).await.unwrap();
        assert_eq!(repo.list().await.len(), 2);
    }
}
