pub mod cache;
pub mod curve_builder;
pub mod leaf_simulator;
pub mod prng;
pub mod repository;
pub mod sampler;
pub mod tree_service;
pub mod validator;

pub use cache::OutcomeCache;
pub use leaf_simulator::{simulate_leaf, SimulationParams};
pub use repository::{InMemoryTreeRepository, TreeRepository};
pub use tree_service::TreeService;
