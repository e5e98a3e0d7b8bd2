pub mod curve;
pub mod distribution;
pub mod dto;
pub mod events;
pub mod ids;
pub mod node;
pub mod outcome;
pub mod primitives;
pub mod provenance;
pub mod tree;

pub use curve::{CurveBundle, LECPoint, Quantiles, TickDomain};
pub use distribution::{Distribution, DistributionParams, ExpertParams, LognormalParams};
pub use events::{NodeChangeKind, TreeEvent};
pub use ids::{NodeId, TreeId};
pub use node::{RiskLeaf, RiskNode, RiskPortfolio};
pub use outcome::Outcome;
pub use primitives::{Epoch, Loss, Name, Probability};
pub use provenance::{NodeProvenance, TreeProvenance};
pub use tree::{RiskTree, TreeIndex};
