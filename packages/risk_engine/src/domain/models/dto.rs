//! Wire-shaped request/response DTOs for the external interface.
//!
//! DTOs carry raw, unrefined fields (plain `String`/`f64`/`u64`, names
//! instead of ids where the wire protocol resolves by name). The
//! validator is what turns these into domain types.

use crate::domain::models::curve::{LECPoint, Quantiles};
use crate::domain::models::ids::NodeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DistributionDto {
    Lognormal {
        probability: f64,
        min_loss: u64,
        max_loss: u64,
    },
    Expert {
        probability: f64,
        percentiles: Vec<f64>,
        quantiles: Vec<u64>,
        terms: Option<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPortfolioDto {
    pub name: String,
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLeafDto {
    pub name: String,
    pub parent_name: Option<String>,
    pub distribution: DistributionDto,
}

/// `createTree` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTreeRequest {
    pub name: String,
    pub portfolios: Vec<NewPortfolioDto>,
    pub leaves: Vec<NewLeafDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingPortfolioDto {
    pub id: String,
    pub name: String,
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingLeafDto {
    pub id: String,
    pub name: String,
    pub parent_name: Option<String>,
    pub distribution: DistributionDto,
}

/// `updateTree` request: a full-PUT mix of existing and new nodes. Nodes
/// omitted from both existing lists are candidates for deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTreeRequest {
    pub name: String,
    pub existing_portfolios: Vec<ExistingPortfolioDto>,
    pub existing_leaves: Vec<ExistingLeafDto>,
    pub new_portfolios: Vec<NewPortfolioDto>,
    pub new_leaves: Vec<NewLeafDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchDistributionRequest {
    pub distribution: DistributionDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameNodeRequest {
    pub name: String,
}

/// Query parameters shared by `getLECCurve` / `getLECCurvesMulti`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LecQuery {
    pub ticks: Option<Vec<f64>>,
    pub include_provenance: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LecPointDto {
    pub loss: u64,
    pub exceedance: f64,
}

impl From<LECPoint> for LecPointDto {
    fn from(point: LECPoint) -> Self {
        LecPointDto {
            loss: point.loss.0,
            exceedance: point.exceedance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantilesDto {
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
}

impl From<Quantiles> for QuantilesDto {
    fn from(q: Quantiles) -> Self {
        QuantilesDto {
            p50: q.p50.0,
            p90: q.p90.0,
            p95: q.p95.0,
            p99: q.p99.0,
        }
    }
}

/// `getLECCurve` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LecCurveResponse {
    pub id: NodeId,
    pub name: String,
    pub curve: Vec<LecPointDto>,
    pub quantiles: QuantilesDto,
    pub child_ids: Option<Vec<NodeId>>,
    /// Present only when the caller set `includeProvenance`.
    pub provenances: Option<crate::domain::models::provenance::TreeProvenance>,
}

/// `probOfExceedance` response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExceedanceResponse {
    pub probability: f64,
}
