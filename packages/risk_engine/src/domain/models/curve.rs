//! `TickDomain` / `CurveBundle`: the shared sampling grid for Loss
//! Exceedance Curves and the bundle of per-node curves built on it.

use crate::domain::errors::{ErrorCode, FieldError};
use crate::domain::models::ids::NodeId;
use crate::domain::models::primitives::Loss;
use std::collections::HashMap;

const DEDUP_EPSILON: f64 = 1e-9;

pub const STANDARD_TICKS: [f64; 13] = [
    0.99, 0.95, 0.90, 0.80, 0.70, 0.60, 0.50, 0.40, 0.30, 0.20, 0.10, 0.05, 0.01,
];

/// A sorted-descending, ε-deduplicated set of exceedance probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct TickDomain(Vec<f64>);

impl TickDomain {
    pub fn standard() -> Self {
        TickDomain(STANDARD_TICKS.to_vec())
    }

    /// Validates (non-empty, each tick strictly in `(0,1)`), sorts
    /// descending, and dedups within ε.
    pub fn new(field: &str, ticks: Vec<f64>) -> Result<Self, FieldError> {
        if ticks.is_empty() {
            return Err(FieldError::new(
                field,
                ErrorCode::EmptyCollection,
                "tick domain must not be empty",
            ));
        }
        for t in &ticks {
            if !t.is_finite() || *t <= 0.0 || *t >= 1.0 {
                return Err(FieldError::new(
                    field,
                    ErrorCode::InvalidRange,
                    "ticks must be strictly between 0.0 and 1.0",
                ));
            }
        }
        Ok(TickDomain(dedup_descending(ticks)))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sorted-descending merge of several domains, deduped within ε.
    pub fn union(domains: &[&TickDomain]) -> TickDomain {
        let all: Vec<f64> = domains.iter().flat_map(|d| d.0.iter().copied()).collect();
        TickDomain(dedup_descending(all))
    }
}

fn dedup_descending(mut ticks: Vec<f64>) -> Vec<f64> {
    ticks.sort_by(|a, b| b.partial_cmp(a).expect("ticks are finite"));
    let mut deduped: Vec<f64> = Vec::with_capacity(ticks.len());
    for t in ticks {
        if deduped
            .last()
            .is_none_or(|&last| (last - t).abs() > DEDUP_EPSILON)
        {
            deduped.push(t);
        }
    }
    deduped
}

/// One `(exceedance, loss)` point of a rendered curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LECPoint {
    pub loss: Loss,
    pub exceedance: f64,
}

/// The four standard summary quantiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantiles {
    pub p50: Loss,
    pub p90: Loss,
    pub p95: Loss,
    pub p99: Loss,
}

/// A shared tick domain plus one loss-at-tick curve per node. The
/// combination of two bundles is a monoid: identity is the empty bundle,
/// the operation unions domains and merges curve maps, preferring the
/// right-hand operand on key collisions.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveBundle {
    domain: TickDomain,
    curves: HashMap<NodeId, Vec<Loss>>,
}

impl CurveBundle {
    pub fn empty(domain: TickDomain) -> Self {
        CurveBundle {
            domain,
            curves: HashMap::new(),
        }
    }

    pub fn domain(&self) -> &TickDomain {
        &self.domain
    }

    pub fn insert(&mut self, node: NodeId, losses: Vec<Loss>) {
        debug_assert_eq!(losses.len(), self.domain.len());
        self.curves.insert(node, losses);
    }

    pub fn curve_for(&self, node: NodeId) -> Option<&[Loss]> {
        self.curves.get(&node).map(Vec::as_slice)
    }

    pub fn points_for(&self, node: NodeId) -> Option<Vec<LECPoint>> {
        self.curve_for(node).map(|losses| {
            self.domain
                .as_slice()
                .iter()
                .zip(losses.iter())
                .map(|(&exceedance, &loss)| LECPoint { loss, exceedance })
                .collect()
        })
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.curves.keys()
    }

    /// Unions the two domains and merges curve maps, preferring `other`'s
    /// curve on a node present in both. Callers must re-align each curve
    /// to the resulting domain before combining. Re-alignment is an
    /// aligner concern, not this structure's.
    pub fn merge(self, other: CurveBundle) -> CurveBundle {
        let domain = TickDomain::union(&[&self.domain, &other.domain]);
        let mut curves = self.curves;
        for (node, losses) in other.curves {
            curves.insert(node, losses);
        }
        CurveBundle { domain, curves }
    }
}
