//! Leaf loss distributions: a tagged union over `Lognormal` (from a 90%
//! confidence interval) and `Expert` (Metalog, fit from matched
//! `(percentile, quantile)` pairs).
//!
//! Pattern-match exhaustively; do not model this as a subclass hierarchy.

use crate::domain::errors::{ErrorCode, FieldError};
use crate::domain::models::primitives::Probability;
use serde::{Deserialize, Serialize};

pub const LOGNORMAL_CI: f64 = 0.90;
pub const METALOG_MIN_TERMS: u8 = 3;
pub const METALOG_MAX_TERMS: u8 = 16;
pub const METALOG_DEFAULT_TERMS: u8 = 9;

/// A leaf's occurrence probability together with its loss distribution
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub occurrence_probability: Probability,
    pub params: DistributionParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DistributionParams {
    Lognormal(LognormalParams),
    Expert(ExpertParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LognormalParams {
    pub min_loss: u64,
    pub max_loss: u64,
    /// Always 0.90 for this distribution family; kept explicit so the
    /// wire shape carries it alongside the fitted parameters.
    pub confidence_interval: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertParams {
    pub percentiles: Vec<f64>,
    pub quantiles: Vec<u64>,
    pub terms: u8,
}

impl Distribution {
    /// Validates and constructs a lognormal-from-CI distribution.
    /// `min_loss < max_loss` is required; fails with `InvalidLognormalParams`.
    pub fn new_lognormal(
        field_prefix: &str,
        occurrence_probability: f64,
        min_loss: u64,
        max_loss: u64,
    ) -> Result<Self, FieldError> {
        let p = Probability::parse(&format!("{field_prefix}.probability"), occurrence_probability)?;
        if min_loss >= max_loss {
            return Err(FieldError::new(
                format!("{field_prefix}.distribution"),
                ErrorCode::InvalidLognormalParams,
                format!("minLoss ({min_loss}) must be less than maxLoss ({max_loss})"),
            ));
        }
        Ok(Distribution {
            occurrence_probability: p,
            params: DistributionParams::Lognormal(LognormalParams {
                min_loss,
                max_loss,
                confidence_interval: LOGNORMAL_CI,
            }),
        })
    }

    /// Validates and constructs an expert (Metalog) distribution from
    /// matched `(percentile, quantile)` pairs. Structural validity only.
    /// Metalog feasibility (the fit actually succeeding) is checked
    /// separately by the sampler/validator, since fitting requires solving
    /// a linear system and does not belong in the data model layer.
    pub fn new_expert(
        field_prefix: &str,
        occurrence_probability: f64,
        percentiles: Vec<f64>,
        quantiles: Vec<u64>,
        terms: u8,
    ) -> Result<Self, FieldError> {
        let p = Probability::parse(&format!("{field_prefix}.probability"), occurrence_probability)?;

        if percentiles.len() != quantiles.len() {
            return Err(FieldError::new(
                format!("{field_prefix}.distribution.percentiles"),
                ErrorCode::InvalidCombination,
                "percentiles and quantiles must have the same length",
            ));
        }
        if percentiles.is_empty() {
            return Err(FieldError::new(
                format!("{field_prefix}.distribution.percentiles"),
                ErrorCode::EmptyCollection,
                "at least one (percentile, quantile) pair is required",
            ));
        }
        for pct in &percentiles {
            if !pct.is_finite() || *pct <= 0.0 || *pct >= 1.0 {
                return Err(FieldError::new(
                    format!("{field_prefix}.distribution.percentiles"),
                    ErrorCode::InvalidRange,
                    "percentiles must be strictly between 0.0 and 1.0",
                ));
            }
        }
        if !(METALOG_MIN_TERMS..=METALOG_MAX_TERMS).contains(&terms) {
            return Err(FieldError::new(
                format!("{field_prefix}.distribution.terms"),
                ErrorCode::InvalidRange,
                format!("terms must be between {METALOG_MIN_TERMS} and {METALOG_MAX_TERMS}"),
            ));
        }

        Ok(Distribution {
            occurrence_probability: p,
            params: DistributionParams::Expert(ExpertParams {
                percentiles,
                quantiles,
                terms,
            }),
        })
    }
}
