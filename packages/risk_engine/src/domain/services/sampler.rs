//! Distribution samplers: turn a leaf's validated parameters plus a
//! uniform variate into a loss value.

use crate::domain::errors::{ErrorCode, FieldError};
use crate::domain::models::distribution::{Distribution, DistributionParams};
use crate::domain::models::primitives::Loss;
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};

fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("N(0,1) is always a valid normal distribution")
}

/// `(mu, sigma)` of the underlying normal, derived from `(minLoss,
/// maxLoss)` read as the 5th/95th percentiles of a 90% CI.
fn lognormal_params(field_prefix: &str, min_loss: u64, max_loss: u64) -> Result<(f64, f64), FieldError> {
    if min_loss == 0 {
        return Err(FieldError::new(
            format!("{field_prefix}.distribution"),
            ErrorCode::InvalidLognormalParams,
            "minLoss must be positive for a lognormal distribution",
        ));
    }
    let z95 = standard_normal().inverse_cdf(0.95);
    let ln_min = (min_loss as f64).ln();
    let ln_max = (max_loss as f64).ln();
    let mu = (ln_min + ln_max) / 2.0;
    let sigma = (ln_max - ln_min) / (2.0 * z95);
    Ok((mu, sigma))
}

fn sample_lognormal(mu: f64, sigma: f64, u: f64) -> Loss {
    let z = standard_normal().inverse_cdf(u);
    let raw = (mu + sigma * z).exp();
    Loss(raw.floor().max(0.0) as u64)
}

fn logit(y: f64) -> f64 {
    (y / (1.0 - y)).ln()
}

/// The Metalog basis function for `term` (1-indexed) at quantile `y`
/// (Keelin's construction): `1, ln(y/1-y), (y-.5)ln(y/1-y), (y-.5),
/// (y-.5)^2, (y-.5)^2 ln(y/1-y), (y-.5)^3, ...`.
fn basis(term: usize, y: f64) -> f64 {
    let centered = y - 0.5;
    match term {
        1 => 1.0,
        2 => logit(y),
        3 => centered * logit(y),
        4 => centered,
        n if n % 2 == 1 => centered.powi(((n - 1) / 2) as i32),
        n => centered.powi(((n - 2) / 2) as i32) * logit(y),
    }
}

/// A fitted Metalog quantile function: `terms` coefficients against the
/// basis in [`basis`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetalogFit {
    coefficients: Vec<f64>,
}

impl MetalogFit {
    /// Fits `terms` coefficients to the `(percentiles, quantiles)` points
    /// by least squares, then checks Metalog feasibility (the fitted
    /// quantile function must be non-decreasing everywhere). Failure in
    /// either step surfaces as `INVALID_DISTRIBUTION`.
    pub fn fit(
        field_prefix: &str,
        percentiles: &[f64],
        quantiles: &[u64],
        terms: u8,
    ) -> Result<MetalogFit, FieldError> {
        let terms = terms as usize;
        let rows = percentiles.len();
        let mut data = Vec::with_capacity(rows * terms);
        for &y in percentiles {
            for term in 1..=terms {
                data.push(basis(term, y));
            }
        }
        let design = DMatrix::from_row_slice(rows, terms, &data);
        let targets = DVector::from_iterator(quantiles.len(), quantiles.iter().map(|&q| q as f64));

        let svd = design.svd(true, true);
        let coefficients = svd.solve(&targets, 1e-9).map_err(|_| {
            FieldError::new(
                format!("{field_prefix}.distribution"),
                ErrorCode::InvalidDistribution,
                "metalog linear system has no stable solution",
            )
        })?;

        let fit = MetalogFit {
            coefficients: coefficients.iter().copied().collect(),
        };
        fit.check_feasibility(field_prefix)?;
        Ok(fit)
    }

    fn evaluate(&self, y: f64) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .map(|(i, &a)| a * basis(i + 1, y))
            .sum()
    }

    fn check_feasibility(&self, field_prefix: &str) -> Result<(), FieldError> {
        let mut previous = f64::NEG_INFINITY;
        for step in 1..200 {
            let y = step as f64 / 200.0;
            let value = self.evaluate(y);
            if value < previous - 1e-6 {
                return Err(FieldError::new(
                    format!("{field_prefix}.distribution"),
                    ErrorCode::InvalidDistribution,
                    "fitted metalog quantile function is not monotonically increasing",
                ));
            }
            previous = value;
        }
        Ok(())
    }

    pub fn sample(&self, u: f64) -> Loss {
        Loss(self.evaluate(u).max(0.0).floor() as u64)
    }
}

/// A leaf's ready-to-sample distribution: either the closed-form
/// lognormal or a fitted Metalog quantile function.
#[derive(Debug, Clone, PartialEq)]
pub enum DistributionSampler {
    Lognormal { mu: f64, sigma: f64 },
    Metalog(MetalogFit),
}

impl DistributionSampler {
    pub fn build(field_prefix: &str, distribution: &Distribution) -> Result<DistributionSampler, FieldError> {
        match &distribution.params {
            DistributionParams::Lognormal(params) => {
                let (mu, sigma) = lognormal_params(field_prefix, params.min_loss, params.max_loss)?;
                Ok(DistributionSampler::Lognormal { mu, sigma })
            }
            DistributionParams::Expert(params) => {
                MetalogFit::fit(field_prefix, &params.percentiles, &params.quantiles, params.terms)
                    .map(DistributionSampler::Metalog)
            }
        }
    }

    pub fn sample(&self, u: f64) -> Loss {
        match self {
            DistributionSampler::Lognormal { mu, sigma } => sample_lognormal(*mu, *sigma, u),
            DistributionSampler::Metalog(fit) => fit.sample(u),
        }
    }
}
