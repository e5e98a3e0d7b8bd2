//! Curve builder and multi-curve aligner: turns an outcome map into a
//! tick-aligned loss-at-tick vector, and aligns several such vectors onto
//! a shared tick domain.

use crate::domain::models::curve::{CurveBundle, Quantiles, TickDomain};
use crate::domain::models::ids::NodeId;
use crate::domain::models::outcome::Outcome;
use crate::domain::models::primitives::Loss;

/// The loss-at-tick is the smallest `L` with `P(loss >= L) <= t`, i.e. the
/// quantile at `1 - t` of the empirical distribution over `sorted`
/// (ascending). Ties resolve to the larger rank, conservative since a
/// larger rank means a larger loss.
fn quantile_at_exceedance(sorted: &[Loss], exceedance: f64) -> Loss {
    let n = sorted.len();
    let q = 1.0 - exceedance;
    let rank = (q * n as f64).ceil().max(1.0) as usize;
    sorted[rank.min(n) - 1]
}

/// Builds one node's loss-at-tick vector over `domain`, in the domain's
/// order.
pub fn build_curve(outcome: &Outcome, domain: &TickDomain) -> Vec<Loss> {
    let mut sorted = outcome.dense_losses();
    sorted.sort_unstable();
    domain
        .as_slice()
        .iter()
        .map(|&t| quantile_at_exceedance(&sorted, t))
        .collect()
}

/// The four standard summary quantiles, read directly off the empirical
/// distribution.
pub fn extract_quantiles(outcome: &Outcome) -> Quantiles {
    let mut sorted = outcome.dense_losses();
    sorted.sort_unstable();
    Quantiles {
        p50: quantile_at_exceedance(&sorted, 0.50),
        p90: quantile_at_exceedance(&sorted, 0.10),
        p95: quantile_at_exceedance(&sorted, 0.05),
        p99: quantile_at_exceedance(&sorted, 0.01),
    }
}

/// `probOfExceedance`: the fraction of trials whose loss is at least
/// `threshold`.
pub fn prob_of_exceedance(outcome: &Outcome, threshold: Loss) -> f64 {
    let n = outcome.n_trials();
    if n == 0 {
        return 0.0;
    }
    let hits = outcome.dense_losses().into_iter().filter(|&l| l >= threshold).count();
    hits as f64 / n as f64
}

/// Interpolates one curve, defined on `source_domain`, onto a single
/// `target_tick` not already present in that domain. `source_domain` and
/// `source_losses` must be the same length, in descending-tick order.
fn interpolate(source_domain: &[f64], source_losses: &[Loss], target_tick: f64) -> Loss {
    let max_tick = source_domain[0];
    let min_tick = source_domain[source_domain.len() - 1];

    if target_tick >= max_tick {
        return source_losses[0];
    }
    if target_tick <= min_tick {
        return source_losses[source_losses.len() - 1];
    }

    // source_domain is descending; find the bracketing pair (hi >= target >= lo).
    for (tick_pair, loss_pair) in source_domain.windows(2).zip(source_losses.windows(2)) {
        let (hi, lo) = (tick_pair[0], tick_pair[1]);
        let (loss_hi, loss_lo) = (loss_pair[0], loss_pair[1]);
        if target_tick <= hi && target_tick >= lo {
            if (hi - lo).abs() < f64::EPSILON {
                return loss_hi;
            }
            let frac = (hi - target_tick) / (hi - lo);
            let interpolated = loss_hi.0 as f64 + frac * (loss_lo.0 as f64 - loss_hi.0 as f64);
            return Loss(interpolated.round() as u64);
        }
    }
    unreachable!("target_tick is bounded by min_tick and max_tick above")
}

/// Re-expresses one node's curve, given on `source_domain`, over
/// `target_domain`. Ticks shared between the two domains are copied
/// directly, the rest are interpolated or clamped per [`interpolate`].
pub fn realign_curve(source_domain: &TickDomain, source_losses: &[Loss], target_domain: &TickDomain) -> Vec<Loss> {
    target_domain
        .as_slice()
        .iter()
        .map(|&target_tick| {
            match source_domain
                .as_slice()
                .iter()
                .position(|&t| (t - target_tick).abs() < 1e-9)
            {
                Some(idx) => source_losses[idx],
                None => interpolate(source_domain.as_slice(), source_losses, target_tick),
            }
        })
        .collect()
}

/// Aligns several per-node curves onto their union tick domain. `curves`
/// is `(node, domain, losses)` triples; on a duplicate node id the later
/// entry wins, matching `CurveBundle::merge`.
pub fn align_curves(curves: Vec<(NodeId, TickDomain, Vec<Loss>)>) -> CurveBundle {
    let domains: Vec<&TickDomain> = curves.iter().map(|(_, d, _)| d).collect();
    let union = TickDomain::union(&domains);

    let mut bundle = CurveBundle::empty(union.clone());
    for (node, source_domain, source_losses) in curves {
        let realigned = realign_curve(&source_domain, &source_losses, &union);
        bundle.insert(node, realigned);
    }
    bundle
}
