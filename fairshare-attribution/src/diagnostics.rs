//! Run metadata and convergence tooling for Monte Carlo estimates.

use std::collections::BTreeMap;

use fairshare_privacy::BudgetSnapshot;
use serde::{Deserialize, Serialize};

use crate::{
    axioms::AxiomReport,
    types::{AttributionVector, Contributor},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapleyMethod {
    Exact,
    MonteCarlo,
}

/// Wall-clock milliseconds spent per stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    pub shapley_ms: f64,
    pub markov_ms: f64,
    pub hybrid_ms: f64,
    pub privacy_ms: f64,
    pub axioms_ms: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub contributors: usize,
    pub shapley_method: ShapleyMethod,
    /// Permutations actually drawn; 0 for exact runs.
    pub samples: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_errors: Option<BTreeMap<Contributor, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markov_baseline: Option<f64>,
    pub markov_uniform_fallback: bool,
    pub timings: StageTimings,
    pub privacy: BudgetSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub axioms: Option<AxiomReport>,
}

/// Empirical convergence rate of a sequence of estimates.
///
/// The last estimate stands in for the true value. For every earlier one the
/// L2 error is computed, and a least-squares line is fit through
/// `(ln samples, ln(error + 1e-10))`. The negated slope is returned, so
/// Monte Carlo should land near 0.5. Fewer than three estimates, or sample
/// counts of a different length, give `None`.
pub fn convergence_rate(estimates: &[AttributionVector], sample_counts: &[usize]) -> Option<f64> {
    if estimates.len() < 3 || estimates.len() != sample_counts.len() {
        return None;
    }
    let (truth, earlier) = estimates.split_last()?;
    let points: Vec<(f64, f64)> = earlier
        .iter()
        .zip(sample_counts)
        .map(|(estimate, &n)| {
            let error = truth
                .iter()
                .map(|(c, w)| (estimate.weight(c.as_str()) - w).powi(2))
                .sum::<f64>()
                .sqrt();
            ((n.max(1) as f64).ln(), (error + 1e-10).ln())
        })
        .collect();

    let count = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / count;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / count;
    let (cov, var) = points.iter().fold((0.0, 0.0), |(cov, var), (x, y)| {
        (cov + (x - mean_x) * (y - mean_y), var + (x - mean_x).powi(2))
    });
    if var == 0.0 {
        return None;
    }
    Some(-(cov / var))
}
