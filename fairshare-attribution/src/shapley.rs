//! Shapley value estimation: exhaustive subset enumeration for small games and
//! permutation sampling for everything else.

use std::collections::{BTreeMap, BTreeSet};

use blake3::Hasher;
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    cancel::SamplingCancellation,
    types::{AttributionVector, Coalition, Contributor},
    value::ValueFunction,
};

/// Hard cap for exhaustive enumeration (`2^n` coalitions).
pub const EXACT_CONTRIBUTOR_LIMIT: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ShapleyError {
    #[error("exact Shapley requires n <= {limit}, got n={got}")]
    ExactLimit { limit: usize, got: usize },
    #[error("n_samples must be a positive integer, got {0}")]
    InvalidSampleCount(usize),
    #[error("contributor {0} appears more than once")]
    DuplicateContributor(Contributor),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ShapleyConfig {
    /// Permutations drawn by the Monte Carlo path.
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    /// Largest contributor count routed to exact enumeration.
    #[serde(default = "default_exact_threshold")]
    pub exact_threshold: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Permutations per worker task.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

const fn default_n_samples() -> usize {
    1_000
}

const fn default_exact_threshold() -> usize {
    EXACT_CONTRIBUTOR_LIMIT
}

const fn default_parallel() -> bool {
    true
}

const fn default_chunk_size() -> usize {
    256
}

impl Default for ShapleyConfig {
    fn default() -> Self {
        Self {
            n_samples: default_n_samples(),
            exact_threshold: default_exact_threshold(),
            seed: None,
            parallel: default_parallel(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Monte Carlo output: the estimate plus the raw marginal draws behind it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloEstimate {
    pub values: AttributionVector,
    pub marginals: BTreeMap<Contributor, Vec<f64>>,
    /// Permutations that completed.
    pub samples: usize,
    pub requested: usize,
    pub cancelled: bool,
}

impl MonteCarloEstimate {
    /// Sample standard deviation of the marginals divided by `sqrt(samples)`.
    pub fn standard_errors(&self) -> BTreeMap<Contributor, f64> {
        self.marginals
            .iter()
            .map(|(c, draws)| (c.clone(), standard_error(draws)))
            .collect()
    }
}

/// Which path produced a Shapley vector.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapleyRun {
    Exact(AttributionVector),
    MonteCarlo(MonteCarloEstimate),
}

impl ShapleyRun {
    pub fn values(&self) -> &AttributionVector {
        match self {
            ShapleyRun::Exact(values) => values,
            ShapleyRun::MonteCarlo(estimate) => &estimate.values,
        }
    }
}

pub struct ShapleyEstimator {
    config: ShapleyConfig,
}

impl ShapleyEstimator {
    pub fn new(config: ShapleyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShapleyConfig {
        &self.config
    }

    /// Exact when the contributor count is within `exact_threshold`,
    /// Monte Carlo with `n_samples` permutations otherwise.
    pub fn estimate<V>(
        &self,
        contributors: &[Contributor],
        value_fn: &V,
    ) -> Result<ShapleyRun, ShapleyError>
    where
        V: ValueFunction + ?Sized,
    {
        let threshold = self.config.exact_threshold.min(EXACT_CONTRIBUTOR_LIMIT);
        if contributors.len() <= threshold {
            self.exact(contributors, value_fn).map(ShapleyRun::Exact)
        } else {
            self.monte_carlo(contributors, value_fn, self.config.n_samples)
                .map(ShapleyRun::MonteCarlo)
        }
    }

    /// Weighted sum of marginal contributions over every subset.
    pub fn exact<V>(
        &self,
        contributors: &[Contributor],
        value_fn: &V,
    ) -> Result<AttributionVector, ShapleyError>
    where
        V: ValueFunction + ?Sized,
    {
        ensure_distinct(contributors)?;
        let n = contributors.len();
        if n > EXACT_CONTRIBUTOR_LIMIT {
            return Err(ShapleyError::ExactLimit {
                limit: EXACT_CONTRIBUTOR_LIMIT,
                got: n,
            });
        }
        if n == 0 {
            return Ok(AttributionVector::new());
        }

        let masks = 1usize << n;
        let values: Vec<f64> = (0..masks)
            .map(|mask| value_fn.value(&coalition_for_mask(contributors, mask)))
            .collect();
        if values[0] != 0.0 {
            warn!("value function scored the empty coalition at {}", values[0]);
        }
        let weights: Vec<f64> = (0..n)
            .map(|size| factorial(size) * factorial(n - size - 1) / factorial(n))
            .collect();

        let mut phi = vec![0.0; n];
        for (i, slot) in phi.iter_mut().enumerate() {
            let bit = 1usize << i;
            for mask in (0..masks).filter(|mask| mask & bit == 0) {
                let size = mask.count_ones() as usize;
                *slot += weights[size] * (values[mask | bit] - values[mask]);
            }
        }
        debug!("exact shapley contributors={n} coalitions={masks}");
        Ok(contributors.iter().cloned().zip(phi).collect())
    }

    /// Mean marginal contribution over `n_samples` uniformly random permutations.
    pub fn monte_carlo<V>(
        &self,
        contributors: &[Contributor],
        value_fn: &V,
        n_samples: usize,
    ) -> Result<MonteCarloEstimate, ShapleyError>
    where
        V: ValueFunction + ?Sized,
    {
        self.sample(contributors, value_fn, n_samples, None)
    }

    /// [`ShapleyEstimator::monte_carlo`] that stops early once `cancel` fires.
    pub fn monte_carlo_cancellable<V>(
        &self,
        contributors: &[Contributor],
        value_fn: &V,
        n_samples: usize,
        cancel: &SamplingCancellation,
    ) -> Result<MonteCarloEstimate, ShapleyError>
    where
        V: ValueFunction + ?Sized,
    {
        self.sample(contributors, value_fn, n_samples, Some(cancel))
    }

    fn sample<V>(
        &self,
        contributors: &[Contributor],
        value_fn: &V,
        n_samples: usize,
        cancel: Option<&SamplingCancellation>,
    ) -> Result<MonteCarloEstimate, ShapleyError>
    where
        V: ValueFunction + ?Sized,
    {
        if n_samples == 0 {
            return Err(ShapleyError::InvalidSampleCount(n_samples));
        }
        ensure_distinct(contributors)?;
        if contributors.is_empty() {
            return Ok(MonteCarloEstimate {
                values: AttributionVector::new(),
                marginals: BTreeMap::new(),
                samples: 0,
                requested: n_samples,
                cancelled: false,
            });
        }

        let base_seed = self.config.seed.unwrap_or_else(rand::random::<u64>);
        let chunk_size = self.config.chunk_size.max(1);
        let chunks: Vec<(u64, usize)> = (0..n_samples)
            .step_by(chunk_size)
            .enumerate()
            .map(|(index, start)| (index as u64, chunk_size.min(n_samples - start)))
            .collect();
        debug!(
            "monte carlo shapley contributors={} samples={n_samples} chunks={} parallel={}",
            contributors.len(),
            chunks.len(),
            self.config.parallel
        );

        let run_chunk = |&(index, permutations): &(u64, usize)| {
            sample_chunk(
                contributors,
                value_fn,
                permutations,
                chunk_seed(base_seed, index),
                cancel,
            )
        };
        let results: Vec<ChunkSamples> = if self.config.parallel {
            chunks.par_iter().map(run_chunk).collect()
        } else {
            chunks.iter().map(run_chunk).collect()
        };

        let mut marginals: Vec<Vec<f64>> = vec![Vec::new(); contributors.len()];
        let mut samples = 0;
        for chunk in results {
            samples += chunk.completed;
            for (merged, draws) in marginals.iter_mut().zip(chunk.marginals) {
                merged.extend(draws);
            }
        }
        let cancelled = samples < n_samples;
        if cancelled {
            warn!("monte carlo sampling cancelled after {samples}/{n_samples} permutations");
        }

        let values = contributors
            .iter()
            .zip(&marginals)
            .map(|(c, draws)| (c.clone(), mean(draws)))
            .collect();
        Ok(MonteCarloEstimate {
            values,
            marginals: contributors.iter().cloned().zip(marginals).collect(),
            samples,
            requested: n_samples,
            cancelled,
        })
    }
}

impl Default for ShapleyEstimator {
    fn default() -> Self {
        Self::new(ShapleyConfig::default())
    }
}

struct ChunkSamples {
    marginals: Vec<Vec<f64>>,
    completed: usize,
}

fn sample_chunk<V>(
    contributors: &[Contributor],
    value_fn: &V,
    permutations: usize,
    seed: [u8; 32],
    cancel: Option<&SamplingCancellation>,
) -> ChunkSamples
where
    V: ValueFunction + ?Sized,
{
    let mut rng = ChaCha20Rng::from_seed(seed);
    let mut order: Vec<usize> = (0..contributors.len()).collect();
    let mut marginals: Vec<Vec<f64>> = vec![Vec::with_capacity(permutations); contributors.len()];
    let mut completed = 0;
    for _ in 0..permutations {
        if cancel.is_some_and(SamplingCancellation::is_cancelled) {
            break;
        }
        order.shuffle(&mut rng);
        let mut coalition = Coalition::new();
        let mut previous = value_fn.value(&coalition);
        for &index in &order {
            coalition.insert(contributors[index].clone());
            let current = value_fn.value(&coalition);
            marginals[index].push(current - previous);
            previous = current;
        }
        completed += 1;
    }
    ChunkSamples {
        marginals,
        completed,
    }
}

fn chunk_seed(base: u64, index: u64) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(b"fairshare/shapley");
    hasher.update(&base.to_le_bytes());
    hasher.update(&index.to_le_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(hasher.finalize().as_bytes());
    out
}

pub(crate) fn ensure_distinct(contributors: &[Contributor]) -> Result<(), ShapleyError> {
    let mut seen = BTreeSet::new();
    for contributor in contributors {
        if !seen.insert(contributor) {
            return Err(ShapleyError::DuplicateContributor(contributor.clone()));
        }
    }
    Ok(())
}

fn coalition_for_mask(contributors: &[Contributor], mask: usize) -> Coalition {
    contributors
        .iter()
        .enumerate()
        .filter(|&(i, _)| mask & (1 << i) != 0)
        .map(|(_, c)| c.clone())
        .collect()
}

fn factorial(n: usize) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

fn mean(draws: &[f64]) -> f64 {
    if draws.is_empty() {
        return 0.0;
    }
    draws.iter().sum::<f64>() / draws.len() as f64
}

fn standard_error(draws: &[f64]) -> f64 {
    let n = draws.len();
    if n < 2 {
        return 0.0;
    }
    let mu = mean(draws);
    let var = draws.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / (n - 1) as f64;
    (var / n as f64).sqrt()
}
