use std::collections::BTreeMap;

use blake3::Hasher;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    budget::{advanced_composition, BudgetSnapshot, PrivacyBudget},
    config::PrivacyConfig,
};

#[derive(Debug, Error, PartialEq)]
pub enum DpError {
    #[error("epsilon must be > 0, got {0}")]
    InvalidEpsilon(f64),
    #[error("delta must be within (0,1), got {0}")]
    InvalidDelta(f64),
    #[error("sensitivity must be positive, got {0}")]
    InvalidSensitivity(f64),
}

/// Laplace release mechanism for normalized weight vectors.
///
/// Each call to [`PrivacyMechanism::privatize`] is an independent
/// `epsilon`-DP release under a global sensitivity of `2 / n` per weight.
/// Spend accumulates through `&mut self`, so one mechanism has exactly one
/// writer; share it across threads behind a mutex.
pub struct PrivacyMechanism {
    epsilon: f64,
    delta: f64,
    budget: PrivacyBudget,
    rng: ChaCha20Rng,
}

impl PrivacyMechanism {
    pub fn new(epsilon: f64, delta: f64) -> Result<Self, DpError> {
        Self::from_config(&PrivacyConfig {
            epsilon,
            delta,
            seed: None,
        })
    }

    pub fn with_seed(epsilon: f64, delta: f64, seed: u64) -> Result<Self, DpError> {
        Self::from_config(&PrivacyConfig {
            epsilon,
            delta,
            seed: Some(seed),
        })
    }

    pub fn from_config(config: &PrivacyConfig) -> Result<Self, DpError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::from_seed(derive_seed(seed)),
            None => ChaCha20Rng::from_entropy(),
        };
        Ok(Self {
            epsilon: config.epsilon,
            delta: config.delta,
            budget: PrivacyBudget::new(),
            rng,
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// `size` independent zero-mean Laplace draws with scale `sensitivity / epsilon`.
    pub fn laplace_noise(&mut self, sensitivity: f64, size: usize) -> Result<Vec<f64>, DpError> {
        if !(sensitivity > 0.0) || !sensitivity.is_finite() {
            return Err(DpError::InvalidSensitivity(sensitivity));
        }
        let scale = sensitivity / self.epsilon;
        Ok((0..size).map(|_| self.sample_laplace(scale)).collect())
    }

    /// Adds calibrated noise to every weight, clips at zero and renormalizes.
    ///
    /// A vector that is clipped to all zeros is released as the uniform
    /// vector over the same keys. Every call is charged `epsilon`, including
    /// calls with an empty vector.
    pub fn privatize<K>(&mut self, weights: &BTreeMap<K, f64>) -> BTreeMap<K, f64>
    where
        K: Ord + Clone,
    {
        self.budget.record(self.epsilon);
        if weights.is_empty() {
            return BTreeMap::new();
        }
        let sensitivity = 2.0 / weights.len() as f64;
        let scale = sensitivity / self.epsilon;
        let mut noisy: BTreeMap<K, f64> = weights
            .iter()
            .map(|(key, weight)| {
                let noise = self.sample_laplace(scale);
                (key.clone(), (weight + noise).max(0.0))
            })
            .collect();
        let total: f64 = noisy.values().sum();
        if total > 0.0 && total.is_finite() {
            noisy.values_mut().for_each(|weight| *weight /= total);
        } else {
            warn!(
                "privatized vector clipped to zero, releasing uniform weights keys={}",
                noisy.len()
            );
            let uniform = 1.0 / noisy.len() as f64;
            noisy.values_mut().for_each(|weight| *weight = uniform);
        }
        debug!(
            "privatized release keys={} scale={scale:.4e} spent={:.4}",
            noisy.len(),
            self.budget.epsilon_spent()
        );
        noisy
    }

    /// Advanced-composition bound for `n_queries` releases at this epsilon.
    pub fn privacy_loss(&self, n_queries: u64) -> f64 {
        advanced_composition(n_queries, self.epsilon, self.delta)
    }

    pub fn privacy_spent(&self) -> f64 {
        self.budget.epsilon_spent()
    }

    pub fn queries(&self) -> u64 {
        self.budget.queries()
    }

    pub fn budget_remaining(&self) -> f64 {
        self.budget.remaining(self.epsilon)
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        self.budget.snapshot(self.epsilon, self.delta)
    }

    fn sample_laplace(&mut self, scale: f64) -> f64 {
        let u: f64 = self.rng.gen::<f64>() - 0.5;
        let sign = if u >= 0.0 { 1.0 } else { -1.0 };
        // Floor keeps ln finite at u = -0.5; |noise| tops out near 27.6 * scale.
        let magnitude = (1.0 - 2.0 * u.abs()).max(1e-12);
        -scale * sign * magnitude.ln()
    }
}

fn derive_seed(seed: u64) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(b"fairshare/privacy");
    hasher.update(&seed.to_le_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(hasher.finalize().as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("A".to_string(), 0.4),
            ("B".to_string(), 0.35),
            ("C".to_string(), 0.25),
        ])
    }

    #[test]
    fn rejects_non_positive_epsilon() {
        assert_eq!(
            PrivacyMechanism::new(0.0, 1e-5).err(),
            Some(DpError::InvalidEpsilon(0.0))
        );
        assert!(PrivacyMechanism::new(-1.0, 1e-5).is_err());
    }

    #[test]
    fn laplace_noise_is_centered_with_expected_scale() {
        let mut mechanism = PrivacyMechanism::with_seed(1.0, 1e-5, 11).unwrap();
        let noise = mechanism.laplace_noise(1.0, 20_000).unwrap();
        let mean = noise.iter().sum::<f64>() / noise.len() as f64;
        let var = noise.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / noise.len() as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        // Laplace(b) has std b * sqrt(2).
        let scale = (var / 2.0).sqrt();
        assert!((scale - 1.0).abs() < 0.1, "scale {scale}");
    }

    #[test]
    fn laplace_noise_is_bounded_by_the_log_floor() {
        let mut mechanism = PrivacyMechanism::with_seed(1.0, 1e-5, 13).unwrap();
        let noise = mechanism.laplace_noise(1.0, 50_000).unwrap();
        let bound = -(1e-12f64).ln();
        assert!(noise.iter().all(|x| x.is_finite() && x.abs() <= bound));
    }

    #[test]
    fn laplace_noise_rejects_bad_sensitivity() {
        let mut mechanism = PrivacyMechanism::with_seed(1.0, 1e-5, 1).unwrap();
        assert!(matches!(
            mechanism.laplace_noise(0.0, 4),
            Err(DpError::InvalidSensitivity(_))
        ));
    }

    #[test]
    fn privatize_keeps_keys_and_normalizes() {
        let mut mechanism = PrivacyMechanism::with_seed(1.0, 1e-5, 3).unwrap();
        let noisy = mechanism.privatize(&weights());
        assert_eq!(noisy.keys().collect::<Vec<_>>(), weights().keys().collect::<Vec<_>>());
        let total: f64 = noisy.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(noisy.values().all(|w| *w >= 0.0));
    }

    #[test]
    fn spend_is_charged_per_release() {
        let mut mechanism = PrivacyMechanism::with_seed(0.5, 1e-5, 9).unwrap();
        for _ in 0..3 {
            mechanism.privatize(&weights());
        }
        assert!((mechanism.privacy_spent() - 1.5).abs() < 1e-12);
        assert_eq!(mechanism.queries(), 3);
        assert_eq!(mechanism.budget_remaining(), 0.0);
    }

    #[test]
    fn empty_vector_is_still_charged() {
        let mut mechanism = PrivacyMechanism::with_seed(1.0, 1e-5, 5).unwrap();
        let empty: BTreeMap<String, f64> = BTreeMap::new();
        assert!(mechanism.privatize(&empty).is_empty());
        assert_eq!(mechanism.queries(), 1);
    }

    #[test]
    fn same_seed_reproduces_release() {
        let mut a = PrivacyMechanism::with_seed(1.0, 1e-5, 21).unwrap();
        let mut b = PrivacyMechanism::with_seed(1.0, 1e-5, 21).unwrap();
        assert_eq!(a.privatize(&weights()), b.privatize(&weights()));
    }
}
