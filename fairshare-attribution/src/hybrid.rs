use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::types::{AttributionVector, Contributor};

#[derive(Debug, Error, PartialEq)]
pub enum HybridError {
    #[error("alpha must be within [0,1], got {0}")]
    InvalidAlpha(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HybridConfig {
    /// Shapley weight; `1 - alpha` goes to the Markov vector.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

const fn default_alpha() -> f64 {
    0.5
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
        }
    }
}

/// Linear blend of a Shapley and a Markov vector.
#[derive(Clone, Copy, Debug)]
pub struct HybridCombiner {
    alpha: f64,
}

impl HybridCombiner {
    /// Out-of-range alpha is rejected, never clamped.
    pub fn new(alpha: f64) -> Result<Self, HybridError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(HybridError::InvalidAlpha(alpha));
        }
        Ok(Self { alpha })
    }

    pub fn from_config(config: &HybridConfig) -> Result<Self, HybridError> {
        Self::new(config.alpha)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// `alpha * shapley[i] + (1 - alpha) * markov[i]` for every contributor,
    /// renormalized to 1. A contributor missing from either input takes 0
    /// from that source.
    pub fn combine(
        &self,
        shapley: &AttributionVector,
        markov: &AttributionVector,
        contributors: &[Contributor],
    ) -> AttributionVector {
        let blended: AttributionVector = contributors
            .iter()
            .map(|c| {
                let weight = self.alpha * shapley.weight(c.as_str())
                    + (1.0 - self.alpha) * markov.weight(c.as_str());
                (c.clone(), weight)
            })
            .collect();
        if !(blended.total() > 0.0) && !blended.is_empty() {
            warn!("hybrid blend has no positive mass, returning it unnormalized");
        }
        blended.normalized()
    }
}

/// One-shot form of [`HybridCombiner::combine`].
pub fn combine(
    shapley: &AttributionVector,
    markov: &AttributionVector,
    contributors: &[Contributor],
    alpha: f64,
) -> Result<AttributionVector, HybridError> {
    Ok(HybridCombiner::new(alpha)?.combine(shapley, markov, contributors))
}
