use serde::{Deserialize, Serialize};

use crate::dp::DpError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PrivacyConfig {
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Fixed seed for reproducible releases; drawn from OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

const fn default_epsilon() -> f64 {
    1.0
}

const fn default_delta() -> f64 {
    1e-5
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            delta: default_delta(),
            seed: None,
        }
    }
}

impl PrivacyConfig {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), DpError> {
        if !(self.epsilon > 0.0) || !self.epsilon.is_finite() {
            return Err(DpError::InvalidEpsilon(self.epsilon));
        }
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(DpError::InvalidDelta(self.delta));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PrivacyConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_epsilon() {
        let config = PrivacyConfig::default().with_epsilon(0.0);
        assert_eq!(config.validate(), Err(DpError::InvalidEpsilon(0.0)));
    }

    #[test]
    fn rejects_delta_outside_unit_interval() {
        let mut config = PrivacyConfig::default();
        config.delta = 1.0;
        assert!(matches!(config.validate(), Err(DpError::InvalidDelta(_))));
    }

    #[test]
    fn parses_kebab_case_toml() {
        let config: PrivacyConfig = toml::from_str("epsilon = 0.5\nseed = 7\n").unwrap();
        assert_eq!(config.epsilon, 0.5);
        assert_eq!(config.delta, 1e-5);
        assert_eq!(config.seed, Some(7));
    }
}
