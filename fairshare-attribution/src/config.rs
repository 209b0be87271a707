use std::{
    fs,
    path::{Path, PathBuf},
};

use fairshare_privacy::PrivacyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    axioms::AxiomConfig,
    hybrid::HybridConfig,
    shapley::{ShapleyConfig, EXACT_CONTRIBUTOR_LIMIT},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigFormat {
    Auto,
    Toml,
    Yaml,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format:?} config: {details}")]
    Parse {
        format: ConfigFormat,
        details: String,
    },
    #[error("configuration invalid: {0}")]
    Validation(String),
}

/// Every tunable of an attribution run. Missing sections take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    #[serde(default)]
    pub shapley: ShapleyConfig,
    #[serde(default)]
    pub hybrid: HybridConfig,
    #[serde(default)]
    pub privacy: PrivacyConfig,
    #[serde(default)]
    pub axioms: AxiomConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shapley.n_samples == 0 {
            return Err(ConfigError::Validation(
                "shapley n-samples must be greater than zero".into(),
            ));
        }
        if self.shapley.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "shapley chunk-size must be greater than zero".into(),
            ));
        }
        if self.shapley.exact_threshold > EXACT_CONTRIBUTOR_LIMIT {
            return Err(ConfigError::Validation(format!(
                "shapley exact-threshold must be <= {EXACT_CONTRIBUTOR_LIMIT}, got {}",
                self.shapley.exact_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.hybrid.alpha) {
            return Err(ConfigError::Validation(format!(
                "hybrid alpha must be within [0,1], got {}",
                self.hybrid.alpha
            )));
        }
        self.privacy
            .validate()
            .map_err(|err| ConfigError::Validation(format!("privacy: {err}")))?;
        if !(self.axioms.tolerance > 0.0) {
            return Err(ConfigError::Validation(format!(
                "axiom tolerance must be positive, got {}",
                self.axioms.tolerance
            )));
        }
        Ok(())
    }

    /// Reproducible configuration used by the walkthrough and tests.
    pub fn sample() -> Self {
        let mut config = Self::default();
        config.shapley.seed = Some(7);
        config.privacy = PrivacyConfig::default().with_seed(11);
        config
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.privacy.epsilon = epsilon;
        self
    }
}

pub fn load_config(path: &Path, format: ConfigFormat) -> Result<EngineConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&contents, resolve_format(path, format))?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, format: ConfigFormat) -> Result<EngineConfig, ConfigError> {
    match format {
        ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
        ConfigFormat::Toml => toml::from_str(contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
        ConfigFormat::Auto => unreachable!("auto format is resolved before parsing"),
    }
}

fn resolve_format(path: &Path, format: ConfigFormat) -> ConfigFormat {
    match format {
        ConfigFormat::Auto => match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        },
        _ => format,
    }
}
