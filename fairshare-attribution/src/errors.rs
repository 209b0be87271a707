use fairshare_privacy::DpError;
use thiserror::Error;

use crate::{config::ConfigError, hybrid::HybridError, shapley::ShapleyError};

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Shapley(#[from] ShapleyError),
    #[error(transparent)]
    Hybrid(#[from] HybridError),
    #[error(transparent)]
    DifferentialPrivacy(#[from] DpError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
