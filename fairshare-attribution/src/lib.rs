//! Fair credit attribution across contributors.
//!
//! A run scores contributors with Shapley values (exact up to ten players,
//! permutation sampling above), optionally with Markov removal effects over
//! observed journeys, blends the two, and releases the blend through the
//! Laplace mechanism from `fairshare-privacy`. Axiom checks and run
//! diagnostics ride along with every result; see [`AttributionEngine`].

pub mod axioms;
pub mod cancel;
pub mod config;
pub mod corpus;
pub mod diagnostics;
pub mod errors;
pub mod hybrid;
pub mod markov;
pub mod pipeline;
pub mod shapley;
pub mod types;
pub mod value;

pub use axioms::{AxiomConfig, AxiomReport, AxiomVerifier, AxiomViolation, CertifiedAttribution};
pub use cancel::SamplingCancellation;
pub use config::{load_config, ConfigError, ConfigFormat, EngineConfig};
pub use corpus::{CorpusValue, Sequence, SequenceCorpus};
pub use diagnostics::{convergence_rate, RunDiagnostics, ShapleyMethod, StageTimings};
pub use errors::{EngineError, EngineResult};
pub use fairshare_privacy::{DpError, PrivacyConfig, PrivacyMechanism};
pub use hybrid::{combine, HybridCombiner, HybridConfig, HybridError};
pub use markov::{MarkovAttributor, RemovalReport, State, TransitionModel};
pub use pipeline::{
    compute_complete_attribution, AttributionEngine, AttributionInput, AttributionResults,
    CompleteAttribution,
};
pub use shapley::{
    MonteCarloEstimate, ShapleyConfig, ShapleyError, ShapleyEstimator, ShapleyRun,
    EXACT_CONTRIBUTOR_LIMIT,
};
pub use types::{contributors, AttributionVector, Coalition, Contributor};
pub use value::{grand_coalition, solo_contributions, GameSum, ValueFunction};
