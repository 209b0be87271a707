//! End-to-end attribution run: Shapley, Markov removal effects, the hybrid
//! blend and a differentially-private release, with diagnostics.

use std::time::Instant;

use fairshare_privacy::PrivacyMechanism;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    axioms::AxiomVerifier,
    config::EngineConfig,
    corpus::SequenceCorpus,
    diagnostics::{RunDiagnostics, ShapleyMethod, StageTimings},
    errors::EngineResult,
    hybrid::HybridCombiner,
    markov::{MarkovAttributor, RemovalReport},
    shapley::{ShapleyEstimator, ShapleyRun},
    types::{AttributionVector, Contributor},
    value::{grand_coalition, solo_contributions, ValueFunction},
};

/// What an attribution run scores.
#[derive(Clone, Copy)]
pub enum AttributionInput<'a> {
    /// Shapley only; the hybrid is the Shapley vector.
    ValueFunction(&'a dyn ValueFunction),
    /// Shapley over the corpus-derived value plus Markov removal effects.
    Corpus(&'a SequenceCorpus),
    /// Shapley over `value_fn`, Markov over `corpus`.
    Both {
        value_fn: &'a dyn ValueFunction,
        corpus: &'a SequenceCorpus,
    },
}

impl<'a> AttributionInput<'a> {
    fn corpus(&self) -> Option<&'a SequenceCorpus> {
        match *self {
            AttributionInput::ValueFunction(_) => None,
            AttributionInput::Corpus(corpus) | AttributionInput::Both { corpus, .. } => Some(corpus),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributionResults {
    pub shapley: AttributionVector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markov: Option<AttributionVector>,
    pub hybrid: AttributionVector,
    pub private: AttributionVector,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompleteAttribution {
    pub results: AttributionResults,
    pub diagnostics: RunDiagnostics,
}

pub struct AttributionEngine {
    config: EngineConfig,
    shapley: ShapleyEstimator,
    markov: MarkovAttributor,
    hybrid: HybridCombiner,
    axioms: Option<AxiomVerifier>,
    privacy: PrivacyMechanism,
}

impl AttributionEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let shapley = ShapleyEstimator::new(config.shapley.clone());
        let markov = MarkovAttributor::new().with_parallel(config.shapley.parallel);
        let hybrid = HybridCombiner::from_config(&config.hybrid)?;
        let axioms = config
            .axioms
            .enabled
            .then(|| AxiomVerifier::from_config(&config.axioms));
        let privacy = PrivacyMechanism::from_config(&config.privacy)?;
        info!(
            "attribution engine ready alpha={} n_samples={} epsilon={}",
            config.hybrid.alpha, config.shapley.n_samples, config.privacy.epsilon
        );
        Ok(Self {
            config,
            shapley,
            markov,
            hybrid,
            axioms,
            privacy,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Release mechanism shared by every run of this engine.
    pub fn privacy(&self) -> &PrivacyMechanism {
        &self.privacy
    }

    /// Runs every stage and returns the attribution with the elapsed seconds.
    pub fn run(
        &mut self,
        input: AttributionInput<'_>,
        contributors: &[Contributor],
    ) -> EngineResult<(CompleteAttribution, f64)> {
        let started = Instant::now();
        let mut timings = StageTimings::default();

        let corpus_value;
        let value_fn: &dyn ValueFunction = match input {
            AttributionInput::ValueFunction(value_fn) | AttributionInput::Both { value_fn, .. } => {
                value_fn
            }
            AttributionInput::Corpus(corpus) => {
                corpus_value = corpus.coalition_value();
                &corpus_value
            }
        };

        let stage = Instant::now();
        let run = self.shapley.estimate(contributors, value_fn)?;
        timings.shapley_ms = elapsed_ms(stage);
        let raw_shapley = run.values().clone();
        let shapley = raw_shapley.clipped().normalized();
        let (shapley_method, samples, standard_errors) = match &run {
            ShapleyRun::Exact(_) => (ShapleyMethod::Exact, 0, None),
            ShapleyRun::MonteCarlo(estimate) => (
                ShapleyMethod::MonteCarlo,
                estimate.samples,
                Some(estimate.standard_errors()),
            ),
        };
        info!(
            "shapley stage done method={shapley_method:?} contributors={} ms={:.2}",
            contributors.len(),
            timings.shapley_ms
        );

        let stage = Instant::now();
        let removal: Option<RemovalReport> = input
            .corpus()
            .map(|corpus| self.markov.analyze(corpus, contributors));
        timings.markov_ms = elapsed_ms(stage);
        if let Some(report) = &removal {
            info!(
                "markov stage done baseline={:.4} uniform_fallback={} ms={:.2}",
                report.baseline, report.uniform_fallback, timings.markov_ms
            );
        }

        let stage = Instant::now();
        let hybrid = match &removal {
            Some(report) => self
                .hybrid
                .combine(&shapley, &report.attribution, contributors),
            None => shapley.clone(),
        };
        timings.hybrid_ms = elapsed_ms(stage);

        let stage = Instant::now();
        let private = AttributionVector::from(self.privacy.privatize(hybrid.as_map()));
        timings.privacy_ms = elapsed_ms(stage);
        info!(
            "private release done epsilon_spent={:.4} queries={}",
            self.privacy.privacy_spent(),
            self.privacy.queries()
        );

        let stage = Instant::now();
        let axioms = self.axioms.map(|verifier| {
            let outcome = value_fn.value(&grand_coalition(contributors));
            let solo = solo_contributions(contributors, value_fn);
            let report = verifier.verify(&raw_shapley, &solo, outcome);
            for violation in &report.violations {
                debug!("axiom check: {violation}");
            }
            report
        });
        timings.axioms_ms = elapsed_ms(stage);

        let diagnostics = RunDiagnostics {
            contributors: contributors.len(),
            shapley_method,
            samples,
            standard_errors,
            markov_baseline: removal.as_ref().map(|report| report.baseline),
            markov_uniform_fallback: removal.as_ref().is_some_and(|r| r.uniform_fallback),
            timings,
            privacy: self.privacy.snapshot(),
            axioms,
        };
        let results = AttributionResults {
            shapley,
            markov: removal.map(|report| report.attribution),
            hybrid,
            private,
        };
        let elapsed = started.elapsed().as_secs_f64();
        info!("attribution run finished seconds={elapsed:.3}");
        Ok((
            CompleteAttribution {
                results,
                diagnostics,
            },
            elapsed,
        ))
    }
}

/// Runs a default-configured engine at the given privacy level.
pub fn compute_complete_attribution(
    input: AttributionInput<'_>,
    contributors: &[Contributor],
    epsilon: f64,
) -> EngineResult<(CompleteAttribution, f64)> {
    let mut engine = AttributionEngine::new(EngineConfig::default().with_epsilon(epsilon))?;
    engine.run(input, contributors)
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1e3
}
