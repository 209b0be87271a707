//! First-order transition models over journeys and removal-effect attribution.

use std::{collections::BTreeMap, fmt};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    corpus::SequenceCorpus,
    types::{AttributionVector, Contributor},
};

/// Node of the transition graph. `Conversion` and `Null` are absorbing.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    Touchpoint(Contributor),
    Conversion,
    Null,
}

impl State {
    pub fn is_absorbing(&self) -> bool {
        matches!(self, State::Conversion | State::Null)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Touchpoint(contributor) => write!(f, "{contributor}"),
            State::Conversion => f.write_str("CONVERSION"),
            State::Null => f.write_str("NULL"),
        }
    }
}

/// `state -> {next_state: probability}`; outgoing rows sum to 1.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionModel {
    transitions: BTreeMap<State, BTreeMap<State, f64>>,
}

impl TransitionModel {
    pub fn outgoing(&self, from: &State) -> Option<&BTreeMap<State, f64>> {
        self.transitions.get(from)
    }

    pub fn probability(&self, from: &State, to: &State) -> f64 {
        self.outgoing(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.transitions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&State, &BTreeMap<State, f64>)> {
        self.transitions.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Mean CONVERSION probability over the states that have one.
    ///
    /// This is a cheap, order-insensitive proxy and not an absorbing-chain
    /// hitting probability. An empty model, or one without any conversion
    /// edge, scores 0.
    pub fn conversion_probability(&self) -> f64 {
        let (sum, count) = self
            .transitions
            .values()
            .filter_map(|row| row.get(&State::Conversion))
            .fold((0.0, 0usize), |(sum, count), p| (sum + p, count + 1));
        if count == 0 {
            return 0.0;
        }
        sum / count as f64
    }
}

/// Baseline, raw effects and the normalized attribution of one removal run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemovalReport {
    pub baseline: f64,
    /// `max(0, baseline - excluded)` per contributor, before normalization.
    pub raw_effects: AttributionVector,
    pub attribution: AttributionVector,
    /// Set when every raw effect was zero and the uniform vector was used.
    pub uniform_fallback: bool,
}

#[derive(Clone, Debug)]
pub struct MarkovAttributor {
    parallel: bool,
}

impl Default for MarkovAttributor {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl MarkovAttributor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Counts adjacent-pair transitions plus the terminal edge of every
    /// sequence, optionally with one contributor filtered out first, and
    /// normalizes each source row.
    pub fn build_transitions(
        &self,
        corpus: &SequenceCorpus,
        exclude: Option<&Contributor>,
    ) -> TransitionModel {
        let mut counts: BTreeMap<State, BTreeMap<State, u64>> = BTreeMap::new();
        for sequence in corpus.sequences() {
            let path: Vec<&Contributor> = sequence
                .path
                .iter()
                .filter(|c| Some(*c) != exclude)
                .collect();
            let Some(last) = path.last() else { continue };
            for pair in path.windows(2) {
                *counts
                    .entry(State::Touchpoint(pair[0].clone()))
                    .or_default()
                    .entry(State::Touchpoint(pair[1].clone()))
                    .or_default() += 1;
            }
            let terminal = if sequence.converted {
                State::Conversion
            } else {
                State::Null
            };
            *counts
                .entry(State::Touchpoint((*last).clone()))
                .or_default()
                .entry(terminal)
                .or_default() += 1;
        }

        let transitions = counts
            .into_iter()
            .map(|(from, row)| {
                let total: u64 = row.values().sum();
                let probabilities = row
                    .into_iter()
                    .map(|(to, count)| (to, count as f64 / total as f64))
                    .collect();
                (from, probabilities)
            })
            .collect();
        TransitionModel { transitions }
    }

    /// Removal effects over the contributors that appear in the corpus.
    pub fn removal_effects(&self, corpus: &SequenceCorpus) -> AttributionVector {
        self.analyze(corpus, &corpus.contributors()).attribution
    }

    /// Removal effects over an explicit contributor set.
    pub fn removal_effects_over(
        &self,
        corpus: &SequenceCorpus,
        contributors: &[Contributor],
    ) -> AttributionVector {
        self.analyze(corpus, contributors).attribution
    }

    /// Full removal run: one baseline build plus one build per excluded
    /// contributor. Effects are normalized to 1; when all are zero the
    /// uniform vector over `contributors` is returned instead.
    pub fn analyze(&self, corpus: &SequenceCorpus, contributors: &[Contributor]) -> RemovalReport {
        let baseline = self.build_transitions(corpus, None).conversion_probability();
        let effect = |contributor: &Contributor| {
            let excluded = self
                .build_transitions(corpus, Some(contributor))
                .conversion_probability();
            (contributor.clone(), (baseline - excluded).max(0.0))
        };
        let effects: Vec<(Contributor, f64)> = if self.parallel {
            contributors.par_iter().map(effect).collect()
        } else {
            contributors.iter().map(effect).collect()
        };
        let raw_effects: AttributionVector = effects.into_iter().collect();
        debug!(
            "markov removal baseline={baseline:.4} contributors={} sequences={}",
            contributors.len(),
            corpus.len()
        );

        let total = raw_effects.total();
        let (attribution, uniform_fallback) = if total > 0.0 {
            (raw_effects.normalized(), false)
        } else {
            if !contributors.is_empty() {
                warn!(
                    "all removal effects are zero, falling back to uniform attribution contributors={}",
                    contributors.len()
                );
            }
            (AttributionVector::uniform(contributors), true)
        };
        RemovalReport {
            baseline,
            raw_effects,
            attribution,
            uniform_fallback,
        }
    }
}
