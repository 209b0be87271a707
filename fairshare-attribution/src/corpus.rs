//! Labeled contributor sequences ("journeys") and the coalition game they imply.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    types::{Coalition, Contributor},
    value::ValueFunction,
};

/// One ordered journey and whether it ended in the outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub path: Vec<Contributor>,
    pub converted: bool,
}

impl Sequence {
    pub fn new<I, S>(path: I, converted: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Contributor>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            converted,
        }
    }

    pub fn outcome(&self) -> f64 {
        if self.converted {
            1.0
        } else {
            0.0
        }
    }
}

/// Read-only collection of sequences. Order between sequences carries no meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceCorpus {
    sequences: Vec<Sequence>,
}

impl SequenceCorpus {
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self { sequences }
    }

    /// Builds a corpus from `(path, outcome)` pairs; any non-zero outcome counts
    /// as a conversion.
    pub fn from_pairs<I, P, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, u8)>,
        P: IntoIterator<Item = S>,
        S: Into<Contributor>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(path, outcome)| Sequence::new(path, outcome != 0))
                .collect(),
        )
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sorted, de-duplicated contributors appearing anywhere in the corpus.
    pub fn contributors(&self) -> Vec<Contributor> {
        self.sequences
            .iter()
            .flat_map(|s| s.path.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn coalition_value(&self) -> CorpusValue<'_> {
        CorpusValue { corpus: self }
    }
}

/// Coalition game over a corpus: the conversion rate among sequences that
/// only touch contributors inside the coalition.
#[derive(Clone, Copy, Debug)]
pub struct CorpusValue<'a> {
    corpus: &'a SequenceCorpus,
}

impl ValueFunction for CorpusValue<'_> {
    fn value(&self, coalition: &Coalition) -> f64 {
        if coalition.is_empty() {
            return 0.0;
        }
        let (hits, converted) = self
            .corpus
            .sequences
            .iter()
            .filter(|s| s.path.iter().all(|c| coalition.contains(c.as_str())))
            .fold((0usize, 0.0), |(hits, converted), s| {
                (hits + 1, converted + s.outcome())
            });
        if hits == 0 {
            return 0.0;
        }
        converted / hits as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::contributors;

    fn corpus() -> SequenceCorpus {
        SequenceCorpus::from_pairs([
            (vec!["A", "B", "C"], 1),
            (vec!["A", "C"], 1),
            (vec!["B", "C"], 0),
            (vec!["A", "B"], 1),
        ])
    }

    #[test]
    fn extracts_sorted_unique_contributors() {
        assert_eq!(corpus().contributors(), contributors(["A", "B", "C"]));
    }

    #[test]
    fn coalition_value_uses_covered_sequences_only() {
        let corpus = corpus();
        let value = corpus.coalition_value();
        let ac: Coalition = contributors(["A", "C"]).into_iter().collect();
        assert_eq!(value.value(&ac), 1.0);
        let bc: Coalition = contributors(["B", "C"]).into_iter().collect();
        assert_eq!(value.value(&bc), 0.0);
        let all: Coalition = contributors(["A", "B", "C"]).into_iter().collect();
        assert_eq!(value.value(&all), 0.75);
    }

    #[test]
    fn outcome_drives_coalition_value() {
        let corpus = SequenceCorpus::new(vec![
            Sequence::new(["A"], true),
            Sequence::new(["A"], false),
            Sequence::new(["A"], true),
        ]);
        let outcomes: Vec<f64> = corpus.sequences().iter().map(Sequence::outcome).collect();
        assert_eq!(outcomes, vec![1.0, 0.0, 1.0]);
        let lone: Coalition = contributors(["A"]).into_iter().collect();
        assert!((corpus.coalition_value().value(&lone) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_coalition_scores_zero() {
        let corpus = corpus();
        assert_eq!(corpus.coalition_value().value(&Coalition::new()), 0.0);
    }

    #[test]
    fn uncovered_coalition_scores_zero() {
        let corpus = corpus();
        let lone: Coalition = contributors(["A"]).into_iter().collect();
        assert_eq!(corpus.coalition_value().value(&lone), 0.0);
    }
}
