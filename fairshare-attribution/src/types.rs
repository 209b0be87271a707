use std::{
    borrow::Borrow,
    collections::{btree_map, btree_set, BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

/// Opaque identifier of a party receiving credit (channel, feature, factor).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contributor(pub String);

impl Contributor {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Contributor {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for Contributor {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for Contributor {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Contributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds a contributor list from anything string-like.
pub fn contributors<I, S>(ids: I) -> Vec<Contributor>
where
    I: IntoIterator<Item = S>,
    S: Into<Contributor>,
{
    ids.into_iter().map(Into::into).collect()
}

/// Unordered set of contributors handed to a value function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coalition(BTreeSet<Contributor>);

impl Coalition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, contributor: Contributor) -> bool {
        self.0.insert(contributor)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Contributor> {
        self.0.iter()
    }
}

impl FromIterator<Contributor> for Coalition {
    fn from_iter<T: IntoIterator<Item = Contributor>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Coalition {
    type Item = &'a Contributor;
    type IntoIter = btree_set::Iter<'a, Contributor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Contributor -> credit mapping.
///
/// Every transformation returns a fresh vector. Normalized vectors sum to 1
/// (or to an explicit outcome value); raw Shapley output may carry negative
/// entries and sums to `value(N)` instead. Serializes as a flat JSON object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributionVector(BTreeMap<Contributor, f64>);

impl AttributionVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uniform(contributors: &[Contributor]) -> Self {
        if contributors.is_empty() {
            return Self::new();
        }
        let share = 1.0 / contributors.len() as f64;
        contributors.iter().map(|c| (c.clone(), share)).collect()
    }

    pub fn zeros(contributors: &[Contributor]) -> Self {
        contributors.iter().map(|c| (c.clone(), 0.0)).collect()
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.0.get(id).copied()
    }

    /// Weight for `id`, or 0 when the contributor is absent.
    pub fn weight(&self, id: &str) -> f64 {
        self.get(id).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Contributor, f64> {
        self.0.iter()
    }

    pub fn contributors(&self) -> impl Iterator<Item = &Contributor> {
        self.0.keys()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Rescales to sum to 1. Vectors with a non-positive or non-finite total
    /// are returned unchanged.
    pub fn normalized(&self) -> Self {
        self.scaled_to(1.0)
    }

    /// Rescales to sum to `outcome_value`, with the same zero-total rule as
    /// [`AttributionVector::normalized`].
    pub fn scaled_to(&self, outcome_value: f64) -> Self {
        let total = self.total();
        if !(total > 0.0) || !total.is_finite() {
            return self.clone();
        }
        self.iter()
            .map(|(c, w)| (c.clone(), w / total * outcome_value))
            .collect()
    }

    /// Negative entries replaced by 0.
    pub fn clipped(&self) -> Self {
        self.iter().map(|(c, w)| (c.clone(), w.max(0.0))).collect()
    }

    pub fn as_map(&self) -> &BTreeMap<Contributor, f64> {
        &self.0
    }

    pub fn into_inner(self) -> BTreeMap<Contributor, f64> {
        self.0
    }
}

impl From<BTreeMap<Contributor, f64>> for AttributionVector {
    fn from(map: BTreeMap<Contributor, f64>) -> Self {
        Self(map)
    }
}

impl FromIterator<(Contributor, f64)> for AttributionVector {
    fn from_iter<T: IntoIterator<Item = (Contributor, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AttributionVector {
    type Item = (&'a Contributor, &'a f64);
    type IntoIter = btree_map::Iter<'a, Contributor, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
