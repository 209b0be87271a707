use std::collections::BTreeMap;

use crate::types::{Coalition, Contributor};

/// Characteristic function scoring any coalition.
///
/// Implementations must be pure: the same coalition always yields the same
/// value, and the empty coalition scores 0. Estimators share one instance
/// across worker threads, hence the `Sync` bound. Any
/// `Fn(&Coalition) -> f64 + Sync` closure is a value function.
pub trait ValueFunction: Sync {
    fn value(&self, coalition: &Coalition) -> f64;
}

impl<F> ValueFunction for F
where
    F: Fn(&Coalition) -> f64 + Sync,
{
    fn value(&self, coalition: &Coalition) -> f64 {
        self(coalition)
    }
}

/// Pointwise sum of two games, `(v + w)(S) = v(S) + w(S)`.
pub struct GameSum<A, B>(pub A, pub B);

impl<A, B> ValueFunction for GameSum<A, B>
where
    A: ValueFunction,
    B: ValueFunction,
{
    fn value(&self, coalition: &Coalition) -> f64 {
        self.0.value(coalition) + self.1.value(coalition)
    }
}

/// `value({i})` for every contributor.
pub fn solo_contributions<V>(contributors: &[Contributor], value_fn: &V) -> BTreeMap<Contributor, f64>
where
    V: ValueFunction + ?Sized,
{
    contributors
        .iter()
        .map(|c| {
            let solo: Coalition = std::iter::once(c.clone()).collect();
            (c.clone(), value_fn.value(&solo))
        })
        .collect()
}

/// Coalition holding the whole contributor set.
pub fn grand_coalition(contributors: &[Contributor]) -> Coalition {
    contributors.iter().cloned().collect()
}
