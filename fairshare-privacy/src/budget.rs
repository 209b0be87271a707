use serde::{Deserialize, Serialize};

/// Informational view of a mechanism's spend. Nothing here is enforced; the
/// caller decides when to stop releasing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub epsilon: f64,
    pub delta: f64,
    pub epsilon_spent: f64,
    pub epsilon_remaining: f64,
    pub queries: u64,
    /// Advanced-composition bound for `queries` releases.
    pub composed_epsilon: f64,
}

/// Monotonic spend counter owned by a single mechanism.
#[derive(Clone, Debug, Default)]
pub struct PrivacyBudget {
    epsilon_spent: f64,
    queries: u64,
}

impl PrivacyBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Basic sequential composition: every release costs its full epsilon.
    pub fn record(&mut self, epsilon: f64) {
        self.epsilon_spent += epsilon;
        self.queries += 1;
    }

    pub fn epsilon_spent(&self) -> f64 {
        self.epsilon_spent
    }

    pub fn queries(&self) -> u64 {
        self.queries
    }

    pub fn remaining(&self, epsilon: f64) -> f64 {
        (epsilon - self.epsilon_spent).max(0.0)
    }

    pub fn snapshot(&self, epsilon: f64, delta: f64) -> BudgetSnapshot {
        BudgetSnapshot {
            epsilon,
            delta,
            epsilon_spent: self.epsilon_spent,
            epsilon_remaining: self.remaining(epsilon),
            queries: self.queries,
            composed_epsilon: advanced_composition(self.queries, epsilon, delta),
        }
    }
}

/// `sqrt(2 k ln(1/delta)) * epsilon` for `k` releases at `epsilon` each.
pub fn advanced_composition(n_queries: u64, epsilon: f64, delta: f64) -> f64 {
    if n_queries == 0 {
        return 0.0;
    }
    let delta = delta.clamp(1e-18, 0.999_999);
    let k = n_queries as f64;
    (2.0 * k * (1.0 / delta).ln()).sqrt() * epsilon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accumulates_linearly() {
        let mut budget = PrivacyBudget::new();
        for _ in 0..4 {
            budget.record(0.5);
        }
        assert_eq!(budget.queries(), 4);
        assert!((budget.epsilon_spent() - 2.0).abs() < 1e-12);
        assert_eq!(budget.remaining(0.5), 0.0);
    }

    #[test]
    fn composition_grows_with_square_root_of_queries() {
        let one = advanced_composition(1, 1.0, 1e-5);
        let four = advanced_composition(4, 1.0, 1e-5);
        assert!((four / one - 2.0).abs() < 1e-9);
        assert_eq!(advanced_composition(0, 1.0, 1e-5), 0.0);
    }

    #[test]
    fn snapshot_reports_remaining_and_composed() {
        let mut budget = PrivacyBudget::new();
        budget.record(0.25);
        let snapshot = budget.snapshot(1.0, 1e-5);
        assert!((snapshot.epsilon_remaining - 0.75).abs() < 1e-12);
        assert_eq!(snapshot.queries, 1);
        assert!(snapshot.composed_epsilon > snapshot.epsilon);
    }
}
