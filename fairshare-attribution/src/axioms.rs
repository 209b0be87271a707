//! Diagnostic checks for the four fairness axioms.
//!
//! Nothing here corrects a vector. Each check reports what it found, and
//! [`AxiomReport`] collects the findings into human-readable violations.
//! Failing checks are expected for non-Shapley vectors; a raw Markov result
//! has no reason to be additive.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    shapley::{ShapleyError, ShapleyEstimator},
    types::{AttributionVector, Contributor},
    value::{solo_contributions, ValueFunction},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AxiomConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

const fn default_enabled() -> bool {
    true
}

const fn default_tolerance() -> f64 {
    1e-6
}

impl Default for AxiomConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            tolerance: default_tolerance(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyCheck {
    pub satisfied: bool,
    pub error: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymmetryViolation {
    pub contributors: Vec<Contributor>,
    pub attributions: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymmetryCheck {
    pub satisfied: bool,
    pub violations: Vec<SymmetryViolation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NullPlayerCheck {
    pub satisfied: bool,
    pub violators: Vec<Contributor>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdditivityCheck {
    pub satisfied: bool,
    pub max_error: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "axiom", rename_all = "snake_case")]
pub enum AxiomViolation {
    Efficiency { error: f64 },
    Symmetry { cases: usize },
    NullPlayer { contributors: Vec<Contributor> },
    Additivity { max_error: f64 },
}

impl fmt::Display for AxiomViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxiomViolation::Efficiency { error } => write!(f, "efficiency violated: error={error:.3e}"),
            AxiomViolation::Symmetry { cases } => write!(f, "symmetry violated: {cases} cases"),
            AxiomViolation::NullPlayer { contributors } => {
                let ids: Vec<&str> = contributors.iter().map(Contributor::as_str).collect();
                write!(f, "null player violated: [{}]", ids.join(", "))
            }
            AxiomViolation::Additivity { max_error } => {
                write!(f, "additivity violated: max_error={max_error:.3e}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxiomReport {
    pub efficiency: EfficiencyCheck,
    pub symmetry: SymmetryCheck,
    pub null_player: NullPlayerCheck,
    /// `None` when no second game was available to test against.
    pub additivity: Option<AdditivityCheck>,
    pub violations: Vec<AxiomViolation>,
}

impl AxiomReport {
    pub fn all_satisfied(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Exact Shapley vector rescaled to an outcome value, with its report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CertifiedAttribution {
    pub attribution: AttributionVector,
    pub solo_contributions: BTreeMap<Contributor, f64>,
    pub report: AxiomReport,
}

#[derive(Clone, Copy, Debug)]
pub struct AxiomVerifier {
    tolerance: f64,
}

impl Default for AxiomVerifier {
    fn default() -> Self {
        Self::new(default_tolerance())
    }
}

impl AxiomVerifier {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn from_config(config: &AxiomConfig) -> Self {
        Self::new(config.tolerance)
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// `|sum(attrs) - outcome_value| < tol`.
    pub fn efficiency(&self, attrs: &AttributionVector, outcome_value: f64) -> EfficiencyCheck {
        let error = (attrs.total() - outcome_value).abs();
        EfficiencyCheck {
            satisfied: error < self.tolerance,
            error,
        }
    }

    /// Contributors with the same solo value (rounded to 10 places) must
    /// receive the same attribution.
    pub fn symmetry(
        &self,
        attrs: &AttributionVector,
        solo_contributions: &BTreeMap<Contributor, f64>,
    ) -> SymmetryCheck {
        let mut groups: BTreeMap<u64, Vec<&Contributor>> = BTreeMap::new();
        for (contributor, solo) in solo_contributions {
            if let Some(key) = symmetry_key(*solo) {
                groups.entry(key).or_default().push(contributor);
            }
        }
        let violations: Vec<SymmetryViolation> = groups
            .into_values()
            .filter(|members| members.len() > 1)
            .filter_map(|members| {
                let attributions: Vec<f64> =
                    members.iter().map(|c| attrs.weight(c.as_str())).collect();
                let first = attributions[0];
                let equal = attributions
                    .iter()
                    .all(|a| (a - first).abs() <= self.tolerance);
                (!equal).then(|| SymmetryViolation {
                    contributors: members.into_iter().cloned().collect(),
                    attributions,
                })
            })
            .collect();
        SymmetryCheck {
            satisfied: violations.is_empty(),
            violations,
        }
    }

    /// A contributor whose solo value is ~0 must receive ~0.
    pub fn null_player(
        &self,
        attrs: &AttributionVector,
        solo_contributions: &BTreeMap<Contributor, f64>,
    ) -> NullPlayerCheck {
        let violators: Vec<Contributor> = solo_contributions
            .iter()
            .filter(|(_, solo)| solo.abs() < self.tolerance)
            .filter(|(c, _)| attrs.weight(c.as_str()).abs() > self.tolerance)
            .map(|(c, _)| c.clone())
            .collect();
        NullPlayerCheck {
            satisfied: violators.is_empty(),
            violators,
        }
    }

    /// `combined[i] == a[i] + b[i]` for every contributor in `a` or `b`.
    pub fn additivity(
        &self,
        attrs_a: &AttributionVector,
        attrs_b: &AttributionVector,
        attrs_combined: &AttributionVector,
    ) -> AdditivityCheck {
        let max_error = attrs_a
            .contributors()
            .chain(attrs_b.contributors())
            .map(|c| {
                let expected = attrs_a.weight(c.as_str()) + attrs_b.weight(c.as_str());
                (expected - attrs_combined.weight(c.as_str())).abs()
            })
            .fold(0.0, f64::max);
        AdditivityCheck {
            satisfied: max_error < self.tolerance,
            max_error,
        }
    }

    /// Runs efficiency, symmetry and null-player checks on one vector.
    pub fn verify(
        &self,
        attrs: &AttributionVector,
        solo_contributions: &BTreeMap<Contributor, f64>,
        outcome_value: f64,
    ) -> AxiomReport {
        let efficiency = self.efficiency(attrs, outcome_value);
        let symmetry = self.symmetry(attrs, solo_contributions);
        let null_player = self.null_player(attrs, solo_contributions);

        let mut violations = Vec::new();
        if !efficiency.satisfied {
            violations.push(AxiomViolation::Efficiency {
                error: efficiency.error,
            });
        }
        if !symmetry.satisfied {
            violations.push(AxiomViolation::Symmetry {
                cases: symmetry.violations.len(),
            });
        }
        if !null_player.satisfied {
            violations.push(AxiomViolation::NullPlayer {
                contributors: null_player.violators.clone(),
            });
        }
        AxiomReport {
            efficiency,
            symmetry,
            null_player,
            additivity: None,
            violations,
        }
    }

    /// Attaches an additivity result to an existing report.
    pub fn with_additivity(&self, mut report: AxiomReport, check: AdditivityCheck) -> AxiomReport {
        if !check.satisfied {
            report.violations.push(AxiomViolation::Additivity {
                max_error: check.max_error,
            });
        }
        report.additivity = Some(check);
        report
    }

    /// Exact Shapley values rescaled to `outcome_value`, checked against
    /// solo contributions.
    pub fn certified_shapley<V>(
        &self,
        contributors: &[Contributor],
        value_fn: &V,
        outcome_value: f64,
    ) -> Result<CertifiedAttribution, ShapleyError>
    where
        V: ValueFunction + ?Sized,
    {
        let raw = ShapleyEstimator::default().exact(contributors, value_fn)?;
        let attribution = raw.scaled_to(outcome_value);
        let solo = solo_contributions(contributors, value_fn);
        let report = self.verify(&attribution, &solo, outcome_value);
        Ok(CertifiedAttribution {
            attribution,
            solo_contributions: solo,
            report,
        })
    }
}

/// Bit pattern of `value` rounded to 10 decimal places. Non-finite values
/// have no group.
fn symmetry_key(value: f64) -> Option<u64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = value * 1e10;
    let rounded = if scaled.is_finite() {
        scaled.round() / 1e10
    } else {
        value
    };
    // -0.0 and 0.0 share a group.
    Some((rounded + 0.0).to_bits())
}
