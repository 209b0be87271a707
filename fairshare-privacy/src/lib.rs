//! Differential-privacy release layer for finished attribution vectors.
//!
//! The mechanism privatizes any ordered `key -> weight` map and knows nothing
//! about the attribution data model.
//! Spend is tracked per [`PrivacyMechanism`] instance with basic sequential
//! composition, and the advanced-composition bound is exposed alongside for
//! callers that reason about the tighter regime.

pub mod budget;
pub mod config;
pub mod dp;

pub use budget::{advanced_composition, BudgetSnapshot, PrivacyBudget};
pub use config::PrivacyConfig;
pub use dp::{DpError, PrivacyMechanism};
