//! Mapping of risk scores to severity tiers.

use crate::types::ClauseResult;
use serde::{Deserialize, Serialize};

/// Scores at or above this are [`RiskTier::High`].
pub const HIGH_THRESHOLD: f64 = 7.0;
/// Scores at or above this (and below [`HIGH_THRESHOLD`]) are [`RiskTier::Medium`].
pub const MEDIUM_THRESHOLD: f64 = 4.0;

/// Coarse severity bucket derived from a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

pub struct RiskClassifier;

impl RiskClassifier {
    /// Classify a score on the 0.0-10.0 scale. Missing and NaN scores are `Low`.
    pub fn classify(score: Option<f64>) -> RiskTier {
        match score {
            Some(s) if s >= HIGH_THRESHOLD => RiskTier::High,
            Some(s) if s >= MEDIUM_THRESHOLD => RiskTier::Medium,
            _ => RiskTier::Low,
        }
    }

    /// Classify a clause result.
    ///
    /// Non-toxic clauses are always `Low`. A toxic clause without any score is
    /// `Medium`: the backend only flags clauses scoring at least
    /// [`MEDIUM_THRESHOLD`].
    pub fn classify_result(result: &ClauseResult) -> RiskTier {
        if !result.is_toxic {
            return RiskTier::Low;
        }
        match result.effective_score() {
            Some(score) => Self::classify(Some(score)),
            None => RiskTier::Medium,
        }
    }
}
