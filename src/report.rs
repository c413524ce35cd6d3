use crate::align::{AlignmentIndex, ClauseAligner};
use crate::risk::RiskTier;
use crate::types::{ClauseId, ClauseResult};
use chrono::{DateTime, Utc};

/// A line of the source text attached to a clause.
#[derive(Debug, Clone, PartialEq)]
pub struct LineHighlight<'a> {
    pub line: usize,
    pub result: &'a ClauseResult,
    pub tier: RiskTier,
}

/// Results of a completed analysis, aligned onto the analyzed text.
///
/// Immutable once built; sessions publish it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    text: String,
    results: Vec<ClauseResult>,
    alignment: AlignmentIndex,
    completed_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn new(text: impl Into<String>, results: Vec<ClauseResult>) -> Self {
        let text = text.into();
        let alignment = ClauseAligner::align(&text, &results);
        Self {
            text,
            results,
            alignment,
            completed_at: Utc::now(),
        }
    }

    /// The text the analysis ran on.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Results in backend order.
    pub fn results(&self) -> &[ClauseResult] {
        &self.results
    }

    pub fn alignment(&self) -> &AlignmentIndex {
        &self.alignment
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn result(&self, id: &ClauseId) -> Option<&ClauseResult> {
        self.results.iter().find(|r| &r.id == id)
    }

    pub fn toxic_results(&self) -> impl Iterator<Item = &ClauseResult> {
        self.results.iter().filter(|r| r.is_toxic)
    }

    pub fn toxic_count(&self) -> usize {
        self.toxic_results().count()
    }

    /// Line to scroll to when a clause is selected.
    pub fn anchor_line(&self, id: &ClauseId) -> Option<usize> {
        self.alignment.first_line_for(id)
    }

    /// Aligned lines with the clause and tier to render them with.
    pub fn highlights(&self) -> Vec<LineHighlight<'_>> {
        self.alignment
            .iter()
            .filter_map(|(line, id)| {
                let result = self.result(id)?;
                Some(LineHighlight {
                    line,
                    result,
                    tier: result.risk_tier(),
                })
            })
            .collect()
    }
}
