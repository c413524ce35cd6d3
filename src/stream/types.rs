//! Type definitions for the NDJSON analysis stream.

use crate::types::ClauseResult;
use serde::{Deserialize, Serialize};

/// Discriminator values of the `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Progress,
    Complete,
    Error,
}

impl EventStatus {
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "progress" => Some(EventStatus::Progress),
            "complete" => Some(EventStatus::Complete),
            "error" => Some(EventStatus::Error),
            _ => None,
        }
    }
}

/// Progress update reported while the analysis runs.
///
/// `current` is passed through as sent and may momentarily exceed `total`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default)]
    pub current: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
        }
    }

    /// Completed fraction in `0.0..=1.0`, or `None` while the total is unknown.
    pub fn fraction(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some((self.current as f64 / self.total as f64).min(1.0))
    }
}

/// Final payload of a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteData {
    pub results: Vec<ClauseResult>,
}

/// Failure reported by the analysis backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(default)]
    pub message: String,
}

/// One event of the analysis stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProtocolEvent {
    Progress(ProgressUpdate),
    Complete(CompleteData),
    Error(ErrorData),
}

impl ProtocolEvent {
    pub fn status(&self) -> EventStatus {
        match self {
            ProtocolEvent::Progress(_) => EventStatus::Progress,
            ProtocolEvent::Complete(_) => EventStatus::Complete,
            ProtocolEvent::Error(_) => EventStatus::Error,
        }
    }

    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProtocolEvent::Progress(_))
    }
}
