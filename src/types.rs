use crate::risk::{RiskClassifier, RiskTier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Configuration for the analysis client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub upload_path: String,
    pub analyze_path: String,
    /// Total timeout for the upload call. The streamed analysis call has none;
    /// callers bound it through cancellation.
    pub upload_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Longest single NDJSON line accepted from the analysis stream.
    pub max_line_bytes: usize,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            upload_path: "/upload".to_string(),
            analyze_path: "/analyze".to_string(),
            upload_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_line_bytes: 16 * 1024 * 1024,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.upload_path = path.into();
        self
    }

    pub fn analyze_path(mut self, path: impl Into<String>) -> Self {
        self.analyze_path = path.into();
        self
    }

    pub fn upload_timeout_secs(mut self, timeout: u64) -> Self {
        self.upload_timeout_secs = timeout;
        self
    }

    pub fn connect_timeout_secs(mut self, timeout: u64) -> Self {
        self.connect_timeout_secs = timeout;
        self
    }

    pub fn max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a clause within one analysis run.
///
/// The backend numbers clauses, but the id is treated as opaque: fractional
/// or out-of-range numbers and string ids are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClauseId {
    Number(i64),
    OtherNumber(serde_json::Number),
    Text(String),
}

impl fmt::Display for ClauseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseId::Number(n) => write!(f, "{}", n),
            ClauseId::OtherNumber(n) => write!(f, "{}", n),
            ClauseId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ClauseId {
    fn from(id: i64) -> Self {
        ClauseId::Number(id)
    }
}

impl From<&str> for ClauseId {
    fn from(id: &str) -> Self {
        ClauseId::Text(id.to_string())
    }
}

impl From<String> for ClauseId {
    fn from(id: String) -> Self {
        ClauseId::Text(id)
    }
}

/// Analysis of a single contract clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseResult {
    pub id: ClauseId,
    pub clause: String,
    pub is_toxic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Legacy 0.0-1.0 score emitted by older backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub suggestion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_used: Option<String>,
}

impl ClauseResult {
    /// Score on the 0.0-10.0 scale, falling back to the scaled legacy score.
    pub fn effective_score(&self) -> Option<f64> {
        self.risk_score.or_else(|| self.score.map(|s| s * 10.0))
    }

    /// Severity tier for this clause, taking `is_toxic` into account.
    pub fn risk_tier(&self) -> RiskTier {
        RiskClassifier::classify_result(self)
    }
}

/// A contract document to upload for text extraction.
#[derive(Debug, Clone)]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn pdf(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(file_name, "application/pdf", bytes)
    }

    /// Read a PDF document from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self::pdf(file_name, bytes))
    }
}

/// Text extracted from an uploaded document.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedDocument {
    pub text: String,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub text: &'a str,
    pub api_key: &'a str,
}

/// Error body returned on a non-2xx response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub(crate) fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
