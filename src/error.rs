use thiserror::Error;

/// Errors that can occur while uploading or analyzing a contract.
#[derive(Error, Debug)]
pub enum ClauseGuardError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("API error: HTTP {status_code} - {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Stream ended without a terminal event")]
    IncompleteStream,

    #[error("Stream decode error: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("Stream line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("Malformed complete event: {0}")]
    MalformedComplete(String),

    #[error("Duplicate clause id in results: {0}")]
    DuplicateClauseId(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Coarse classification of a [`ClauseGuardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any network call was made.
    Validation,
    /// Connection, DNS or body read failure.
    Transport,
    /// The server answered, but not with a usable result.
    Protocol,
}

impl ClauseGuardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClauseGuardError::Validation(_) | ClauseGuardError::ConfigError(_) => {
                ErrorKind::Validation
            }
            ClauseGuardError::HttpError(_) => ErrorKind::Transport,
            ClauseGuardError::SerializationError(_)
            | ClauseGuardError::ApiError { .. }
            | ClauseGuardError::AnalysisFailed(_)
            | ClauseGuardError::IncompleteStream
            | ClauseGuardError::Decode(_)
            | ClauseGuardError::LineTooLong { .. }
            | ClauseGuardError::MalformedComplete(_)
            | ClauseGuardError::DuplicateClauseId(_) => ErrorKind::Protocol,
        }
    }
}
