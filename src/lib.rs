//! ClauseGuard Rust client for streamed contract risk analysis.
//!
//! Upload a contract, review the extracted text, then stream a clause-by-clause
//! risk analysis and align the results back onto the text.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use clauseguard::{AnalysisClient, AnalysisSession, Document, Outcome, ProgressUpdate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AnalysisClient::new("http://localhost:8000")?;
//!     let mut session = AnalysisSession::new(client, "your-api-key");
//!
//!     let document = Document::from_path("contract.pdf").await?;
//!     session.upload(&document).await?;
//!     println!("{}", session.document_text().unwrap_or_default());
//!
//!     let outcome = session
//!         .analyze(|p: &ProgressUpdate| println!("[ {} / {} ] {}", p.current, p.total, p.message))
//!         .await?;
//!
//!     if let Outcome::Done(report) = outcome {
//!         for highlight in report.highlights() {
//!             println!("line {}: {:?} {}", highlight.line, highlight.tier, highlight.result.reason);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Raw Event Stream
//!
//! ```rust,no_run
//! use clauseguard::{AnalysisClient, ProtocolEvent};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AnalysisClient::new("http://localhost:8000")?;
//!     let mut events = client.analyze_stream("Article 1 ...", "your-api-key").await?;
//!
//!     while let Some(event) = events.next().await {
//!         match event? {
//!             ProtocolEvent::Progress(p) => println!("{}", p.message),
//!             ProtocolEvent::Complete(data) => println!("{} clauses", data.results.len()),
//!             ProtocolEvent::Error(data) => println!("failed: {}", data.message),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod types;
mod error;
mod report;
pub mod align;
pub mod risk;
pub mod stream;
pub mod observer;
pub mod session;

pub use client::{AnalysisClient, AnalysisEvents, BodyStream};
pub use types::{ClauseId, ClauseResult, ClientConfig, Document, UploadedDocument};
pub use error::{ClauseGuardError, ErrorKind};
pub use report::{AnalysisReport, LineHighlight};
pub use align::{AlignmentIndex, ClauseAligner};
pub use risk::{RiskClassifier, RiskTier};
pub use stream::{ProgressUpdate, ProtocolEvent};
pub use observer::{progress_channel, ChannelObserver, NoProgress, ProgressObserver};
pub use session::{
    AnalysisSession, CancelHandle, FailureStage, Outcome, SessionFailure, SessionState,
};
