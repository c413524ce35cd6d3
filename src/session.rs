//! One contract upload followed by one streamed analysis.
//!
//! # Example
//!
//! ```rust,no_run
//! use clauseguard::{AnalysisClient, AnalysisSession, Document, Outcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AnalysisClient::new("http://localhost:8000")?;
//!     let mut session = AnalysisSession::new(client, "your-api-key");
//!
//!     // Abort the analysis if it takes longer than five minutes.
//!     let cancel = session.cancel_handle();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(std::time::Duration::from_secs(300)).await;
//!         cancel.cancel();
//!     });
//!
//!     let document = Document::from_path("contract.pdf").await?;
//!     let outcome = session
//!         .run(&document, |p: &clauseguard::ProgressUpdate| {
//!             println!("[ {} / {} ] {}", p.current, p.total, p.message)
//!         })
//!         .await?;
//!
//!     if let Outcome::Done(report) = outcome {
//!         println!("{} of {} clauses flagged", report.toxic_count(), report.results().len());
//!     }
//!     Ok(())
//! }
//! ```

use crate::client::AnalysisClient;
use crate::error::{ClauseGuardError, ErrorKind};
use crate::observer::ProgressObserver;
use crate::report::AnalysisReport;
use crate::stream::ProtocolEvent;
use crate::types::Document;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Step at which a session failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The document never produced text. The session returns to
    /// [`SessionState::Idle`] so another file can be uploaded.
    Upload,
    /// Text was extracted but the analysis did not complete.
    Analysis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFailure {
    pub stage: FailureStage,
    pub kind: ErrorKind,
    pub message: String,
}

/// Lifecycle of an [`AnalysisSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Uploading,
    AwaitingAnalysis,
    Streaming,
    Completed,
    Failed(SessionFailure),
    Cancelled,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Uploading => "uploading",
            SessionState::AwaitingAnalysis => "awaiting_analysis",
            SessionState::Streaming => "streaming",
            SessionState::Completed => "completed",
            SessionState::Failed(_) => "failed",
            SessionState::Cancelled => "cancelled",
        }
    }

    /// Whether the session can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed(_) | SessionState::Cancelled
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a session step that was not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    /// The session was cancelled; no further callbacks fire.
    Cancelled,
}

/// Cloneable handle that aborts a session from another task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Drives one upload and one streamed analysis.
///
/// A failed upload returns the session to `Idle` so a new file can be chosen.
/// Failed analyses, cancelled and completed sessions are terminal; to retry
/// an analysis, start a new session from the kept text with
/// [`AnalysisSession::from_text`].
pub struct AnalysisSession {
    id: Uuid,
    client: AnalysisClient,
    api_key: String,
    state: SessionState,
    document_text: Option<String>,
    report: Option<Arc<AnalysisReport>>,
    last_failure: Option<SessionFailure>,
    cancel: CancellationToken,
}

impl AnalysisSession {
    pub fn new(client: AnalysisClient, api_key: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            api_key: api_key.into(),
            state: SessionState::Idle,
            document_text: None,
            report: None,
            last_failure: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Start a session from already extracted text, ready for analysis.
    pub fn from_text(
        client: AnalysisClient,
        api_key: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let mut session = Self::new(client, api_key);
        session.document_text = Some(text.into());
        session.state = SessionState::AwaitingAnalysis;
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Extracted text, once the upload has succeeded.
    pub fn document_text(&self) -> Option<&str> {
        self.document_text.as_deref()
    }

    /// Replace the extracted text before starting the analysis.
    pub fn set_document_text(&mut self, text: impl Into<String>) -> Result<(), ClauseGuardError> {
        if self.state != SessionState::AwaitingAnalysis {
            return Err(self.invalid_step("edit the document text"));
        }
        self.document_text = Some(text.into());
        Ok(())
    }

    /// Most recent upload or analysis failure, kept after the session
    /// returns to `Idle` from a failed upload.
    pub fn last_failure(&self) -> Option<&SessionFailure> {
        self.last_failure.as_ref()
    }

    /// Report of the completed analysis.
    pub fn report(&self) -> Option<Arc<AnalysisReport>> {
        self.report.clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.cancel.clone(),
        }
    }

    /// Cancel the session. Has no effect on a terminal session.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if !self.state.is_terminal() {
            self.transition(SessionState::Cancelled);
        }
    }

    /// Upload a document and keep its extracted text for review.
    pub async fn upload(&mut self, document: &Document) -> Result<Outcome<()>, ClauseGuardError> {
        if self.state != SessionState::Idle {
            return Err(self.invalid_step("upload a document"));
        }
        self.require_api_key()?;
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled());
        }

        self.transition(SessionState::Uploading);

        let cancel = self.cancel.clone();
        let uploaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.client.upload(document, &self.api_key) => Some(result),
        };

        match uploaded {
            None => Ok(self.cancelled()),
            Some(Ok(uploaded)) => {
                self.document_text = Some(uploaded.text);
                self.transition(SessionState::AwaitingAnalysis);
                Ok(Outcome::Done(()))
            }
            Some(Err(err)) => Err(self.fail(FailureStage::Upload, err)),
        }
    }

    /// Analyze the (possibly edited) document text, reporting progress to
    /// `observer` in arrival order.
    pub async fn analyze<O>(
        &mut self,
        mut observer: O,
    ) -> Result<Outcome<Arc<AnalysisReport>>, ClauseGuardError>
    where
        O: ProgressObserver,
    {
        if self.state != SessionState::AwaitingAnalysis {
            return Err(self.invalid_step("start an analysis"));
        }
        self.require_api_key()?;
        if self.cancel.is_cancelled() {
            return Ok(self.cancelled());
        }

        let text = self.document_text.clone().unwrap_or_default();
        let cancel = self.cancel.clone();

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.client.analyze_stream(&text, &self.api_key) => Some(result),
        };
        let mut events = match opened {
            None => return Ok(self.cancelled()),
            Some(Ok(events)) => events,
            Some(Err(err)) => return Err(self.fail(FailureStage::Analysis, err)),
        };

        self.transition(SessionState::Streaming);

        let mut last_current = 0;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                next = events.next() => Some(next),
            };
            if next.is_none() || cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            match next.flatten() {
                Some(Ok(ProtocolEvent::Progress(update))) => {
                    if update.current < last_current {
                        warn!(
                            session = %self.id,
                            "Progress went backwards: {} -> {}",
                            last_current,
                            update.current
                        );
                    }
                    last_current = update.current;
                    observer.on_progress(&update);
                }
                Some(Ok(ProtocolEvent::Complete(data))) => {
                    let report = Arc::new(AnalysisReport::new(text, data.results));
                    info!(
                        session = %self.id,
                        "Analysis complete: {} clauses, {} toxic, {} malformed lines skipped",
                        report.results().len(),
                        report.toxic_count(),
                        events.skipped()
                    );
                    self.report = Some(Arc::clone(&report));
                    self.transition(SessionState::Completed);
                    return Ok(Outcome::Done(report));
                }
                Some(Ok(ProtocolEvent::Error(data))) => {
                    return Err(self.fail(
                        FailureStage::Analysis,
                        ClauseGuardError::AnalysisFailed(data.message),
                    ));
                }
                Some(Err(err)) => return Err(self.fail(FailureStage::Analysis, err)),
                None => {
                    let err = ClauseGuardError::IncompleteStream;
                    return Err(self.fail(FailureStage::Analysis, err));
                }
            }
        }
    }

    /// Upload `document` and analyze its text without a review step.
    pub async fn run<O>(
        &mut self,
        document: &Document,
        observer: O,
    ) -> Result<Outcome<Arc<AnalysisReport>>, ClauseGuardError>
    where
        O: ProgressObserver,
    {
        match self.upload(document).await? {
            Outcome::Done(()) => self.analyze(observer).await,
            Outcome::Cancelled => Ok(Outcome::Cancelled),
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!(session = %self.id, "Session state: {} -> {}", self.state, next);
        self.state = next;
    }

    fn cancelled<T>(&mut self) -> Outcome<T> {
        self.transition(SessionState::Cancelled);
        Outcome::Cancelled
    }

    fn require_api_key(&self) -> Result<(), ClauseGuardError> {
        if self.api_key.trim().is_empty() {
            return Err(ClauseGuardError::Validation(
                "an API key is required before contacting the server".to_string(),
            ));
        }
        Ok(())
    }

    fn fail(&mut self, stage: FailureStage, err: ClauseGuardError) -> ClauseGuardError {
        warn!(session = %self.id, "Session failed during {:?}: {}", stage, err);
        let failure = SessionFailure {
            stage,
            kind: err.kind(),
            message: err.to_string(),
        };
        self.last_failure = Some(failure.clone());
        match stage {
            FailureStage::Upload => self.transition(SessionState::Idle),
            FailureStage::Analysis => self.transition(SessionState::Failed(failure)),
        }
        err
    }

    fn invalid_step(&self, action: &str) -> ClauseGuardError {
        ClauseGuardError::Validation(format!(
            "cannot {} while the session is {}",
            action, self.state
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoProgress;
    use crate::risk::RiskTier;
    use crate::stream::ProgressUpdate;
    use crate::types::{ClauseId, ClientConfig};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_session(server: &MockServer, api_key: &str) -> AnalysisSession {
        let client =
            AnalysisClient::with_config(ClientConfig::new().base_url(server.uri())).unwrap();
        AnalysisSession::new(client, api_key)
    }

    fn contract() -> Document {
        Document::pdf("contract.pdf", b"%PDF-1.4".to_vec())
    }

    async fn mount_upload(server: &MockServer, text: &str) {
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "filename": "contract.pdf",
                "text": text
            })))
            .mount(server)
            .await;
    }

    async fn mount_analysis(server: &MockServer, body: &str) {
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "application/x-ndjson")
                    .set_body_string(body.to_string()),
            )
            .mount(server)
            .await;
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
            if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Serve one chunked NDJSON response: `first` right away, `second`
    /// only after `gap`.
    async fn serve_chunked(first: &'static str, second: &'static str, gap: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let head = "HTTP/1.1 200 OK\r\n\
                        Content-Type: application/x-ndjson\r\n\
                        Transfer-Encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            for (i, chunk) in [first, second].iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(gap).await;
                }
                let framed = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
                if socket.write_all(framed.as_bytes()).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });
        format!("http://{}", addr)
    }

    fn failure(session: &AnalysisSession) -> SessionFailure {
        match session.state() {
            SessionState::Failed(failure) => failure.clone(),
            other => panic!("Expected Failed state, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_end_to_end_analysis() {
        let server = MockServer::start().await;
        mount_upload(&server, "A.\nB.").await;
        mount_analysis(
            &server,
            concat!(
                "{\"status\":\"progress\",\"current\":0,\"total\":2,\"message\":\"start\"}\n",
                "{\"status\":\"progress\",\"current\":1,\"total\":2,\"message\":\"...\"}\n",
                "{\"status\":\"complete\",\"results\":[{\"id\":\"a\",\"clause\":\"A.\",\"is_toxic\":true,\"risk_score\":8.5,\"reason\":\"r\",\"suggestion\":\"s\"}]}\n"
            ),
        )
        .await;

        let mut session = create_session(&server, "test-api-key");
        let mut progress = Vec::new();
        let outcome = session
            .run(&contract(), |update: &ProgressUpdate| progress.push(update.clone()))
            .await
            .unwrap();

        let report = match outcome {
            Outcome::Done(report) => report,
            Outcome::Cancelled => panic!("Expected a completed analysis"),
        };
        let id = ClauseId::from("a");

        assert_eq!(session.state(), &SessionState::Completed);
        assert_eq!(
            progress,
            vec![ProgressUpdate::new(0, 2, "start"), ProgressUpdate::new(1, 2, "...")]
        );
        assert_eq!(report.results().len(), 1);
        assert_eq!(report.alignment().get(0), Some(&id));
        assert_eq!(report.alignment().get(1), None);
        assert_eq!(report.result(&id).map(|r| r.risk_tier()), Some(RiskTier::High));
        assert!(session.report().is_some());
    }

    #[tokio::test]
    async fn test_missing_api_key_never_reaches_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = create_session(&server, "   ");
        let err = session.upload(&contract()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[tokio::test]
    async fn test_upload_failure_allows_another_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "detail": "Only PDF files can be uploaded."
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_upload(&server, "Article 1").await;

        let mut session = create_session(&server, "key");
        let notes = Document::new("notes.txt", "text/plain", b"hi".to_vec());
        let err = session.upload(&notes).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.document_text().is_none());
        let failure = session.last_failure().cloned().unwrap();
        assert_eq!(failure.stage, FailureStage::Upload);
        assert_eq!(
            failure.message,
            "API error: HTTP 400 - Only PDF files can be uploaded."
        );

        let outcome = session.upload(&contract()).await.unwrap();
        assert!(matches!(outcome, Outcome::Done(())));
        assert_eq!(session.state(), &SessionState::AwaitingAnalysis);
        assert_eq!(session.document_text(), Some("Article 1"));
    }

    #[tokio::test]
    async fn test_error_event_fails_session_and_keeps_text() {
        let server = MockServer::start().await;
        mount_upload(&server, "Article 1\nArticle 2").await;
        mount_analysis(
            &server,
            "{\"status\":\"progress\",\"message\":\"loading\"}\n{\"status\":\"error\",\"message\":\"invalid API key\"}\n",
        )
        .await;

        let mut session = create_session(&server, "key");
        let err = session.run(&contract(), NoProgress).await.unwrap_err();

        assert!(matches!(
            err,
            ClauseGuardError::AnalysisFailed(ref m) if m == "invalid API key"
        ));
        let failure = failure(&session);
        assert_eq!(failure.stage, FailureStage::Analysis);
        assert_eq!(failure.kind, ErrorKind::Protocol);
        assert_eq!(session.document_text(), Some("Article 1\nArticle 2"));
        assert!(session.report().is_none());
        assert_eq!(session.last_failure(), Some(&failure));
    }

    #[tokio::test]
    async fn test_retry_analysis_from_kept_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .and(body_json(serde_json::json!({
                "text": "Article 1 wages may be withheld",
                "api_key": "key"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "{\"status\":\"complete\",\"results\":[{\"id\":1,\"clause\":\"Article 1 wages may be withheld\",\"is_toxic\":true,\"risk_score\":7.0}]}\n",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            AnalysisClient::with_config(ClientConfig::new().base_url(server.uri())).unwrap();
        let mut session =
            AnalysisSession::from_text(client, "key", "Article 1 wages may be withheld");

        assert_eq!(session.state(), &SessionState::AwaitingAnalysis);
        let outcome = session.analyze(NoProgress).await.unwrap();

        assert!(matches!(outcome, Outcome::Done(ref report) if report.toxic_count() == 1));
        assert_eq!(session.state(), &SessionState::Completed);
        assert!(session.last_failure().is_none());
    }

    #[tokio::test]
    async fn test_analysis_from_text_requires_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client =
            AnalysisClient::with_config(ClientConfig::new().base_url(server.uri())).unwrap();
        let mut session = AnalysisSession::from_text(client, "", "text");
        let err = session.analyze(NoProgress).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(session.state(), &SessionState::AwaitingAnalysis);
    }

    #[tokio::test]
    async fn test_stream_without_terminal_event_fails() {
        let server = MockServer::start().await;
        mount_upload(&server, "text").await;
        mount_analysis(
            &server,
            "{\"status\":\"progress\",\"current\":1,\"total\":3,\"message\":\"a\"}\n",
        )
        .await;

        let mut session = create_session(&server, "key");
        let mut calls = 0;
        let err = session
            .run(&contract(), |_: &ProgressUpdate| calls += 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ClauseGuardError::IncompleteStream));
        assert_eq!(calls, 1);
        assert_eq!(
            failure(&session).message,
            "Stream ended without a terminal event"
        );
    }

    #[tokio::test]
    async fn test_review_edit_is_analyzed() {
        let server = MockServer::start().await;
        mount_upload(&server, "Articel 1 typo").await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .and(body_json(serde_json::json!({
                "text": "Article 1 fixed",
                "api_key": "key"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "{\"status\":\"complete\",\"results\":[{\"id\":1,\"clause\":\"Article 1 fixed\",\"is_toxic\":false}]}",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = create_session(&server, "key");
        assert!(session.set_document_text("too early").is_err());

        session.upload(&contract()).await.unwrap();
        assert_eq!(session.state(), &SessionState::AwaitingAnalysis);
        assert_eq!(session.document_text(), Some("Articel 1 typo"));

        session.set_document_text("Article 1 fixed").unwrap();
        let outcome = session.analyze(NoProgress).await.unwrap();

        match outcome {
            Outcome::Done(report) => {
                assert_eq!(report.text(), "Article 1 fixed");
                assert_eq!(report.alignment().get(0), Some(&ClauseId::Number(1)));
                assert_eq!(report.toxic_count(), 0);
            }
            Outcome::Cancelled => panic!("Expected a completed analysis"),
        }
    }

    #[tokio::test]
    async fn test_cancel_in_flight_analysis() {
        let server = MockServer::start().await;
        mount_upload(&server, "text").await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(
                        "{\"status\":\"progress\",\"current\":1,\"total\":1,\"message\":\"late\"}\n",
                    )
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let mut session = create_session(&server, "key");
        session.upload(&contract()).await.unwrap();

        let cancel = session.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let mut calls = 0;
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            session.analyze(|_: &ProgressUpdate| calls += 1),
        )
        .await
        .expect("cancellation should end the analysis")
        .unwrap();

        assert!(matches!(outcome, Outcome::Cancelled));
        assert_eq!(calls, 0);
        assert_eq!(session.state(), &SessionState::Cancelled);
        assert!(session.report().is_none());
        assert_eq!(session.document_text(), Some("text"));
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_stops_callbacks() {
        let base_url = serve_chunked(
            "{\"status\":\"progress\",\"current\":1,\"total\":2,\"message\":\"first\"}\n",
            "{\"status\":\"progress\",\"current\":2,\"total\":2,\"message\":\"second\"}\n",
            Duration::from_secs(2),
        )
        .await;
        let client = AnalysisClient::new(base_url).unwrap();
        let mut session = AnalysisSession::from_text(client, "key", "A.");

        let cancel = session.cancel_handle();
        let mut seen = Vec::new();
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            session.analyze(|update: &ProgressUpdate| {
                seen.push(update.current);
                cancel.cancel();
            }),
        )
        .await
        .expect("cancellation should end the stream before the second chunk")
        .unwrap();

        assert!(matches!(outcome, Outcome::Cancelled));
        assert_eq!(seen, vec![1]);
        assert_eq!(session.state(), &SessionState::Cancelled);
        assert!(session.report().is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_analysis() {
        let server = MockServer::start().await;
        mount_upload(&server, "text").await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = create_session(&server, "key");
        session.upload(&contract()).await.unwrap();
        session.cancel();

        assert_eq!(session.state(), &SessionState::Cancelled);
        assert!(session.analyze(NoProgress).await.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_handle_stops_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = create_session(&server, "key");
        session.cancel_handle().cancel();

        let outcome = session.upload(&contract()).await.unwrap();
        assert!(matches!(outcome, Outcome::Cancelled));
        assert_eq!(session.state(), &SessionState::Cancelled);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SessionState::AwaitingAnalysis.to_string(), "awaiting_analysis");
        assert!(SessionState::Cancelled.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
    }
}
