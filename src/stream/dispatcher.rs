//! Classification of decoded lines into protocol events.

use crate::error::ClauseGuardError;
use crate::stream::decoder::NdjsonLines;
use crate::stream::types::{CompleteData, ErrorData, EventStatus, ProgressUpdate, ProtocolEvent};
use crate::types::ClauseResult;
use futures::Stream;
use std::collections::HashSet;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{trace, warn};

/// Turns NDJSON lines into [`ProtocolEvent`]s and enforces that nothing
/// follows a terminal event.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    terminated: bool,
    skipped: usize,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one line.
    ///
    /// Returns `Ok(None)` for blank lines, for lines that are not a
    /// recognizable event (logged and skipped), and for anything after a
    /// terminal event.
    pub fn dispatch(&mut self, line: &str) -> Result<Option<ProtocolEvent>, ClauseGuardError> {
        if self.terminated {
            return Ok(None);
        }
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        trace!("analysis stream line: {}", line);

        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                self.skip(&format!("invalid JSON: {}", e));
                return Ok(None);
            }
        };

        let status = value
            .get("status")
            .and_then(|s| s.as_str())
            .and_then(EventStatus::parse);

        let event = match status {
            Some(EventStatus::Progress) => match serde_json::from_value::<ProgressUpdate>(value) {
                Ok(update) => ProtocolEvent::Progress(update),
                Err(e) => {
                    self.skip(&format!("invalid progress event: {}", e));
                    return Ok(None);
                }
            },
            Some(EventStatus::Complete) => {
                self.terminated = true;
                let data: CompleteData = serde_json::from_value(value)
                    .map_err(|e| ClauseGuardError::MalformedComplete(e.to_string()))?;
                check_unique_ids(&data.results)?;
                ProtocolEvent::Complete(data)
            }
            Some(EventStatus::Error) => {
                self.terminated = true;
                let mut data: ErrorData = serde_json::from_value(value).unwrap_or_default();
                if data.message.trim().is_empty() {
                    data.message = "analysis failed".to_string();
                }
                ProtocolEvent::Error(data)
            }
            None => {
                self.skip("missing or unknown status");
                return Ok(None);
            }
        };

        Ok(Some(event))
    }

    /// Whether a terminal event has been dispatched.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Number of lines skipped as malformed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn skip(&mut self, reason: &str) {
        self.skipped += 1;
        warn!("skipping malformed analysis event: {}", reason);
    }
}

fn check_unique_ids(results: &[ClauseResult]) -> Result<(), ClauseGuardError> {
    let mut seen = HashSet::with_capacity(results.len());
    for result in results {
        if !seen.insert(&result.id) {
            return Err(ClauseGuardError::DuplicateClauseId(result.id.to_string()));
        }
    }
    Ok(())
}

/// Stream of protocol events decoded from a chunked response body.
///
/// Ends right after the terminal event. If the body ends first, a final
/// [`ClauseGuardError::IncompleteStream`] is yielded. Dropping the stream
/// drops the underlying body and aborts the call.
pub struct ProtocolEvents<S> {
    lines: NdjsonLines<S>,
    dispatcher: EventDispatcher,
    done: bool,
}

impl<S> ProtocolEvents<S> {
    pub fn new(body: S, max_line_bytes: usize) -> Self {
        Self {
            lines: NdjsonLines::new(body, max_line_bytes),
            dispatcher: EventDispatcher::new(),
            done: false,
        }
    }

    /// Number of malformed lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.dispatcher.skipped()
    }
}

impl<S> fmt::Debug for ProtocolEvents<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolEvents")
            .field("dispatcher", &self.dispatcher)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<S, B> Stream for ProtocolEvents<S>
where
    S: Stream<Item = Result<B, ClauseGuardError>> + Unpin,
    B: AsRef<[u8]>,
{
    type Item = Result<ProtocolEvent, ClauseGuardError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.lines).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(line))) => match this.dispatcher.dispatch(&line) {
                    Ok(Some(event)) => {
                        this.done = event.is_terminal();
                        return Poll::Ready(Some(Ok(event)));
                    }
                    Ok(None) => continue,
                    Err(err) => {
                        this.done = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                },
                Poll::Ready(Some(Err(err))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(ClauseGuardError::IncompleteStream)));
                }
            }
        }
    }
}
