//! Incremental newline-delimited decoding of a chunked byte stream.
//!
//! Chunks may split lines, and UTF-8 sequences, at any byte. Bytes are
//! buffered until a `\n` arrives and only complete lines are validated as
//! UTF-8, so a character straddling two chunks decodes correctly. At most one
//! partial line is retained between chunks.

use crate::error::ClauseGuardError;
use futures::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Stateful line splitter for a single stream.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    max_line_bytes: usize,
}

impl LineDecoder {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_bytes,
        }
    }

    /// Feed one chunk, appending every line it completes to `out`.
    ///
    /// Lines completed before a failure are still appended.
    pub fn push(
        &mut self,
        chunk: &[u8],
        out: &mut VecDeque<String>,
    ) -> Result<(), ClauseGuardError> {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            self.extend(&rest[..pos])?;
            out.push_back(self.take_line()?);
            rest = &rest[pos + 1..];
        }
        self.extend(rest)
    }

    /// End of stream: flush the trailing unterminated fragment, if any.
    pub fn finish(&mut self) -> Result<Option<String>, ClauseGuardError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let line = self.take_line()?;
        self.buffer = Vec::new();
        Ok(Some(line))
    }

    /// Bytes currently held back waiting for a newline.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn extend(&mut self, bytes: &[u8]) -> Result<(), ClauseGuardError> {
        if self.buffer.len() + bytes.len() > self.max_line_bytes {
            self.buffer.clear();
            return Err(ClauseGuardError::LineTooLong {
                limit: self.max_line_bytes,
            });
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    fn take_line(&mut self) -> Result<String, ClauseGuardError> {
        let mut end = self.buffer.len();
        if end > 0 && self.buffer[end - 1] == b'\r' {
            end -= 1;
        }
        let decoded = std::str::from_utf8(&self.buffer[..end]).map(str::to_owned);
        self.buffer.clear();
        Ok(decoded?)
    }
}

/// Stream of decoded lines over a stream of byte chunks.
///
/// A transport or decode failure is yielded once, after any lines that
/// preceded it, and ends the stream.
pub struct NdjsonLines<S> {
    inner: S,
    decoder: LineDecoder,
    ready: VecDeque<String>,
    failure: Option<ClauseGuardError>,
    finished: bool,
}

impl<S> NdjsonLines<S> {
    pub fn new(inner: S, max_line_bytes: usize) -> Self {
        Self {
            inner,
            decoder: LineDecoder::new(max_line_bytes),
            ready: VecDeque::new(),
            failure: None,
            finished: false,
        }
    }
}

impl<S, B> Stream for NdjsonLines<S>
where
    S: Stream<Item = Result<B, ClauseGuardError>> + Unpin,
    B: AsRef<[u8]>,
{
    type Item = Result<String, ClauseGuardError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(line) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }
            if let Some(err) = this.failure.take() {
                return Poll::Ready(Some(Err(err)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => {
                    if let Err(err) = this.decoder.push(chunk.as_ref(), &mut this.ready) {
                        this.failure = Some(err);
                        this.finished = true;
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    this.failure = Some(err);
                    this.finished = true;
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    match this.decoder.finish() {
                        Ok(Some(line)) => this.ready.push_back(line),
                        Ok(None) => {}
                        Err(err) => this.failure = Some(err),
                    }
                }
            }
        }
    }
}
