//! Incremental decoding of the NDJSON analysis stream.
//!
//! The analysis endpoint answers with a chunked body of newline-delimited
//! JSON objects. [`NdjsonLines`] turns arbitrary byte chunks into lines and
//! [`ProtocolEvents`] classifies those lines into progress, complete and error
//! events.
//!
//! # Example
//!
//! ```rust
//! use clauseguard::stream::{ProtocolEvent, ProtocolEvents};
//! use clauseguard::ClauseGuardError;
//! use futures::StreamExt;
//!
//! # async fn demo() {
//! let chunks: Vec<Result<Vec<u8>, ClauseGuardError>> = vec![
//!     Ok(b"{\"status\":\"progress\",\"current\":1,".to_vec()),
//!     Ok(b"\"total\":2,\"message\":\"x\"}\n{\"status\":\"error\",\"message\":\"quota\"}".to_vec()),
//! ];
//! let mut events = ProtocolEvents::new(futures::stream::iter(chunks), 1 << 20);
//!
//! while let Some(event) = events.next().await {
//!     match event {
//!         Ok(ProtocolEvent::Progress(p)) => println!("[{} / {}] {}", p.current, p.total, p.message),
//!         Ok(ProtocolEvent::Complete(data)) => println!("{} clauses", data.results.len()),
//!         Ok(ProtocolEvent::Error(data)) => println!("failed: {}", data.message),
//!         Err(e) => println!("stream error: {}", e),
//!     }
//! }
//! # }
//! ```

mod decoder;
mod dispatcher;
mod types;

pub use decoder::{LineDecoder, NdjsonLines};
pub use dispatcher::{EventDispatcher, ProtocolEvents};
pub use types::{CompleteData, ErrorData, EventStatus, ProgressUpdate, ProtocolEvent};
