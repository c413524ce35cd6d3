//! Progress observers for a running analysis.
//!
//! Any `FnMut(&ProgressUpdate)` closure is an observer. To consume updates
//! from another task, use [`progress_channel`].
//!
//! ```rust
//! use clauseguard::observer::progress_channel;
//! use futures::StreamExt;
//!
//! # async fn demo() {
//! let (observer, mut updates) = progress_channel();
//! tokio::spawn(async move {
//!     while let Some(update) = updates.next().await {
//!         println!("[ {} / {} ] {}", update.current, update.total, update.message);
//!     }
//! });
//! # drop(observer);
//! # }
//! ```

use crate::stream::ProgressUpdate;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Receives progress updates in arrival order.
pub trait ProgressObserver: Send {
    fn on_progress(&mut self, update: &ProgressUpdate);
}

impl<F> ProgressObserver for F
where
    F: FnMut(&ProgressUpdate) + Send,
{
    fn on_progress(&mut self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Observer that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _update: &ProgressUpdate) {}
}

/// Observer forwarding updates into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&mut self, update: &ProgressUpdate) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.tx.send(update.clone());
    }
}

/// Create a channel observer and the stream of updates it feeds.
pub fn progress_channel() -> (ChannelObserver, UnboundedReceiverStream<ProgressUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelObserver { tx }, UnboundedReceiverStream::new(rx))
}
