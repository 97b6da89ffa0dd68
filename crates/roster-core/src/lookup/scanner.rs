//! Latest-frame scan loop.
//!
//! Frames are pushed into a [`ScanFeed`], which holds only the newest one. A
//! running [`ScanSession`] decodes whatever frame is current, so frames that
//! arrive during a decode replace each other and are never queued.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::resolver::{LookupOutcome, LookupResolver};
use crate::error::SyncResult;

/// Capability that extracts the text of a visual code from a camera frame.
pub trait FrameDecoder: Send + Sync + 'static {
    type Frame: Send + Sync + 'static;

    /// `None` when the frame holds no readable code.
    fn decode_frame(&self, frame: &Self::Frame) -> Option<String>;
}

/// Producer side of the scan loop; keeps only the newest frame.
pub struct ScanFeed<F> {
    frames: watch::Sender<Option<Arc<F>>>,
}

impl<F: Send + Sync + 'static> Default for ScanFeed<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Send + Sync + 'static> ScanFeed<F> {
    pub fn new() -> Self {
        let (frames, _) = watch::channel(None);
        Self { frames }
    }

    /// Replace the pending frame.
    pub fn push_frame(&self, frame: F) {
        self.frames.send_replace(Some(Arc::new(frame)));
    }

    /// Start decoding frames and resolving what they carry.
    ///
    /// Suppressed repeats and frames without a code publish nothing. The loop
    /// stops when the feed or the session is dropped.
    pub fn start<D>(&self, decoder: D, resolver: Arc<LookupResolver>) -> ScanSession
    where
        D: FrameDecoder<Frame = F>,
    {
        let mut frames = self.frames.subscribe();
        let decoder = Arc::new(decoder);
        let (outcomes, receiver) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while frames.changed().await.is_ok() {
                let Some(frame) = frames.borrow_and_update().clone() else {
                    continue;
                };

                let decoder = Arc::clone(&decoder);
                let decoded =
                    match tokio::task::spawn_blocking(move || decoder.decode_frame(&frame)).await {
                        Ok(decoded) => decoded,
                        Err(error) => {
                            tracing::warn!("Frame decode task failed: {error}");
                            continue;
                        }
                    };
                let Some(text) = decoded else {
                    continue;
                };

                let outcome = resolver.resolve(&text).await;
                if matches!(outcome, Ok(LookupOutcome::Suppressed)) {
                    continue;
                }
                if outcomes.send(outcome).is_err() {
                    break;
                }
            }
        });

        ScanSession { receiver, handle }
    }
}

/// Running scan loop. Dropping it stops the loop.
pub struct ScanSession {
    receiver: mpsc::UnboundedReceiver<SyncResult<LookupOutcome>>,
    handle: JoinHandle<()>,
}

impl ScanSession {
    /// Next published outcome; `None` once the loop has stopped.
    pub async fn next_outcome(&mut self) -> Option<SyncResult<LookupOutcome>> {
        self.receiver.recv().await
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
