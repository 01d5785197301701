//! Raw record streams
//!
//! An ingestion loop pulls samples from a [`RecordSource`] until the source
//! reports [`SourceError::Closed`]. Any other error is transient.

use aya::maps::{MapData, RingBuf};
use bytes::Bytes;
use std::future::Future;
use thiserror::Error;
use tokio::io::unix::AsyncFd;
use tokio::sync::{mpsc, watch};

/// Errors returned by a record source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source was closed, no further samples will arrive
    #[error("source closed")]
    Closed,

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A stream of raw samples for one category
pub trait RecordSource: Send {
    /// Wait for the next sample
    fn read(&mut self) -> impl Future<Output = Result<Bytes, SourceError>> + Send;
}

/// Source fed through an in-process channel
///
/// Closed once every sender is dropped and the buffer is drained, or as soon
/// as [`ChannelSource::close`] is called.
pub struct ChannelSource {
    rx: mpsc::Receiver<Bytes>,
    closed: bool,
}

/// Create a channel source and the sender feeding it
pub fn channel(capacity: usize) -> (mpsc::Sender<Bytes>, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, ChannelSource { rx, closed: false })
}

impl ChannelSource {
    /// Reject further sends and discard anything still buffered
    pub fn close(&mut self) {
        self.closed = true;
        self.rx.close();
    }
}

impl RecordSource for ChannelSource {
    async fn read(&mut self) -> Result<Bytes, SourceError> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        self.rx.recv().await.ok_or(SourceError::Closed)
    }
}

/// Source reading samples from a kernel ring buffer map
///
/// Setting the close signal to `true` (or dropping its sender) makes any
/// pending and every later read return [`SourceError::Closed`].
pub struct RingBufSource {
    ring: AsyncFd<RingBuf<MapData>>,
    closed: watch::Receiver<bool>,
}

impl RingBufSource {
    pub fn new(ring: RingBuf<MapData>, closed: watch::Receiver<bool>) -> Result<Self, SourceError> {
        Ok(Self {
            ring: AsyncFd::new(ring)?,
            closed,
        })
    }
}

impl RecordSource for RingBufSource {
    async fn read(&mut self) -> Result<Bytes, SourceError> {
        loop {
            let closed = *self.closed.borrow();
            if closed {
                return Err(SourceError::Closed);
            }

            tokio::select! {
                biased;

                changed = self.closed.changed() => {
                    if changed.is_err() {
                        return Err(SourceError::Closed);
                    }
                }
                ready = self.ring.readable_mut() => {
                    let mut guard = ready?;
                    if let Some(item) = guard.get_inner_mut().next() {
                        return Ok(Bytes::copy_from_slice(&item));
                    }
                    guard.clear_ready();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_source_delivers_in_order() {
        let (tx, mut source) = channel(4);
        tx.send(Bytes::from_static(b"first")).await.unwrap();
        tx.send(Bytes::from_static(b"second")).await.unwrap();
        drop(tx);

        assert_eq!(&source.read().await.unwrap()[..], b"first");
        assert_eq!(&source.read().await.unwrap()[..], b"second");
        assert!(matches!(source.read().await, Err(SourceError::Closed)));
    }

    #[tokio::test]
    async fn test_channel_source_close() {
        let (tx, mut source) = channel(4);
        source.close();

        assert!(tx.send(Bytes::from_static(b"late")).await.is_err());
        assert!(matches!(source.read().await, Err(SourceError::Closed)));
    }

    #[tokio::test]
    async fn test_channel_source_close_discards_buffered() {
        let (tx, mut source) = channel(4);
        tx.send(Bytes::from_static(b"buffered")).await.unwrap();
        source.close();

        assert!(matches!(source.read().await, Err(SourceError::Closed)));
        assert!(matches!(source.read().await, Err(SourceError::Closed)));
    }
}
