//! Producer abstraction.
//!
//! A producer is whatever generates the encoded event frames for one chat
//! turn: usually an agent runtime streaming completion tokens. The relay only
//! needs a pull-based source of opaque strings with an end-of-stream signal.
//!
//! # Design
//!
//! `next_chunk()` returns:
//! - `Ok(Some(chunk))` for the next encoded frame
//! - `Ok(None)` once the producer is exhausted
//! - `Err(_)` if the producer failed; the relay stops draining
//!
//! # Example
//!
//! ```ignore
//! let (tx, rx) = tokio::sync::mpsc::channel(16);
//! registry.create(rx)?;
//! tx.send("data: {\"x\":1}\n\n".to_string()).await?;
//! ```

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::ProducerError;

/// Pull-based source of encoded event frames.
#[async_trait]
pub trait Producer: Send + 'static {
    /// Await the next frame.
    async fn next_chunk(&mut self) -> Result<Option<String>, ProducerError>;
}

/// Type-erased producer, as returned by agents.
pub type BoxProducer = Box<dyn Producer>;

#[async_trait]
impl Producer for BoxProducer {
    async fn next_chunk(&mut self) -> Result<Option<String>, ProducerError> {
        (**self).next_chunk().await
    }
}

/// A channel receiver is a producer that never fails; it ends when every
/// sender is dropped.
#[async_trait]
impl Producer for mpsc::Receiver<String> {
    async fn next_chunk(&mut self) -> Result<Option<String>, ProducerError> {
        Ok(self.recv().await)
    }
}

/// A channel of results lets the sending side report failures.
#[async_trait]
impl Producer for mpsc::Receiver<Result<String, ProducerError>> {
    async fn next_chunk(&mut self) -> Result<Option<String>, ProducerError> {
        self.recv().await.transpose()
    }
}

/// Adapts any fallible `Stream` of frames into a [`Producer`].
#[derive(Debug)]
pub struct StreamProducer<S> {
    inner: S,
}

impl<S> StreamProducer<S> {
    /// Wrap a stream.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S, E> Producer for StreamProducer<S>
where
    S: Stream<Item = Result<String, E>> + Unpin + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async fn next_chunk(&mut self) -> Result<Option<String>, ProducerError> {
        match self.inner.next().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(ProducerError::Failed(e.to_string())),
            None => Ok(None),
        }
    }
}
