//! A single relay channel.
//!
//! An [`EventChannel`] couples one producer (the writer) to a sequence of
//! readers through an append-only [`EventLog`]:
//!
//! ```text
//!  producer ──drain task──► EventLog ◄──tail task── reader 1 (dropped)
//!                               ▲
//!                               └──────tail task── reader 2 (Last-Event-ID)
//! ```
//!
//! The writer never knows whether a reader exists. Readers replay whatever
//! is buffered (optionally after a resume cursor), then poll for new entries
//! every `poll_interval` until the terminal marker has been delivered. At
//! that point the log is cleared and the channel asks its registry to forget
//! it.
//!
//! Only one reader is active at a time. Attaching a new reader supersedes the
//! previous one, whose tail loop stops at its next iteration.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures_util::Stream;
use stream_core::{EventLog, ReplayScan, ResumePoint};
use stream_types::{ChannelId, EventId};
use tokio::sync::{mpsc, RwLock};

use crate::config::ChannelConfig;
use crate::error::RelayError;
use crate::producer::Producer;
use crate::server::RelayMetrics;

/// Lifecycle of the drain task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// `begin_write` has not run yet.
    Pending,
    /// The producer is being drained.
    Draining,
    /// The producer reported end of stream.
    Completed,
    /// The producer failed; draining stopped.
    Failed,
}

impl WriterState {
    /// Whether no further entries will be appended.
    pub fn is_done(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Log and writer state, guarded together so readers see a consistent
/// snapshot of "what is buffered" and "will more arrive".
#[derive(Debug)]
struct ChannelState {
    log: EventLog,
    writer: WriterState,
}

/// Why a tail loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadOutcome {
    /// Terminal marker delivered.
    Finished,
    /// Writer ended without a terminal marker and the reader caught up.
    WriterGone(WriterState),
    /// Nothing new for `idle_timeout`.
    IdleTimeout,
    /// The consumer dropped or closed the stream.
    Abandoned,
    /// A newer reader attached.
    Superseded,
    /// The log was already cleared by an earlier reader.
    AlreadyClosed,
}

/// One relay: an append-only event buffer with one writer and sequential
/// readers.
pub struct EventChannel {
    id: ChannelId,
    state: RwLock<ChannelState>,
    poll_interval: Duration,
    idle_timeout: Duration,
    read_buffer: usize,
    metrics: Arc<RelayMetrics>,
    writer_started: AtomicBool,
    /// Bumped on every `begin_read`; a tail loop exits once it no longer
    /// holds the latest generation.
    reader_generation: AtomicU64,
    readers: AtomicUsize,
    created_at: Instant,
    /// Milliseconds after `created_at` of the last append or reader detach.
    last_activity_ms: AtomicU64,
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("id", &self.id)
            .field("poll_interval", &self.poll_interval)
            .field("readers", &self.readers.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventChannel {
    /// Create a channel with a fresh id. No writer is attached yet.
    pub fn new(config: &ChannelConfig, metrics: Arc<RelayMetrics>) -> Arc<Self> {
        Self::with_id(ChannelId::new(), config, metrics)
    }

    /// Create a channel with a caller-chosen id.
    pub fn with_id(id: ChannelId, config: &ChannelConfig, metrics: Arc<RelayMetrics>) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: RwLock::new(ChannelState {
                log: EventLog::new(),
                writer: WriterState::Pending,
            }),
            poll_interval: config.poll_interval(),
            idle_timeout: config.idle_timeout(),
            read_buffer: config.read_buffer.max(1),
            metrics,
            writer_started: AtomicBool::new(false),
            reader_generation: AtomicU64::new(0),
            readers: AtomicUsize::new(0),
            created_at: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
        })
    }

    /// The channel id.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Start draining `producer` into the log on a background task.
    ///
    /// Returns immediately. A channel accepts exactly one writer over its
    /// lifetime.
    pub fn begin_write<P: Producer>(self: &Arc<Self>, producer: P) -> Result<(), RelayError> {
        if self.writer_started.swap(true, Ordering::AcqRel) {
            return Err(RelayError::WriterAlreadyStarted {
                channel: self.id.to_string(),
            });
        }

        let channel = Arc::clone(self);
        tokio::spawn(async move { channel.drain(producer).await });
        Ok(())
    }

    async fn drain<P: Producer>(&self, mut producer: P) {
        self.state.write().await.writer = WriterState::Draining;
        tracing::debug!(channel = %self.id, "Writer started");

        loop {
            match producer.next_chunk().await {
                Ok(Some(chunk)) => {
                    let mut state = self.state.write().await;
                    if state.log.append(chunk).is_err() {
                        // Log already delivered and cleared; nobody can read more.
                        state.writer = WriterState::Completed;
                        tracing::debug!(channel = %self.id, "Channel closed, dropping producer");
                        return;
                    }
                    drop(state);
                    self.touch();
                    self.metrics.events_buffered.fetch_add(1, Ordering::Relaxed);
                }
                Ok(None) => {
                    let mut state = self.state.write().await;
                    state.writer = WriterState::Completed;
                    tracing::debug!(
                        channel = %self.id,
                        events = state.log.len(),
                        bytes = state.log.total_bytes(),
                        terminal = state.log.has_terminal(),
                        "Writer completed"
                    );
                    return;
                }
                Err(e) => {
                    let mut state = self.state.write().await;
                    state.writer = WriterState::Failed;
                    self.metrics.producer_errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        channel = %self.id,
                        error = %e,
                        events = state.log.len(),
                        bytes = state.log.total_bytes(),
                        "Producer failed, draining stopped"
                    );
                    return;
                }
            }
        }
    }

    /// Attach a reader.
    ///
    /// The returned stream replays buffered entries after `last_event_id`
    /// (or from the start), then tails new entries until the terminal marker.
    /// When the reader sees the terminal marker the log is cleared and
    /// `on_finished` runs with this channel's id.
    ///
    /// Dropping or closing the stream stops the tail loop without running
    /// `on_finished`, so the client can reconnect and resume.
    pub fn begin_read<F>(self: &Arc<Self>, last_event_id: Option<EventId>, on_finished: F) -> EventStream
    where
        F: FnOnce(ChannelId) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.read_buffer);
        let generation = self.reader_generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.readers.fetch_add(1, Ordering::AcqRel);
        self.metrics.streams_opened.fetch_add(1, Ordering::Relaxed);

        let channel = Arc::clone(self);
        tokio::spawn(async move {
            let _attached = AttachGuard(&channel);
            let outcome = channel.tail(&tx, last_event_id, generation).await;
            channel.complete_read(tx, outcome, on_finished).await;
        });

        EventStream {
            channel: self.id,
            rx,
        }
    }

    async fn tail(
        &self,
        tx: &mpsc::Sender<String>,
        last_event_id: Option<EventId>,
        generation: u64,
    ) -> ReadOutcome {
        let mut scan = {
            let state = self.state.read().await;
            ReplayScan::resume(state.log.entries(), last_event_id.as_ref().map(EventId::as_str))
        };
        match scan.resume_point() {
            ResumePoint::Start => {}
            ResumePoint::AfterCursor(index) => {
                tracing::debug!(channel = %self.id, index, "Resuming after cursor");
            }
            ResumePoint::CursorNotFound => {
                tracing::debug!(
                    channel = %self.id,
                    cursor = ?last_event_id,
                    "Cursor not buffered, replaying from start"
                );
            }
        }

        let mut last_growth = Instant::now();
        loop {
            if self.reader_generation.load(Ordering::Acquire) != generation {
                return ReadOutcome::Superseded;
            }

            let (batch, writer, sealed) = {
                let state = self.state.read().await;
                (
                    scan.advance(state.log.entries()).to_vec(),
                    state.writer,
                    state.log.is_sealed(),
                )
            };
            if sealed {
                return ReadOutcome::AlreadyClosed;
            }

            if !batch.is_empty() {
                last_growth = Instant::now();
            }
            for entry in batch {
                if tx.send(entry).await.is_err() {
                    return ReadOutcome::Abandoned;
                }
            }

            if scan.is_finished() {
                return ReadOutcome::Finished;
            }
            if writer.is_done() {
                return ReadOutcome::WriterGone(writer);
            }
            if last_growth.elapsed() >= self.idle_timeout {
                return ReadOutcome::IdleTimeout;
            }

            tokio::select! {
                _ = tx.closed() => return ReadOutcome::Abandoned,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn complete_read<F>(&self, tx: mpsc::Sender<String>, outcome: ReadOutcome, on_finished: F)
    where
        F: FnOnce(ChannelId),
    {
        match outcome {
            ReadOutcome::Finished => {
                self.metrics.streams_completed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(channel = %self.id, "Stream finished");
            }
            ReadOutcome::WriterGone(writer) => {
                self.metrics.streams_timed_out.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    channel = %self.id,
                    writer = ?writer,
                    "Writer ended without a terminal marker, closing stream"
                );
            }
            ReadOutcome::IdleTimeout => {
                self.metrics.streams_timed_out.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    channel = %self.id,
                    idle_secs = self.idle_timeout.as_secs(),
                    "No new events, closing stream"
                );
            }
            ReadOutcome::Abandoned => {
                self.metrics.streams_abandoned.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(channel = %self.id, "Reader disconnected");
                return;
            }
            ReadOutcome::Superseded => {
                tracing::debug!(channel = %self.id, "Reader superseded by a newer one");
                return;
            }
            ReadOutcome::AlreadyClosed => {
                tracing::debug!(channel = %self.id, "Reader attached to a closed channel");
                return;
            }
        }

        // The stream ends only after deregistration.
        self.close().await;
        on_finished(self.id);
        drop(tx);
    }

    /// Clear and seal the log. Later appends are dropped.
    pub async fn close(&self) {
        self.state.write().await.log.clear();
    }

    /// Current writer state.
    pub async fn writer_state(&self) -> WriterState {
        self.state.read().await.writer
    }

    /// Number of buffered entries.
    pub async fn buffered(&self) -> usize {
        self.state.read().await.log.len()
    }

    /// Copy of the buffered entries, in order.
    pub async fn snapshot(&self) -> Vec<String> {
        self.state.read().await.log.entries().to_vec()
    }

    /// Number of readers currently attached.
    pub fn readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    /// Time since the last append, reader detach or creation.
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Acquire));
        self.created_at.elapsed().saturating_sub(last)
    }

    fn touch(&self) {
        let now = u64::try_from(self.created_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.last_activity_ms.store(now, Ordering::Release);
    }
}

/// Counts an attached reader for as long as its tail task runs.
struct AttachGuard<'a>(&'a EventChannel);

impl Drop for AttachGuard<'_> {
    fn drop(&mut self) {
        self.0.readers.fetch_sub(1, Ordering::AcqRel);
        self.0.touch();
    }
}

/// The reader side of a channel: buffered entries, then live ones, ending
/// after the terminal marker.
///
/// Dropping the stream (or calling [`EventStream::close`]) detaches the
/// reader; the channel stays registered for a later resume.
#[derive(Debug)]
pub struct EventStream {
    channel: ChannelId,
    rx: mpsc::Receiver<String>,
}

impl EventStream {
    /// The channel this stream reads from.
    pub fn channel_id(&self) -> ChannelId {
        self.channel
    }

    /// Await the next entry; `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Stop receiving. Entries already queued can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for EventStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
