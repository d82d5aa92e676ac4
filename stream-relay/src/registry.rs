//! Channel registry.
//!
//! Maps channel ids to live [`EventChannel`]s. A channel is registered when
//! its writer starts and removed when a reader has received the terminal
//! marker (or the idle reaper expires it).
//!
//! The registry is a cheap-to-clone handle over a shared `DashMap`; one is
//! built at startup and handed to every request handler. Tests build their
//! own isolated instances.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use stream_types::{ChannelCreated, ChannelId, EventId};

use crate::channel::{EventChannel, EventStream};
use crate::config::ChannelConfig;
use crate::error::{RelayError, Result};
use crate::producer::Producer;
use crate::server::RelayMetrics;

/// Thread-safe registry of live channels.
#[derive(Clone)]
pub struct ChannelRegistry {
    channels: Arc<DashMap<ChannelId, Arc<EventChannel>>>,
    config: ChannelConfig,
    metrics: Arc<RelayMetrics>,
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channels.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new(config: ChannelConfig, metrics: Arc<RelayMetrics>) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            config,
            metrics,
        }
    }

    /// Create a channel, register it and start draining `producer` into it.
    ///
    /// Returns the body for the `POST /chat` response.
    pub fn create<P: Producer>(&self, producer: P) -> Result<ChannelCreated> {
        let channel = EventChannel::new(&self.config, Arc::clone(&self.metrics));
        let id = channel.id();

        self.register(Arc::clone(&channel))?;
        channel.begin_write(producer)?;
        self.metrics.channels_created.fetch_add(1, Ordering::Relaxed);

        tracing::info!(channel = %id, live = self.len(), "Channel created");
        Ok(ChannelCreated::success(id))
    }

    /// Register a channel under its id.
    ///
    /// Ids are random UUIDs, so a duplicate means a bug; the existing entry
    /// is kept.
    pub fn register(&self, channel: Arc<EventChannel>) -> Result<()> {
        match self.channels.entry(channel.id()) {
            Entry::Occupied(_) => {
                tracing::error!(channel = %channel.id(), "Duplicate channel id");
                Err(RelayError::DuplicateChannel {
                    channel: channel.id().to_string(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(channel);
                Ok(())
            }
        }
    }

    /// Look up a channel by its textual id.
    ///
    /// Malformed ids are reported as not found.
    pub fn lookup(&self, id: &str) -> Result<Arc<EventChannel>> {
        let found = ChannelId::parse(id).ok().and_then(|parsed| self.get(&parsed));
        found.ok_or_else(|| {
            self.metrics.not_found.fetch_add(1, Ordering::Relaxed);
            RelayError::ChannelNotFound {
                channel: id.to_string(),
            }
        })
    }

    /// Get a channel by id.
    pub fn get(&self, id: &ChannelId) -> Option<Arc<EventChannel>> {
        self.channels.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a channel. Removing an absent id is a no-op.
    ///
    /// Returns whether a channel was removed.
    pub fn remove(&self, id: &ChannelId) -> bool {
        let removed = self.channels.remove(id).is_some();
        if removed {
            tracing::debug!(channel = %id, live = self.len(), "Channel removed");
        }
        removed
    }

    /// Attach a reader to the channel `id`.
    ///
    /// The channel removes itself from this registry once the reader has
    /// received the terminal marker.
    pub fn open_stream(&self, id: &str, last_event_id: Option<EventId>) -> Result<EventStream> {
        let channel = self.lookup(id)?;
        self.attach(channel, last_event_id)
    }

    /// Attach a reader to a channel obtained from [`lookup`](Self::lookup).
    ///
    /// The reader counts as attached before registration is re-checked, so a
    /// concurrent [`reap_idle`](Self::reap_idle) either keeps the channel or
    /// the reader is refused with `ChannelNotFound`.
    fn attach(&self, channel: Arc<EventChannel>, last_event_id: Option<EventId>) -> Result<EventStream> {
        let registry = self.clone();
        tracing::debug!(channel = %channel.id(), cursor = ?last_event_id, "Reader attached");
        let stream = channel.begin_read(last_event_id, move |finished| {
            registry.remove(&finished);
        });

        if !self.channels.contains_key(&channel.id()) {
            self.metrics.not_found.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(channel = %channel.id(), "Channel removed while attaching");
            return Err(RelayError::ChannelNotFound {
                channel: channel.id().to_string(),
            });
        }
        Ok(stream)
    }

    /// Number of live channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check if no channels are live.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Total readers attached across all channels.
    pub fn attached_readers(&self) -> usize {
        self.channels.iter().map(|entry| entry.value().readers()).sum()
    }

    /// Remove channels that have no reader and no activity for `ttl`.
    ///
    /// Their logs are sealed, which also stops their producers at the next
    /// chunk. Returns the number of channels removed.
    pub async fn reap_idle(&self, ttl: Duration) -> usize {
        // Collect first: no shard lock may be held across an await.
        let stale: Vec<Arc<EventChannel>> = self
            .channels
            .iter()
            .filter(|entry| entry.value().readers() == 0 && entry.value().idle_for() >= ttl)
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut reaped = 0;
        for channel in stale {
            // A reader may have attached since the scan.
            let removed = self
                .channels
                .remove_if(&channel.id(), |_, live| live.readers() == 0)
                .is_some();
            if removed {
                tracing::debug!(channel = %channel.id(), live = self.len(), "Idle channel reaped");
                channel.close().await;
                reaped += 1;
            }
        }
        if reaped > 0 {
            self.metrics
                .channels_reaped
                .fetch_add(reaped as u64, Ordering::Relaxed);
        }
        reaped
    }
}
