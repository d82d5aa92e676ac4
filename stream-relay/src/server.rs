//! Main StreamRelay coordination.
//!
//! StreamRelay owns the channel registry, the agent, admission limits and
//! metrics, and is shared (behind an `Arc`) by every HTTP handler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stream_types::{ChannelCreated, ChatRequest, EventId};

use crate::agent::{ChatAgent, EchoAgent};
use crate::channel::EventStream;
use crate::config::Config;
use crate::error::{RelayError, Result};
use crate::limits::RateLimits;
use crate::registry::ChannelRegistry;

/// Operational metrics for monitoring relay activity.
///
/// All counters are monotonically increasing (reset only on restart).
/// Thread-safe via `AtomicU64`, no locks needed for incrementing.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Total chat requests accepted.
    pub chats_total: AtomicU64,
    /// Total channels created.
    pub channels_created: AtomicU64,
    /// Total events appended to channel logs.
    pub events_buffered: AtomicU64,
    /// Total producers that failed while draining.
    pub producer_errors: AtomicU64,
    /// Total readers attached.
    pub streams_opened: AtomicU64,
    /// Total readers that received the terminal marker.
    pub streams_completed: AtomicU64,
    /// Total readers that disconnected before the terminal marker.
    pub streams_abandoned: AtomicU64,
    /// Total readers closed because the writer died or went idle.
    pub streams_timed_out: AtomicU64,
    /// Total lookups of unknown channel ids.
    pub not_found: AtomicU64,
    /// Total channels removed by the idle reaper.
    pub channels_reaped: AtomicU64,
    /// Total rate limit and capacity rejections.
    pub rate_limit_hits: AtomicU64,
}

/// Main relay server state.
pub struct StreamRelay {
    config: Config,
    registry: ChannelRegistry,
    /// Rate limiters for chat admission.
    rate_limits: RateLimits,
    /// Operational metrics (counters, gauges).
    metrics: Arc<RelayMetrics>,
    agent: Arc<dyn ChatAgent>,
}

impl std::fmt::Debug for StreamRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRelay")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("rate_limits", &self.rate_limits)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl StreamRelay {
    /// Create a new StreamRelay with the given config and agent.
    pub fn new(config: Config, agent: Arc<dyn ChatAgent>) -> Self {
        let metrics = Arc::new(RelayMetrics::default());
        let registry = ChannelRegistry::new(config.channel.clone(), Arc::clone(&metrics));
        let rate_limits = RateLimits::new(&config.limits);
        Self {
            config,
            registry,
            rate_limits,
            metrics,
            agent,
        }
    }

    /// Create a StreamRelay backed by the built-in [`EchoAgent`].
    pub fn with_echo_agent(config: Config) -> Self {
        let agent = EchoAgent::new(Duration::from_millis(config.agent.token_delay_ms));
        Self::new(config, Arc::new(agent))
    }

    /// Get the relay configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the channel registry.
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Get access to the rate limiters.
    pub fn rate_limits(&self) -> &RateLimits {
        &self.rate_limits
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &RelayMetrics {
        &self.metrics
    }

    /// Admit a chat request, start the agent and open a channel for its
    /// output.
    pub fn start_chat(&self, request: &ChatRequest) -> Result<ChannelCreated> {
        if let Err(e) = self.admit(request) {
            if matches!(e, RelayError::RateLimited { .. } | RelayError::AtCapacity { .. }) {
                self.metrics.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
            }
            tracing::warn!(session = %request.session_id, error = %e, "Chat rejected");
            return Err(e);
        }

        let producer = self.agent.start(request)?;
        let created = self.registry.create(producer)?;
        self.metrics.chats_total.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            session = %request.session_id,
            channel = %created.channel,
            timeline = request.timeline,
            "Chat started"
        );
        Ok(created)
    }

    fn admit(&self, request: &ChatRequest) -> Result<()> {
        let limits = &self.config.limits;
        if request.message.trim().is_empty() {
            return Err(RelayError::InvalidRequest {
                reason: "message must not be empty".to_string(),
            });
        }
        if request.message.len() > limits.max_message_len {
            return Err(RelayError::InvalidRequest {
                reason: format!(
                    "message too long: {} > {} bytes",
                    request.message.len(),
                    limits.max_message_len
                ),
            });
        }
        if self.registry.len() >= limits.max_channels {
            return Err(RelayError::AtCapacity {
                limit: limits.max_channels,
            });
        }
        self.rate_limits
            .check_global()
            .and_then(|()| self.rate_limits.check_session(&request.session_id))
            .map_err(|e| RelayError::RateLimited {
                reason: e.to_string(),
            })
    }

    /// Attach a reader to `channel`, resuming after `last_event_id`.
    pub fn open_stream(&self, channel: &str, last_event_id: Option<EventId>) -> Result<EventStream> {
        self.registry.open_stream(channel, last_event_id)
    }

    /// Get total live channels.
    pub fn total_channels(&self) -> usize {
        self.registry.len()
    }

    /// Get total attached readers.
    pub fn total_readers(&self) -> usize {
        self.registry.attached_readers()
    }
}
