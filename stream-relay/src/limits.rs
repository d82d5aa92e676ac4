//! Rate limiting for stream-relay.
//!
//! Chat admission is limited two ways:
//! - **session id** for per-user chat frequency
//! - a global limiter capping aggregate chat starts across all sessions
//!
//! Reads (`GET /event`) are not limited: a reader only attaches to an
//! existing channel and the number of channels is already bounded.
//!
//! Both use the governor crate; the keyed limiter is backed by DashMap.

use crate::config::LimitsConfig;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Type alias for a keyed rate limiter using DashMap.
type KeyedLimiter<K> = RateLimiter<
    K,
    dashmap::DashMap<K, InMemoryState>,
    DefaultClock,
    NoOpMiddleware<governor::clock::QuantaInstant>,
>;

/// Type alias for a direct (non-keyed) rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiters for chat admission.
#[derive(Clone)]
pub struct RateLimits {
    /// Limits chats per session id.
    ///
    /// Configured via `limits.chats_per_minute`.
    session_limiter: Arc<KeyedLimiter<String>>,

    /// Caps chat starts across all sessions.
    ///
    /// Configured via `limits.global_requests_per_second`.
    global_limiter: Arc<DirectLimiter>,
}

impl std::fmt::Debug for RateLimits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimits")
            .field("session_limiter", &"KeyedLimiter<String>")
            .field("tracked_sessions", &self.session_limiter.len())
            .field("global_limiter", &"DirectLimiter")
            .finish()
    }
}

impl RateLimits {
    /// Create rate limiters from configuration.
    ///
    /// Zero quotas are rejected by [`crate::config::Config::validate`]; if one
    /// slips through it is treated as one.
    pub fn new(config: &LimitsConfig) -> Self {
        let chats_per_minute = NonZeroU32::new(config.chats_per_minute).unwrap_or(NonZeroU32::MIN);
        let session_quota = Quota::per_minute(chats_per_minute);

        let global_rps =
            NonZeroU32::new(config.global_requests_per_second).unwrap_or(NonZeroU32::MIN);
        let global_quota = Quota::per_second(global_rps);

        Self {
            session_limiter: Arc::new(RateLimiter::keyed(session_quota)),
            global_limiter: Arc::new(RateLimiter::direct(global_quota)),
        }
    }

    /// Check if a chat from `session_id` is allowed.
    pub fn check_session(&self, session_id: &str) -> Result<(), RateLimitError> {
        self.session_limiter
            .check_key(&session_id.to_string())
            .map_err(|_| RateLimitError::SessionLimitExceeded)
    }

    /// Check if the global chat rate is within limits.
    pub fn check_global(&self) -> Result<(), RateLimitError> {
        self.global_limiter
            .check()
            .map_err(|_| RateLimitError::GlobalLimitExceeded)
    }

    /// Get the number of tracked session keys (for metrics).
    pub fn session_keys_count(&self) -> usize {
        self.session_limiter.len()
    }

    /// Evict sessions whose quota has fully recharged.
    ///
    /// Called periodically from the cleanup task.
    pub fn shrink(&self) {
        self.session_limiter.retain_recent();
    }
}

/// Rate limit error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    /// Too many chats from this session.
    SessionLimitExceeded,
    /// Global chat rate exceeded across all sessions.
    GlobalLimitExceeded,
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionLimitExceeded => write!(f, "session chat rate limit exceeded"),
            Self::GlobalLimitExceeded => write!(f, "global rate limit exceeded"),
        }
    }
}

impl std::error::Error for RateLimitError {}
