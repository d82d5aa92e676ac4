//! Error types for stream-relay.

/// Main error type for stream-relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// No live channel has this id (unknown, expired or malformed).
    #[error("channel not found: {channel}")]
    ChannelNotFound {
        /// The channel id as supplied by the caller.
        channel: String,
    },

    /// A producer is already draining into this channel.
    #[error("channel {channel} already has a writer")]
    WriterAlreadyStarted {
        /// The channel id.
        channel: String,
    },

    /// A channel with this id is already registered.
    #[error("channel {channel} is already registered")]
    DuplicateChannel {
        /// The channel id.
        channel: String,
    },

    /// The request was malformed.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Reason the request was rejected.
        reason: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded: {reason}")]
    RateLimited {
        /// Reason for rate limiting.
        reason: String,
    },

    /// Too many live channels.
    #[error("too many live channels (limit: {limit})")]
    AtCapacity {
        /// The configured channel limit.
        limit: usize,
    },

    /// The agent refused to start.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a producer while the relay drains it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProducerError {
    /// The upstream source failed.
    #[error("producer failed: {0}")]
    Failed(String),
}

/// Agent layer errors.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The agent refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Building an event frame failed.
    #[error("event encoding failed: {0}")]
    Encoding(#[from] stream_types::TypesError),
}

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
