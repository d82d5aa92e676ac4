//! Configuration loading for stream-relay.
//!
//! Configuration is loaded from a TOML file (default: `relay.toml`).
//! Every section and every field is optional; missing values fall back to
//! the defaults below.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for stream-relay.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Per-channel buffering and polling configuration.
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Admission limits configuration.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// HTTP endpoints configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Idle channel reaper configuration.
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Built-in agent configuration.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP listener (default: 0.0.0.0:3000).
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

/// Per-channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// How often a caught-up reader re-checks the buffer, in ms (default: 100).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// A reader that sees no new entries for this long gives up (default: 300).
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Capacity of the queue between the tail loop and the HTTP body (default: 64).
    #[serde(default = "default_read_buffer")]
    pub read_buffer: usize,
}

/// Admission limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of live channels (default: 10000).
    #[serde(default = "default_max_channels")]
    pub max_channels: usize,
    /// Maximum chats per session id per minute (default: 30).
    #[serde(default = "default_chats_per_minute")]
    pub chats_per_minute: u32,
    /// Maximum chats per second across all sessions (default: 100).
    #[serde(default = "default_global_requests_per_second")]
    pub global_requests_per_second: u32,
    /// Maximum chat message length in bytes (default: 64 KiB).
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

/// HTTP endpoints configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Enable metrics endpoint (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

/// Cleanup task configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Cleanup interval in seconds (default: 60).
    #[serde(default = "default_cleanup_interval")]
    pub interval_secs: u64,
    /// Channels with no reader and no activity for this long are dropped
    /// (default: 900 = 15 minutes).
    #[serde(default = "default_channel_ttl")]
    pub channel_ttl_secs: u64,
    /// Enable cleanup task (default: true).
    #[serde(default = "default_cleanup_enabled")]
    pub enabled: bool,
}

/// Built-in agent configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Delay between streamed tokens in ms (default: 30).
    #[serde(default = "default_token_delay_ms")]
    pub token_delay_ms: u64,
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_idle_timeout_secs() -> u64 {
    300 // 5 minutes
}

fn default_read_buffer() -> usize {
    64
}

fn default_max_channels() -> usize {
    10_000
}

fn default_chats_per_minute() -> u32 {
    30
}

fn default_global_requests_per_second() -> u32 {
    100
}

fn default_max_message_len() -> usize {
    64 * 1024 // 64 KiB
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_cleanup_interval() -> u64 {
    60
}

fn default_channel_ttl() -> u64 {
    15 * 60
}

fn default_cleanup_enabled() -> bool {
    true
}

fn default_token_delay_ms() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            idle_timeout_secs: default_idle_timeout_secs(),
            read_buffer: default_read_buffer(),
        }
    }
}

impl ChannelConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reader idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_channels: default_max_channels(),
            chats_per_minute: default_chats_per_minute(),
            global_requests_per_second: default_global_requests_per_second(),
            max_message_len: default_max_message_len(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_cleanup_interval(),
            channel_ttl_secs: default_channel_ttl(),
            enabled: default_cleanup_enabled(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            token_delay_ms: default_token_delay_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or panic the relay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, bool); 7] = [
            ("channel.poll_interval_ms", self.channel.poll_interval_ms == 0),
            ("channel.idle_timeout_secs", self.channel.idle_timeout_secs == 0),
            ("channel.read_buffer", self.channel.read_buffer == 0),
            ("limits.max_channels", self.limits.max_channels == 0),
            ("limits.chats_per_minute", self.limits.chats_per_minute == 0),
            (
                "limits.global_requests_per_second",
                self.limits.global_requests_per_second == 0,
            ),
            ("cleanup.interval_secs", self.cleanup.interval_secs == 0),
        ];

        match checks.iter().find(|(_, is_zero)| *is_zero) {
            Some((field, _)) => Err(ConfigError::Invalid {
                field: *field,
                reason: "must be greater than zero".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value is out of range.
    #[error("invalid config value {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}
