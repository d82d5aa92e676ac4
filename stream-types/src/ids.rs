//! Identity and resume-cursor types for agentcast.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A unique identifier for one relay channel.
///
/// UUID v4 (122 random bits), displayed as 32 lowercase hex characters.
/// Collisions between live channels are a correctness bug, so the id space
/// is kept wide rather than short.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(uuid::Uuid);

impl ChannelId {
    /// Create a new random ChannelId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse a ChannelId from its textual form.
    ///
    /// Accepts both the simple (hex) and hyphenated UUID renderings.
    pub fn parse(s: &str) -> Result<Self, TypesError> {
        uuid::Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| TypesError::InvalidChannelId(s.to_string()))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ChannelId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", &self.to_string()[..8])
    }
}

/// The resumption token carried on an event's `id:` line.
///
/// Opaque to the relay: it is produced by the agent and echoed back by the
/// client as `Last-Event-ID` after a reconnect.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl EventId {
    /// Create an EventId from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for EventId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_is_uuid_v4() {
        let id = ChannelId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn channel_id_displays_as_simple_hex() {
        let display = ChannelId::new().to_string();
        assert_eq!(display.len(), 32);
        assert!(display.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn channel_id_parses_its_own_display() {
        let original = ChannelId::new();
        let restored: ChannelId = original.to_string().parse().unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn channel_id_parses_hyphenated_form() {
        let original = ChannelId::new();
        let hyphenated = original.as_uuid().hyphenated().to_string();
        assert_eq!(ChannelId::parse(&hyphenated).unwrap(), original);
    }

    #[test]
    fn channel_id_rejects_garbage() {
        assert!(matches!(
            ChannelId::parse("k3j9x0ab"),
            Err(TypesError::InvalidChannelId(_))
        ));
        assert!(ChannelId::parse("").is_err());
    }

    #[test]
    fn channel_ids_are_unique() {
        let ids: std::collections::HashSet<_> = (0..1000).map(|_| ChannelId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn channel_id_debug_is_truncated() {
        let debug = format!("{:?}", ChannelId::new());
        assert!(debug.starts_with("ChannelId("));
        assert_eq!(debug.len(), "ChannelId(".len() + 8 + 1);
    }

    #[test]
    fn event_id_conversions() {
        assert_eq!(EventId::from(7u64).as_str(), "7");
        assert_eq!(EventId::from("T1").to_string(), "T1");
        assert_eq!(EventId::new(String::from("abc")), EventId::from("abc"));
    }
}
