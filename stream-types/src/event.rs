//! Server-sent event frames.
//!
//! Every buffered relay entry is one (or occasionally several) frames in the
//! `text/event-stream` line format:
//!
//! ```text
//! id: 12
//! event: delta
//! data: {"delta":"Hello"}
//!
//! ```
//!
//! The terminal marker is the frame whose first line is exactly
//! `data: {"event":"finished"}` with no `event:` line. Existing clients detect
//! it by prefix, so [`is_terminal`] matches on the raw text rather than on a
//! parsed field.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{EventId, TypesError};

/// Raw-text prefix identifying the terminal marker.
pub const TERMINAL_PREFIX: &str = "data: {\"event\":\"finished\"}";

/// The complete terminal marker frame.
pub const TERMINAL_EVENT: &str = "data: {\"event\":\"finished\"}\n\n";

/// Whether a buffered entry is the terminal marker.
pub fn is_terminal(entry: &str) -> bool {
    entry.starts_with(TERMINAL_PREFIX)
}

/// Iterate the `id:` values carried by a buffered entry, in order.
///
/// A single leading space after the colon is stripped, as in the SSE line
/// format.
pub fn entry_ids(entry: &str) -> impl Iterator<Item = &str> {
    entry.lines().filter_map(|line| {
        line.strip_prefix("id:")
            .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
    })
}

/// One server-sent event frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Resumption token (`id:` line).
    pub id: Option<EventId>,
    /// Event type (`event:` line).
    pub event: Option<String>,
    /// Payload (`data:` lines, joined with `\n`).
    pub data: Option<String>,
}

impl SseEvent {
    /// Create a frame carrying only a data payload.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// Create a frame whose data payload is `payload` serialized as JSON.
    pub fn json<T: Serialize>(payload: &T) -> Result<Self, TypesError> {
        Ok(Self::data(serde_json::to_string(payload)?))
    }

    /// The terminal marker frame.
    pub fn finished() -> Self {
        Self::data(r#"{"event":"finished"}"#)
    }

    /// Set the resumption token.
    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the event type.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Whether this frame is the terminal marker.
    pub fn is_terminal(&self) -> bool {
        self.id.is_none() && self.event.is_none() && is_terminal(&self.encode())
    }

    /// Decode the data payload as JSON.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<T, TypesError> {
        let data = self.data.as_deref().ok_or(TypesError::MissingData)?;
        Ok(serde_json::from_str(data)?)
    }

    /// Encode to the wire format, including the terminating blank line.
    ///
    /// A bare data-only frame encodes with `data:` as its first line, which is
    /// what keeps the terminal marker byte-identical to [`TERMINAL_EVENT`].
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(id) = &self.id {
            out.push_str("id: ");
            out.push_str(id.as_str());
            out.push('\n');
        }
        if let Some(event) = &self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        if let Some(data) = &self.data {
            for line in data.split('\n') {
                out.push_str("data: ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('\n');
        out
    }

    /// Parse one frame from its wire text.
    ///
    /// Parsing stops at the first blank line. Comment lines (leading `:`) and
    /// unknown fields are ignored.
    pub fn parse(frame: &str) -> Result<Self, TypesError> {
        let mut event = Self::default();
        let mut data_lines: Vec<&str> = Vec::new();
        let mut seen_field = false;

        for line in frame.lines() {
            if line.is_empty() {
                break;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "id" => event.id = Some(EventId::from(value)),
                "event" => event.event = Some(value.to_string()),
                "data" => data_lines.push(value),
                _ => continue,
            }
            seen_field = true;
        }

        if !seen_field {
            return Err(TypesError::EmptyEvent);
        }
        if !data_lines.is_empty() {
            event.data = Some(data_lines.join("\n"));
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_marker_encodes_byte_identical() {
        assert_eq!(SseEvent::finished().encode(), TERMINAL_EVENT);
        assert!(is_terminal(TERMINAL_EVENT));
        assert!(SseEvent::finished().is_terminal());
    }

    #[test]
    fn terminal_detection_is_prefix_based() {
        assert!(is_terminal("data: {\"event\":\"finished\"}\n\n"));
        // An id line in front hides the marker; existing clients behave the same.
        assert!(!is_terminal("id: 3\ndata: {\"event\":\"finished\"}\n\n"));
        assert!(!is_terminal("data: {\"event\":\"response-finished\"}\n\n"));
        assert!(!is_terminal("data: {\"x\":1}\n\n"));
    }

    #[test]
    fn frame_with_event_type_is_not_terminal() {
        let frame = SseEvent::data(r#"{"event":"finished"}"#).with_event("status");
        assert!(!frame.is_terminal());
    }

    #[test]
    fn encode_orders_id_event_data() {
        let frame = SseEvent::data(r#"{"delta":"hi"}"#)
            .with_id(4u64)
            .with_event("delta");
        assert_eq!(
            frame.encode(),
            "id: 4\nevent: delta\ndata: {\"delta\":\"hi\"}\n\n"
        );
    }

    #[test]
    fn multiline_data_becomes_multiple_data_lines() {
        let frame = SseEvent::data("a\nb");
        assert_eq!(frame.encode(), "data: a\ndata: b\n\n");
        assert_eq!(SseEvent::parse(&frame.encode()).unwrap(), frame);
    }

    #[test]
    fn parse_strips_single_leading_space() {
        let frame = SseEvent::parse("id:7\nevent:  spaced\ndata: x\n\n").unwrap();
        assert_eq!(frame.id, Some(EventId::from("7")));
        assert_eq!(frame.event.as_deref(), Some(" spaced"));
        assert_eq!(frame.data.as_deref(), Some("x"));
    }

    #[test]
    fn parse_ignores_comments_and_unknown_fields() {
        let frame = SseEvent::parse(": keep-alive\nretry: 1000\ndata: y\n").unwrap();
        assert_eq!(frame, SseEvent::data("y"));
    }

    #[test]
    fn parse_rejects_empty_frame() {
        assert!(matches!(SseEvent::parse("\n"), Err(TypesError::EmptyEvent)));
        assert!(matches!(
            SseEvent::parse(": only a comment\n\n"),
            Err(TypesError::EmptyEvent)
        ));
    }

    #[test]
    fn parse_stops_at_blank_line() {
        let frame = SseEvent::parse("data: first\n\ndata: second\n\n").unwrap();
        assert_eq!(frame.data.as_deref(), Some("first"));
    }

    #[test]
    fn entry_id_reads_all_id_lines() {
        let entry = "id: 1\ndata: a\n\nid:2\ndata: b\n\n";
        assert_eq!(entry_ids(entry).collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(entry_ids("data: none\n\n").count(), 0);
    }

    #[test]
    fn json_payload_roundtrips_through_decode() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Delta {
            delta: String,
        }

        let frame = SseEvent::json(&Delta {
            delta: "tok".into(),
        })
        .unwrap();
        let decoded: Delta = frame.decode_data().unwrap();
        assert_eq!(decoded.delta, "tok");
    }

    #[test]
    fn decode_without_data_fails() {
        let frame = SseEvent::default().with_event("ping");
        assert!(matches!(
            frame.decode_data::<serde_json::Value>(),
            Err(TypesError::MissingData)
        ));
    }
}
