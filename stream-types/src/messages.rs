//! JSON bodies exchanged over the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::ChannelId;

/// Body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message for the agent.
    pub message: String,
    /// Conversation the message belongs to; used for rate limiting.
    pub session_id: String,
    /// Minutes elapsed in the conversation, forwarded to the agent.
    #[serde(default)]
    pub timeline: f64,
}

/// Response to `POST /chat`: where to read the agent's output from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCreated {
    /// Always `"success"`.
    pub message: String,
    /// Always `201`.
    pub code: u16,
    /// Channel id to pass to `GET /event?channel=`.
    pub channel: String,
}

impl ChannelCreated {
    /// The response for a freshly created channel.
    pub fn success(id: ChannelId) -> Self {
        Self {
            message: "success".to_string(),
            code: 201,
            channel: id.to_string(),
        }
    }
}

/// Error body returned by the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason.
    pub message: String,
    /// HTTP status code, repeated in the body for clients that only read JSON.
    pub code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_uses_camel_case() {
        let json = r#"{"message":"hi","sessionId":"s-1","timeline":2.5}"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.session_id, "s-1");
        assert_eq!(req.timeline, 2.5);
    }

    #[test]
    fn chat_request_timeline_defaults_to_zero() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","sessionId":"s"}"#).unwrap();
        assert_eq!(req.timeline, 0.0);
    }

    #[test]
    fn chat_request_requires_session() {
        assert!(serde_json::from_str::<ChatRequest>(r#"{"message":"hi"}"#).is_err());
    }

    #[test]
    fn channel_created_shape() {
        let id = ChannelId::new();
        let json = serde_json::to_value(ChannelCreated::success(id)).unwrap();
        assert_eq!(json["message"], "success");
        assert_eq!(json["code"], 201);
        assert_eq!(json["channel"], id.to_string());
    }
}
