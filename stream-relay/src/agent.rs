//! Chat agents.
//!
//! An agent turns an admitted [`ChatRequest`] into a [`Producer`](crate::producer::Producer) of encoded
//! event frames. The relay does not interpret the frames; it only requires
//! that the agent ends its output with the terminal marker.
//!
//! [`EchoAgent`] is the built-in agent: it streams the request message back
//! token by token, which is enough to exercise the whole relay path.

use futures_util::stream::{self, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use stream_types::{ChatRequest, SseEvent};

use crate::error::AgentError;
use crate::producer::{BoxProducer, StreamProducer};

/// Starts a producer for each chat request.
pub trait ChatAgent: Send + Sync + 'static {
    /// Begin generating output for `request`.
    ///
    /// Called on the request path; long-running work must be spawned and
    /// fed back through the returned producer.
    fn start(&self, request: &ChatRequest) -> Result<BoxProducer, AgentError>;
}

/// Streams the request message back as `delta` events.
///
/// Output for `"hi you"`:
///
/// ```text
/// id: 1
/// event: delta
/// data: {"delta":"hi "}
///
/// id: 2
/// event: delta
/// data: {"delta":"you"}
///
/// id: 3
/// data: {"event":"response-finished"}
///
/// data: {"event":"finished"}
/// ```
#[derive(Debug, Clone)]
pub struct EchoAgent {
    token_delay: Duration,
}

impl EchoAgent {
    /// Create an echo agent that waits `token_delay` between tokens.
    pub fn new(token_delay: Duration) -> Self {
        Self { token_delay }
    }

    /// Encode every frame the agent will emit for `message`.
    pub fn frames(message: &str) -> Result<Vec<String>, AgentError> {
        let mut frames = Vec::new();
        let mut id: u64 = 0;
        for token in message.split_inclusive(char::is_whitespace) {
            id += 1;
            let event = SseEvent::json(&serde_json::json!({ "delta": token }))?
                .with_id(id)
                .with_event("delta");
            frames.push(event.encode());
        }

        id += 1;
        let done = SseEvent::json(&serde_json::json!({ "event": "response-finished" }))?.with_id(id);
        frames.push(done.encode());
        frames.push(SseEvent::finished().encode());
        Ok(frames)
    }
}

impl ChatAgent for EchoAgent {
    fn start(&self, request: &ChatRequest) -> Result<BoxProducer, AgentError> {
        let frames = Self::frames(&request.message)?;
        let delay = self.token_delay;

        let paced = stream::iter(frames.into_iter().enumerate()).then(move |(i, frame)| async move {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, Infallible>(frame)
        });

        Ok(Box::new(StreamProducer::new(Box::pin(paced))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producer::Producer;
    use stream_types::{is_terminal, TERMINAL_EVENT};

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            session_id: "s".to_string(),
            timeline: 0.0,
        }
    }

    #[test]
    fn frames_split_on_whitespace_and_end_with_terminal() {
        let frames = EchoAgent::frames("hi you").unwrap();

        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0], "id: 1\nevent: delta\ndata: {\"delta\":\"hi \"}\n\n");
        assert_eq!(frames[1], "id: 2\nevent: delta\ndata: {\"delta\":\"you\"}\n\n");
        assert_eq!(frames[2], "id: 3\ndata: {\"event\":\"response-finished\"}\n\n");
        assert_eq!(frames[3], TERMINAL_EVENT);
    }

    #[test]
    fn deltas_reassemble_message() {
        let message = "line one\nline  two ";
        let frames = EchoAgent::frames(message).unwrap();

        let text: String = frames
            .iter()
            .map(|f| SseEvent::parse(f).unwrap())
            .filter(|e| e.event.as_deref() == Some("delta"))
            .map(|e| {
                let v: serde_json::Value = e.decode_data().unwrap();
                v["delta"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(text, message);
    }

    #[tokio::test]
    async fn producer_yields_frames_then_ends() {
        let agent = EchoAgent::new(Duration::ZERO);
        let mut producer = agent.start(&request("a b")).unwrap();

        let mut frames = Vec::new();
        while let Some(frame) = producer.next_chunk().await.unwrap() {
            frames.push(frame);
        }
        assert_eq!(frames.len(), 4);
        assert!(is_terminal(frames.last().unwrap()));
    }

    #[tokio::test]
    async fn producer_paces_tokens() {
        let agent = EchoAgent::new(Duration::from_millis(20));
        let mut producer = agent.start(&request("a b")).unwrap();

        let started = std::time::Instant::now();
        while producer.next_chunk().await.unwrap().is_some() {}
        // Four frames, three gaps.
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
