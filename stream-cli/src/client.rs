//! HTTP client for the relay.
//!
//! Wraps `POST /chat`, `GET /event` and `GET /health`, and implements
//! reconnect-and-resume on top of `GET /event`.

use futures_util::StreamExt;
use std::time::Duration;
use stream_core::SseDecoder;
use stream_types::{ChannelCreated, ChatRequest, ErrorBody, EventId, SseEvent};

/// Errors talking to the relay.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The relay does not know the channel (finished, expired or never existed).
    #[error("channel not found: {0}")]
    NotFound(String),

    /// The relay answered with an error status.
    #[error("relay returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the raw body.
        message: String,
    },

    /// Transport failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The stream kept dropping before the terminal marker.
    #[error("stream dropped {attempts} times without finishing")]
    RetriesExhausted {
        /// Connections attempted.
        attempts: u32,
    },
}

/// How one `GET /event` connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReadEnd {
    /// The terminal marker arrived.
    Finished,
    /// The body ended or failed first.
    Dropped(String),
}

/// Relay HTTP client.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base: String,
    retry_delay: Duration,
}

impl RelayClient {
    /// Create a client for the relay at `base` (e.g. `http://127.0.0.1:3000`).
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Set the base delay between reconnect attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Start a chat; returns the channel to read from.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChannelCreated, ClientError> {
        let response = self
            .http
            .post(format!("{}/chat", self.base))
            .json(request)
            .send()
            .await?;
        let response = check_status(response, "").await?;
        Ok(response.json().await?)
    }

    /// Fetch `/health` as raw JSON.
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let response = self.http.get(format!("{}/health", self.base)).send().await?;
        let response = check_status(response, "").await?;
        Ok(response.json().await?)
    }

    /// Follow `channel` until its terminal marker, reconnecting up to
    /// `retries` times with the last seen event id.
    ///
    /// `on_event` sees every frame exactly once, terminal marker included.
    /// Returns the last event id seen.
    pub async fn follow<F>(
        &self,
        channel: &str,
        mut cursor: Option<EventId>,
        retries: u32,
        mut on_event: F,
    ) -> Result<Option<EventId>, ClientError>
    where
        F: FnMut(&SseEvent),
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let end = self.read_once(channel, &mut cursor, &mut on_event).await?;
            match end {
                ReadEnd::Finished => return Ok(cursor),
                ReadEnd::Dropped(reason) if attempts <= retries => {
                    eprintln!(
                        "stream dropped ({reason}), resuming after {}",
                        cursor.as_ref().map_or("start", EventId::as_str)
                    );
                    tokio::time::sleep(self.retry_delay * attempts).await;
                }
                ReadEnd::Dropped(_) => return Err(ClientError::RetriesExhausted { attempts }),
            }
        }
    }

    async fn read_once<F>(
        &self,
        channel: &str,
        cursor: &mut Option<EventId>,
        on_event: &mut F,
    ) -> Result<ReadEnd, ClientError>
    where
        F: FnMut(&SseEvent),
    {
        let mut request = self
            .http
            .get(format!("{}/event", self.base))
            .query(&[("channel", channel)]);
        if let Some(id) = cursor.as_ref() {
            request = request.header("Last-Event-ID", id.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => return Ok(ReadEnd::Dropped(e.to_string())),
            Err(e) => return Err(e.into()),
        };
        let response = check_status(response, channel).await?;

        let mut body = response.bytes_stream();
        let mut decoder = SseDecoder::new();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => return Ok(ReadEnd::Dropped(e.to_string())),
            };
            for event in decoder.feed(&chunk) {
                if let Some(id) = &event.id {
                    *cursor = Some(id.clone());
                }
                on_event(&event);
                if event.is_terminal() {
                    return Ok(ReadEnd::Finished);
                }
            }
        }
        Ok(ReadEnd::Dropped("connection closed".to_string()))
    }
}

/// Turn non-success responses into errors, reading the JSON error body when
/// there is one.
async fn check_status(
    response: reqwest::Response,
    channel: &str,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND && !channel.is_empty() {
        return Err(ClientError::NotFound(channel.to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stream_relay::config::Config;
    use stream_relay::http::build_router;
    use stream_relay::StreamRelay;

    async fn serve() -> (String, Arc<StreamRelay>) {
        let mut config = Config::default();
        config.channel.poll_interval_ms = 10;
        config.agent.token_delay_ms = 5;
        let relay = Arc::new(StreamRelay::with_echo_agent(config));
        let app = build_router(Arc::clone(&relay));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), relay)
    }

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            session_id: "cli-test".to_string(),
            timeline: 0.0,
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = RelayClient::new("http://localhost:3000/");
        assert_eq!(client.base, "http://localhost:3000");
    }

    #[tokio::test]
    async fn chat_then_follow_to_terminal() {
        let (base, _relay) = serve().await;
        let client = RelayClient::new(&base);

        let created = client.chat(&request("hello relay")).await.unwrap();
        let mut events = Vec::new();
        let last = client
            .follow(&created.channel, None, 0, |e| events.push(e.clone()))
            .await
            .unwrap();

        assert!(events.last().unwrap().is_terminal());
        assert_eq!(last, Some(EventId::from("3")));
    }

    #[tokio::test]
    async fn follow_unknown_channel_is_not_found() {
        let (base, _relay) = serve().await;
        let client = RelayClient::new(&base);

        let err = client.follow("missing", None, 3, |_| {}).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref c) if c == "missing"));
    }

    #[tokio::test]
    async fn rejected_chat_reports_relay_message() {
        let (base, _relay) = serve().await;
        let client = RelayClient::new(&base);

        let err = client.chat(&request("")).await.unwrap_err();
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("empty"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (base, _relay) = serve().await;
        let health = RelayClient::new(&base).health().await.unwrap();
        assert_eq!(health["status"], "ok");
    }

    #[tokio::test]
    async fn unreachable_relay_exhausts_retries() {
        let client =
            RelayClient::new("http://127.0.0.1:9").with_retry_delay(Duration::from_millis(1));
        let err = client.follow("any", None, 1, |_| {}).await.unwrap_err();
        assert!(matches!(err, ClientError::RetriesExhausted { attempts: 2 }));
    }
}
