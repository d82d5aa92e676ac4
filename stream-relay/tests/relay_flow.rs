//! End-to-end relay behaviour: registry-level streaming and the HTTP surface
//! served over a real socket.

use futures_util::StreamExt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use stream_core::SseDecoder;
use stream_relay::config::{ChannelConfig, Config};
use stream_relay::http::{build_router, LAST_EVENT_ID};
use stream_relay::{ChannelRegistry, RelayMetrics, StreamRelay};
use stream_types::{ChannelCreated, ChannelId, ChatRequest, SseEvent, TERMINAL_EVENT};
use tokio::sync::mpsc;

const POLL_MS: u64 = 20;

fn registry() -> ChannelRegistry {
    let config = ChannelConfig {
        poll_interval_ms: POLL_MS,
        idle_timeout_secs: 5,
        read_buffer: 16,
    };
    ChannelRegistry::new(config, Arc::new(RelayMetrics::default()))
}

/// Feed `chunks` into a channel producer with `delay` before each one.
fn delayed_producer(chunks: Vec<&'static str>, delay: Duration) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(chunks.len().max(1));
    tokio::spawn(async move {
        for chunk in chunks {
            tokio::time::sleep(delay).await;
            if tx.send(chunk.to_string()).await.is_err() {
                return;
            }
        }
    });
    rx
}

#[tokio::test]
async fn reader_receives_live_chunks_then_channel_is_removed() {
    let registry = registry();
    let first = "data: {\"x\":1}\n\n";
    let producer = delayed_producer(vec![first, TERMINAL_EVENT], Duration::from_millis(10));

    let created = registry.create(producer).unwrap();
    let mut stream = registry.open_stream(&created.channel, None).unwrap();

    let mut received = Vec::new();
    while let Some(entry) = tokio::time::timeout(Duration::from_secs(2), stream.next_event())
        .await
        .unwrap()
    {
        received.push(entry);
    }
    assert_eq!(received, vec![first.to_string(), TERMINAL_EVENT.to_string()]);

    let id = ChannelId::parse(&created.channel).unwrap();
    for _ in 0..100 {
        if registry.get(&id).is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("channel still registered after terminal marker");
}

#[tokio::test]
async fn tail_sees_appends_within_one_poll_interval() {
    let registry = registry();
    let (tx, rx) = mpsc::channel::<String>(4);
    let created = registry.create(rx).unwrap();
    let mut stream = registry.open_stream(&created.channel, None).unwrap();

    // Nothing buffered yet, so nothing may be delivered.
    let early = tokio::time::timeout(Duration::from_millis(POLL_MS * 3), stream.next_event()).await;
    assert!(early.is_err());

    tx.send("data: late\n\n".to_string()).await.unwrap();
    let entry = tokio::time::timeout(Duration::from_millis(POLL_MS * 5), stream.next_event())
        .await
        .expect("entry not delivered within the poll window");
    assert_eq!(entry.as_deref(), Some("data: late\n\n"));
}

#[tokio::test]
async fn reconnect_before_terminal_keeps_channel_and_replays() {
    let registry = registry();
    let (tx, rx) = mpsc::channel::<String>(8);
    let created = registry.create(rx).unwrap();
    tx.send("id: 1\ndata: a\n\n".to_string()).await.unwrap();
    tx.send("id: 2\ndata: b\n\n".to_string()).await.unwrap();

    let mut first = registry.open_stream(&created.channel, None).unwrap();
    assert_eq!(first.next_event().await.as_deref(), Some("id: 1\ndata: a\n\n"));
    first.close();
    drop(first);

    let mut resumed = registry
        .open_stream(&created.channel, Some("1".into()))
        .unwrap();
    tx.send(TERMINAL_EVENT.to_string()).await.unwrap();

    assert_eq!(resumed.next_event().await.as_deref(), Some("id: 2\ndata: b\n\n"));
    assert_eq!(resumed.next_event().await.as_deref(), Some(TERMINAL_EVENT));
    assert_eq!(resumed.next_event().await, None);
}

async fn serve(config: Config) -> (String, Arc<StreamRelay>) {
    let relay = Arc::new(StreamRelay::with_echo_agent(config));
    let app = build_router(Arc::clone(&relay));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), relay)
}

fn http_config() -> Config {
    let mut config = Config::default();
    config.channel.poll_interval_ms = POLL_MS;
    config.agent.token_delay_ms = 15;
    config
}

fn delta(event: &SseEvent) -> Option<String> {
    if event.event.as_deref() != Some("delta") {
        return None;
    }
    let value: serde_json::Value = event.decode_data().ok()?;
    value["delta"].as_str().map(str::to_string)
}

#[tokio::test]
async fn http_client_resumes_with_last_event_id() {
    let (base, relay) = serve(http_config()).await;
    let client = reqwest::Client::new();
    let message = "one two three four five six";

    let created: ChannelCreated = client
        .post(format!("{base}/chat"))
        .json(&ChatRequest {
            message: message.to_string(),
            session_id: "it".to_string(),
            timeline: 0.0,
        })
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(created.code, 201);
    let url = format!("{base}/event?channel={}", created.channel);

    // First connection: take two events, then hang up.
    let mut seen = Vec::new();
    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    while seen.len() < 2 {
        let chunk = body.next().await.unwrap().unwrap();
        seen.extend(decoder.feed(&chunk));
    }
    drop(body);
    let cursor = seen.iter().rev().find_map(|e| e.id.clone()).unwrap();

    // Second connection resumes after the last id seen.
    let response = client
        .get(&url)
        .header(LAST_EVENT_ID, cursor.as_str())
        .send()
        .await
        .unwrap();
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut rest = Vec::new();
    while let Some(chunk) = body.next().await {
        rest.extend(decoder.feed(&chunk.unwrap()));
    }

    assert!(rest.last().is_some_and(SseEvent::is_terminal));
    let first_resumed = rest.iter().find_map(|e| e.id.clone()).unwrap();
    assert_ne!(first_resumed, cursor);

    // Nothing was lost or repeated across the reconnect.
    let text: String = seen.iter().chain(rest.iter()).filter_map(delta).collect();
    assert_eq!(text, message);

    let m = relay.metrics();
    assert_eq!(m.streams_opened.load(Ordering::Relaxed), 2);
    for _ in 0..100 {
        if relay.total_channels() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("channel still registered after completed stream");
}

#[tokio::test]
async fn http_unknown_channel_is_404() {
    let (base, _relay) = serve(http_config()).await;

    let response = reqwest::get(format!("{base}/event?channel={}", ChannelId::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], 404);
}
