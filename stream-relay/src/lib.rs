//! # stream-relay
//!
//! Event-stream relay for streaming chat agents.
//!
//! This crate implements a relay server that:
//! - Starts an agent for every chat request and buffers its output
//! - Decouples the agent (writer) from the HTTP client (reader)
//! - Replays buffered events to a reconnecting client, resuming after the
//!   client's `Last-Event-ID`
//! - Forgets a channel once a reader has received its terminal marker
//!
//! ## Architecture
//!
//! ```text
//!               POST /chat                    GET /event?channel=
//! Client ────────────────────┐        ┌────────────────────► Client
//!                            ▼        │
//!        ┌───────────────────────────────────────────┐
//!        │               stream-relay                │
//!        │  ChatAgent ─► Producer ─► EventChannel ───┤
//!        │                           (EventLog)      │
//!        │  ChannelRegistry: id ─► EventChannel      │
//!        └───────────────────────────────────────────┘
//! ```
//!
//! ## Endpoints
//!
//! - `POST /chat` → `{"message":"success","code":201,"channel":"<id>"}`
//! - `GET /event?channel=<id>` → `text/event-stream` body
//! - `GET /health`, `GET /metrics`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod channel;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod http;
pub mod limits;
pub mod producer;
pub mod registry;
pub mod server;

pub use agent::{ChatAgent, EchoAgent};
pub use channel::{EventChannel, EventStream, WriterState};
pub use config::Config;
pub use error::{AgentError, ProducerError, RelayError};
pub use producer::{BoxProducer, Producer, StreamProducer};
pub use registry::ChannelRegistry;
pub use server::{RelayMetrics, StreamRelay};
