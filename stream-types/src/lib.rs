//! # stream-types
//!
//! Wire format types for the agentcast event-stream relay.
//!
//! This crate provides the foundational types shared by the relay server and
//! its clients:
//! - [`ChannelId`], [`EventId`] - Identity and resume-cursor types
//! - [`SseEvent`] - One server-sent event frame (encode/parse)
//! - [`ChatRequest`], [`ChannelCreated`], [`ErrorBody`] - HTTP JSON bodies
//! - [`TypesError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod event;
mod ids;
mod messages;

pub use error::TypesError;
pub use event::{entry_ids, is_terminal, SseEvent, TERMINAL_EVENT, TERMINAL_PREFIX};
pub use ids::{ChannelId, EventId};
pub use messages::{ChannelCreated, ChatRequest, ErrorBody};
