//! `POST /chat`: start an agent and hand back the channel to read from.

use crate::error::RelayError;
use crate::server::StreamRelay;
use axum::{Extension, Json};
use std::sync::Arc;
use stream_types::{ChannelCreated, ChatRequest};

/// Chat handler.
///
/// Responds `200` with `code: 201` in the body; existing clients key off
/// the body code.
pub async fn chat_handler(
    Extension(relay): Extension<Arc<StreamRelay>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChannelCreated>, RelayError> {
    relay.start_chat(&request).map(Json)
}
