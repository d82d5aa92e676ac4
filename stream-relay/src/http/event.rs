//! `GET /event`: stream a channel's buffered and live entries.

use crate::error::RelayError;
use crate::server::StreamRelay;
use axum::body::Body;
use axum::extract::Query;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use futures_util::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use stream_types::EventId;

/// Header carrying the resume cursor.
pub const LAST_EVENT_ID: &str = "last-event-id";

/// Query string of `GET /event`.
#[derive(Debug, Deserialize)]
pub struct EventQuery {
    /// Channel id returned by `POST /chat`.
    pub channel: Option<String>,
}

/// Event handler.
///
/// Entries are written to the body verbatim; each one is already a complete
/// event-stream frame.
pub async fn event_handler(
    Extension(relay): Extension<Arc<StreamRelay>>,
    Query(query): Query<EventQuery>,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    let channel = query.channel.unwrap_or_default();
    let cursor = last_event_id(&headers);

    let stream = relay.open_stream(&channel, cursor)?;
    let body = Body::from_stream(stream.map(Ok::<_, Infallible>));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    )
        .into_response())
}

fn last_event_id(headers: &HeaderMap) -> Option<EventId> {
    headers
        .get(LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(EventId::from)
}
