//! HTTP endpoints for stream-relay.
//!
//! Provides the chat and event endpoints plus health checks and metrics.

mod chat;
mod event;
pub mod health;
mod metrics;

use crate::error::RelayError;
use crate::server::StreamRelay;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use std::sync::Arc;
use stream_types::ErrorBody;

pub use event::LAST_EVENT_ID;
pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<StreamRelay>) -> Router {
    let mut router = Router::new()
        .route("/chat", post(chat::chat_handler))
        .route("/event", get(event::event_handler))
        .route("/health", get(health::health_handler));

    if relay.config().http.metrics_enabled {
        router = router.route("/metrics", get(metrics::metrics_handler));
    }

    router.layer(Extension(relay))
}

impl RelayError {
    /// HTTP status reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ChannelNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::AtCapacity { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::WriterAlreadyStarted { .. } | Self::DuplicateChannel { .. } => StatusCode::CONFLICT,
            Self::Config(_) | Self::Agent(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorBody {
            message: self.to_string(),
            code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
