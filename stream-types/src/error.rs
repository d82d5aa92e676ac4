//! Error types for agentcast wire types.

use thiserror::Error;

/// Errors that can occur while handling wire types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Channel identifier is not a valid id
    #[error("invalid channel id: {0}")]
    InvalidChannelId(String),

    /// Event frame had no fields at all
    #[error("empty event frame")]
    EmptyEvent,

    /// Event frame has no data line
    #[error("event frame has no data")]
    MissingData,

    /// JSON payload could not be decoded
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TypesError::InvalidChannelId("nope".into());
        assert_eq!(err.to_string(), "invalid channel id: nope");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypesError>();
    }
}
