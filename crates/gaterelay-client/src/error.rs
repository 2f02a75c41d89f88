//! Client error types.

use thiserror::Error;

/// Errors that can occur on the gateway connection.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The WebSocket connection could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The connection closed while a call was outstanding or being issued.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The gateway answered the call with a JSON-RPC error.
    #[error("Gateway error {code}: {message}")]
    Remote { code: i32, message: String },

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
