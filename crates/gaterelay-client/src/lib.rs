//! Gateway client for Gaterelay.
//!
//! This crate provides:
//! - A WebSocket transport framing one protocol message per line
//! - An RPC session correlating outbound calls with inbound responses

pub mod error;
pub mod session;
pub mod transport;

pub use error::SessionError;
pub use session::GatewaySession;
pub use transport::Transport;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, SessionError>;
