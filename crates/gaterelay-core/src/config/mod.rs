//! Relay configuration.

mod loader;
mod schema;

pub use schema::{RelayConfig, DEFAULT_GATEWAY_URL};
