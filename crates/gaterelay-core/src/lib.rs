//! Core types and configuration for Gaterelay.
//!
//! This crate provides:
//! - The relay configuration file (schema, loader, validation)
//! - JSON-RPC 2.0 wire types used on the gateway connection
//! - The stdio message envelopes and handshake payloads

pub mod config;
pub mod error;
pub mod rpc;
pub mod types;

pub use config::RelayConfig;
pub use error::ConfigError;
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
