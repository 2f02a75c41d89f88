//! Configuration schema.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Gateway endpoint used when the config file does not set one.
pub const DEFAULT_GATEWAY_URL: &str = "ws://127.0.0.1:18789";

/// Relay configuration.
///
/// Loaded once at startup and passed into the transport and bridge; the
/// relay never mutates it after validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// WebSocket endpoint of the gateway.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Paired device identifier, issued by the gateway.
    #[serde(default)]
    pub device_id: String,

    /// Shared token matching the gateway's auth configuration.
    #[serde(default)]
    pub gateway_token: String,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            device_id: String::new(),
            gateway_token: String::new(),
        }
    }
}

impl RelayConfig {
    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.device_id.is_empty() {
            errors.push("deviceId is missing or empty (run pairing first)".to_string());
        }

        if self.gateway_token.is_empty() {
            errors.push(
                "gatewayToken is missing or empty (must match the gateway auth token)".to_string(),
            );
        }

        match Url::parse(&self.gateway_url) {
            Ok(url) if url.scheme() == "ws" || url.scheme() == "wss" => {}
            Ok(url) => errors.push(format!(
                "gatewayUrl scheme must be ws or wss, got '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!("gatewayUrl is not a valid URL: {}", e)),
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
