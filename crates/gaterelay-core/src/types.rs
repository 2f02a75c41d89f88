//! Stdio message envelopes and gateway handshake payloads.

use crate::config::RelayConfig;
use serde::{Deserialize, Serialize};

/// Channel used when an ask message does not name one.
pub const DEFAULT_CHANNEL: &str = "telegram";

/// Scopes requested by the relay during the handshake.
pub const OPERATOR_SCOPES: &[&str] = &["operator.read", "operator.write"];

/// Method name of the one-time handshake call.
pub const INITIALIZE_METHOD: &str = "initialize";

/// Method name of the agent-run call issued per ask message.
pub const AGENT_RUN_METHOD: &str = "gateway.agent.run";

/// An `ask` request read from standard input.
///
/// The `type` tag is checked by the bridge before deserializing, so an
/// unsupported type can be reported by name.
#[derive(Debug, Clone, Deserialize)]
pub struct AskMessage {
    /// Message text to hand to the agent.
    pub text: String,

    /// Delivery target (chat id, phone number, ...) on the channel.
    pub to: String,

    /// Delivery channel; empty or absent falls back to [`DEFAULT_CHANNEL`].
    #[serde(default)]
    pub channel: Option<String>,
}

impl AskMessage {
    /// The effective channel, applying the default for absent or empty values.
    pub fn channel_or_default(&self) -> &str {
        match self.channel.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => DEFAULT_CHANNEL,
        }
    }
}

/// One result line written to standard output per recognized ask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskOutcome {
    /// Whether the remote call succeeded.
    pub ok: bool,

    /// Agent reply (present iff `ok` is true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,

    /// Error description (present iff `ok` is false).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AskOutcome {
    /// Create a success line.
    pub fn reply(reply: impl Into<String>) -> Self {
        Self {
            ok: true,
            reply: Some(reply.into()),
            error: None,
        }
    }

    /// Create a failure line.
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            reply: None,
            error: Some(error.into()),
        }
    }

    /// Build the success line from an agent-run result, defaulting a
    /// missing or non-string reply to the empty string.
    pub fn from_agent_result(result: &serde_json::Value) -> Self {
        Self::reply(
            result
                .get("reply")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(""),
        )
    }
}

/// Parameters of the `gateway.agent.run` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunParams {
    /// Message text for the agent.
    pub message: String,

    /// Delivery target.
    pub to: String,

    /// Delivery channel.
    pub channel: String,
}

/// Client descriptor sent in the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientDescriptor {
    pub id: String,
    pub version: String,
    pub platform: String,
    pub mode: String,
}

impl ClientDescriptor {
    /// Descriptor for this relay running as a CLI client.
    pub fn cli() -> Self {
        Self {
            id: "cli".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
            mode: "cli".to_string(),
        }
    }
}

/// Device identity sent in the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub id: String,
}

/// Auth credential sent in the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCredential {
    pub token: String,
}

/// Parameters of the one-time `initialize` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    pub client: ClientDescriptor,
    pub role: String,
    pub scopes: Vec<String>,
    pub device: DeviceIdentity,
    pub auth: AuthCredential,
}

impl InitializeParams {
    /// Handshake payload for an operator session using the given config.
    pub fn operator(config: &RelayConfig) -> Self {
        Self {
            client: ClientDescriptor::cli(),
            role: "operator".to_string(),
            scopes: OPERATOR_SCOPES.iter().map(|s| s.to_string()).collect(),
            device: DeviceIdentity {
                id: config.device_id.clone(),
            },
            auth: AuthCredential {
                token: config.gateway_token.clone(),
            },
        }
    }
}
