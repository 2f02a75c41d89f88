//! RPC session on top of the transport.
//!
//! The session assigns monotonically increasing integer ids to outbound
//! calls, keeps a pending-call map from id to result slot, and resolves the
//! matching slot when a correlated response arrives. Frames that are not a
//! response to a pending call (server notifications or requests, unknown
//! ids) are ignored with a diagnostic.

use crate::error::SessionError;
use crate::transport::Transport;
use gaterelay_core::config::RelayConfig;
use gaterelay_core::rpc::{JsonRpcRequest, JsonRpcResponse};
use gaterelay_core::types::{InitializeParams, INITIALIZE_METHOD};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tracing::{debug, warn};

type PendingSlot = oneshot::Sender<crate::Result<Value>>;

/// A long-lived RPC session over one gateway connection.
///
/// Cheap to clone; all clones share the same connection and pending-call map.
#[derive(Clone)]
pub struct GatewaySession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    outbound: mpsc::Sender<String>,
    pending: Mutex<HashMap<u64, PendingSlot>>,
    next_id: AtomicU64,
    closed: watch::Receiver<Option<String>>,
}

impl GatewaySession {
    /// Take ownership of a connected transport and start dispatching
    /// inbound responses.
    pub fn new(mut transport: Transport) -> Self {
        let inner = Arc::new(SessionInner {
            outbound: transport.sender(),
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            closed: transport.closed(),
        });

        let dispatcher = inner.clone();
        let mut closed = transport.closed();
        tokio::spawn(async move {
            // The close watch can fire while inbound lines are still
            // flowing (a write failure, for instance); either event means
            // no pending call will ever be answered.
            loop {
                tokio::select! {
                    line = transport.next_line() => match line {
                        Some(line) => dispatcher.dispatch(&line).await,
                        None => break,
                    },
                    _ = closed.changed() => break,
                }
            }
            dispatcher.fail_pending().await;
        });

        Self { inner }
    }

    /// Send the one-time handshake. Must be called before any other call;
    /// a gateway error response here is terminal for the relay.
    pub async fn initialize(&self, config: &RelayConfig) -> crate::Result<Value> {
        let params = serde_json::to_value(InitializeParams::operator(config))?;
        self.call(INITIALIZE_METHOD, params).await
    }

    /// Issue a call and await its correlated response.
    pub async fn call(&self, method: &str, params: Value) -> crate::Result<Value> {
        if self.inner.closed.borrow().is_some() {
            return Err(SessionError::ConnectionClosed);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(id, tx);

        // The connection may have died between the check above and the
        // insert; the pending map would then already have been drained.
        if self.inner.closed.borrow().is_some() {
            self.inner.pending.lock().await.remove(&id);
            return Err(SessionError::ConnectionClosed);
        }

        let request = JsonRpcRequest::new(method).with_id(id).with_params(params);
        let frame = serde_json::to_string(&request)?;

        if self.inner.outbound.send(frame).await.is_err() {
            self.inner.pending.lock().await.remove(&id);
            return Err(SessionError::ConnectionClosed);
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(SessionError::ConnectionClosed),
        }
    }

    /// Watch for connection closure; the value carries the close reason.
    pub fn closed(&self) -> watch::Receiver<Option<String>> {
        self.inner.closed.clone()
    }

    #[cfg(test)]
    fn from_parts(outbound: mpsc::Sender<String>, closed: watch::Receiver<Option<String>>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                outbound,
                pending: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
                closed,
            }),
        }
    }
}

impl SessionInner {
    /// Resolve the pending call matching an inbound frame, if any.
    async fn dispatch(&self, line: &str) {
        let response: JsonRpcResponse = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                warn!("unparseable frame from gateway: {}", e);
                return;
            }
        };

        if response.result.is_none() && response.error.is_none() {
            // Server-initiated request or notification; nothing pends on it.
            debug!("ignoring non-response frame from gateway");
            return;
        }

        let Some(id) = response.correlation_id() else {
            debug!("ignoring gateway response without an integer id");
            return;
        };

        let Some(slot) = self.pending.lock().await.remove(&id) else {
            debug!("ignoring response for unknown call id {}", id);
            return;
        };

        let result = match response.error {
            Some(err) => Err(SessionError::Remote {
                code: err.code,
                message: err.message,
            }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };

        let _ = slot.send(result);
    }

    /// Fail every outstanding call once the connection is gone.
    async fn fail_pending(&self) {
        let mut pending = self.pending.lock().await;
        for (_, slot) in pending.drain() {
            let _ = slot.send(Err(SessionError::ConnectionClosed));
        }
    }
}
