//! WebSocket transport framing one protocol message per line.
//!
//! Outbound messages are written as single newline-terminated text frames.
//! Inbound frame payloads are split on line boundaries; a partial trailing
//! line is carried over to the next frame, since the gateway may deliver
//! zero, one, or several protocol messages per frame.

use crate::error::SessionError;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

/// Buffered channel depth for outbound and inbound lines.
const CHANNEL_CAPACITY: usize = 64;

/// A connected line-oriented WebSocket transport.
pub struct Transport {
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<String>,
    closed: watch::Receiver<Option<String>>,
}

impl Transport {
    /// Connect to the gateway. Connection failure is terminal for the relay.
    pub async fn connect(url: &str) -> crate::Result<Self> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        debug!("WebSocket connected to {}", url);

        let (mut sink, mut stream) = ws.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (inbound_tx, inbound) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (closed_tx, closed) = watch::channel::<Option<String>>(None);
        let closed_tx = Arc::new(closed_tx);

        // Writer: one newline-terminated text frame per logical message.
        // A failed write is a dead connection; publish it so pending calls
        // fail instead of waiting on a response that will never arrive.
        let writer_closed = closed_tx.clone();
        tokio::spawn(async move {
            while let Some(line) = outbound_rx.recv().await {
                if let Err(e) = sink.send(Message::Text(format!("{}\n", line))).await {
                    let reason = format!("WebSocket write failed: {}", e);
                    warn!("{}", reason);
                    let _ = writer_closed.send(Some(reason));
                    break;
                }
            }
        });

        // Reader: reassemble lines across frames and deliver them in order.
        tokio::spawn(async move {
            let mut buffer = LineBuffer::default();
            let reason = 'read: loop {
                let payload = match stream.next().await {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Binary(data))) => {
                        String::from_utf8_lossy(&data).into_owned()
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break 'read match frame {
                            Some(f) => format!("closed by gateway: {} {}", f.code, f.reason),
                            None => "closed by gateway".to_string(),
                        };
                    }
                    Some(Ok(_)) => continue, // ping/pong
                    Some(Err(e)) => break 'read format!("WebSocket error: {}", e),
                    None => break 'read "connection ended".to_string(),
                };

                for line in buffer.split(&payload) {
                    if inbound_tx.send(line).await.is_err() {
                        break 'read "inbound receiver dropped".to_string();
                    }
                }
            };

            warn!("gateway connection closed: {}", reason);
            let _ = closed_tx.send(Some(reason));
        });

        Ok(Self {
            outbound,
            inbound,
            closed,
        })
    }

    /// Sender for outbound protocol messages (without trailing newline).
    pub fn sender(&self) -> mpsc::Sender<String> {
        self.outbound.clone()
    }

    /// Receive the next complete inbound line. `None` once the connection
    /// is gone and all buffered lines have been drained.
    pub async fn next_line(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Watch for connection closure; the value carries the close reason.
    pub fn closed(&self) -> watch::Receiver<Option<String>> {
        self.closed.clone()
    }

    #[cfg(test)]
    pub(crate) fn from_channels(
        outbound: mpsc::Sender<String>,
        inbound: mpsc::Receiver<String>,
        closed: watch::Receiver<Option<String>>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            closed,
        }
    }
}

/// Splits arbitrary payload chunks into complete lines, carrying a partial
/// trailing line over to the next chunk.
#[derive(Debug, Default)]
struct LineBuffer {
    partial: String,
}

impl LineBuffer {
    /// Append a chunk and drain every complete non-empty line from it.
    fn split(&mut self, chunk: &str) -> Vec<String> {
        self.partial.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}
