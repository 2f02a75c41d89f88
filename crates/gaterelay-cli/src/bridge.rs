//! The stdio command loop.
//!
//! Each stdin line is validated and dispatched as a `gateway.agent.run`
//! call; each call's outcome becomes one JSON line on stdout. Calls run
//! concurrently, so result lines appear in completion order, not input
//! order. A single writer task keeps concurrent result lines from
//! interleaving.

use anyhow::Context;
use gaterelay_client::GatewaySession;
use gaterelay_core::types::{AgentRunParams, AskMessage, AskOutcome, AGENT_RUN_METHOD};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

/// Buffered channel depth for pending result lines.
const OUTPUT_CAPACITY: usize = 64;

/// Service stdin until it closes (exit 0) or the connection drops (error).
pub async fn run(session: GatewaySession) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_with_io(session, stdin, tokio::io::stdout()).await
}

/// Bridge an arbitrary line source and sink; [`run`] wires this to stdio.
pub async fn run_with_io<R, W>(session: GatewaySession, input: R, output: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut lines = input.lines();

    let (out_tx, out_rx) = mpsc::channel::<String>(OUTPUT_CAPACITY);
    let writer = tokio::spawn(write_lines(out_rx, output));

    let mut closed = session.closed();
    let mut calls = JoinSet::new();

    let result = loop {
        tokio::select! {
            _ = closed.changed() => {
                let reason = closed
                    .borrow()
                    .clone()
                    .unwrap_or_else(|| "connection closed".to_string());
                break Err(anyhow::anyhow!("gateway connection lost: {}", reason));
            }
            line = lines.next_line() => match line.context("failed to read input")? {
                Some(line) => {
                    if let Some(params) = parse_line(&line) {
                        spawn_call(&session, params, &out_tx, &mut calls);
                    }
                }
                None => {
                    debug!("input closed, draining in-flight calls");
                    break Ok(());
                }
            }
        }
    };

    // In-flight calls still get their result line; a lost connection
    // resolves them as errors almost immediately.
    while calls.join_next().await.is_some() {}

    drop(out_tx);
    let written = writer.await.context("writer task failed")?;
    written.context("failed to write output")?;

    result
}

/// Validate one stdin line, returning the call parameters for a
/// recognized ask. Anything else is logged and skipped.
fn parse_line(line: &str) -> Option<AgentRunParams> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            warn!("invalid JSON on stdin: {:?} ({})", line, e);
            return None;
        }
    };

    match value.get("type").and_then(Value::as_str) {
        Some("ask") => {}
        Some(other) => {
            warn!("unsupported stdin message type: {}", other);
            return None;
        }
        None => {
            warn!("stdin message has no type field");
            return None;
        }
    }

    let ask: AskMessage = match serde_json::from_value(value) {
        Ok(m) => m,
        Err(e) => {
            warn!("malformed ask message: {}", e);
            return None;
        }
    };

    let channel = ask.channel_or_default().to_string();
    Some(AgentRunParams {
        message: ask.text,
        to: ask.to,
        channel,
    })
}

/// Issue the remote call concurrently and queue its result line.
fn spawn_call(
    session: &GatewaySession,
    params: AgentRunParams,
    out_tx: &mpsc::Sender<String>,
    calls: &mut JoinSet<()>,
) {
    let session = session.clone();
    let out = out_tx.clone();

    calls.spawn(async move {
        let outcome = match serde_json::to_value(&params) {
            Ok(value) => match session.call(AGENT_RUN_METHOD, value).await {
                Ok(result) => AskOutcome::from_agent_result(&result),
                Err(e) => AskOutcome::error(e.to_string()),
            },
            Err(e) => AskOutcome::error(e.to_string()),
        };

        match serde_json::to_string(&outcome) {
            Ok(line) => {
                let _ = out.send(line).await;
            }
            Err(e) => error!("failed to serialize result line: {}", e),
        }
    });
}

/// Single writer task; result lines are whole-line atomic.
async fn write_lines<W>(mut rx: mpsc::Receiver<String>, mut output: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}
