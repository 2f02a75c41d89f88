//! End-to-end bridge tests: newline-delimited input through a live
//! session, outcome lines collected from the write side.

use gaterelay_cli::bridge;
use gaterelay_client::{GatewaySession, Transport};
use gaterelay_core::rpc::JsonRpcError;
use gaterelay_integration_tests::{reply_handler, spawn_gateway, MethodHandler};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Run the bridge over an in-memory input/output pair and return the
/// output lines it produced before returning.
async fn run_bridge(session: GatewaySession, input: &str) -> Vec<String> {
    let (output, mut sink) = tokio::io::duplex(64 * 1024);

    let collector = tokio::spawn(async move {
        let mut collected = String::new();
        sink.read_to_string(&mut collected).await.unwrap();
        collected
    });

    bridge::run_with_io(session, input.as_bytes(), output)
        .await
        .unwrap();

    // The write side is dropped before run_with_io returns, so the
    // collector sees EOF without any further writes.
    let collected = collector.await.unwrap();
    collected.lines().map(str::to_string).collect()
}

async fn connect_session(url: &str) -> GatewaySession {
    let transport = Transport::connect(url).await.unwrap();
    GatewaySession::new(transport)
}

#[tokio::test]
async fn test_every_ask_answered_before_return() {
    let url = spawn_gateway(reply_handler("hi there")).await;
    let session = connect_session(&url).await;

    let input = concat!(
        r#"{"type":"ask","text":"one","to":"user1"}"#,
        "\n",
        r#"{"type":"ask","text":"two","to":"user1"}"#,
        "\n",
        r#"{"type":"ask","text":"three","to":"user1","channel":"sms"}"#,
        "\n",
    );

    let lines = run_bridge(session, input).await;
    assert_eq!(lines.len(), 3, "one outcome line per ask: {:?}", lines);
    for line in &lines {
        assert_eq!(line, r#"{"ok":true,"reply":"hi there"}"#);
    }
}

#[tokio::test]
async fn test_unrecognized_input_produces_no_output() {
    let url = spawn_gateway(reply_handler("ack")).await;
    let session = connect_session(&url).await;

    let input = concat!(
        "\n",
        "not json at all\n",
        r#"{"type":"other"}"#,
        "\n",
        r#"{"type":"ask","text":"hello","to":"user1"}"#,
        "\n",
    );

    let lines = run_bridge(session, input).await;
    assert_eq!(lines, vec![r#"{"ok":true,"reply":"ack"}"#.to_string()]);
}

#[tokio::test]
async fn test_failed_call_becomes_error_line() {
    let handler: Arc<MethodHandler> = Arc::new(|method: &str, _params: Value| match method {
        "gateway.agent.run" => Err(JsonRpcError::internal_error("agent failed")),
        _ => Ok(Value::Null),
    });
    let url = spawn_gateway(handler).await;
    let session = connect_session(&url).await;

    let input = concat!(r#"{"type":"ask","text":"hello","to":"user1"}"#, "\n");
    let lines = run_bridge(session, input).await;

    assert_eq!(lines.len(), 1);
    let outcome: Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(outcome["ok"], Value::Bool(false));
    assert!(
        outcome["error"].as_str().unwrap().contains("agent failed"),
        "error line should carry the remote message: {}",
        lines[0]
    );
}
