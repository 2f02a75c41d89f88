//! End-to-end session tests against the fake gateway.

use gaterelay_client::{GatewaySession, SessionError, Transport};
use gaterelay_core::config::RelayConfig;
use gaterelay_core::rpc::JsonRpcError;
use gaterelay_core::types::{AgentRunParams, AGENT_RUN_METHOD};
use gaterelay_integration_tests::{reply_handler, spawn_gateway, MethodHandler};
use serde_json::Value;
use std::sync::{Arc, Mutex};

fn test_config(url: &str) -> RelayConfig {
    RelayConfig {
        gateway_url: url.to_string(),
        device_id: "device-1".to_string(),
        gateway_token: "secret".to_string(),
    }
}

async fn connect(url: &str) -> GatewaySession {
    let transport = Transport::connect(url).await.unwrap();
    GatewaySession::new(transport)
}

#[tokio::test]
async fn test_handshake_carries_identity_and_scopes() {
    let calls: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();
    let handler: Arc<MethodHandler> = Arc::new(move |method, params| {
        recorded.lock().unwrap().push((method.to_string(), params));
        Ok(serde_json::json!({}))
    });

    let url = spawn_gateway(handler).await;
    let session = connect(&url).await;
    session.initialize(&test_config(&url)).await.unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (method, params) = &calls[0];
    assert_eq!(method, "initialize");
    assert_eq!(params["role"], "operator");
    assert_eq!(params["scopes"], serde_json::json!(["operator.read", "operator.write"]));
    assert_eq!(params["device"]["id"], "device-1");
    assert_eq!(params["auth"]["token"], "secret");
    assert_eq!(params["client"]["id"], "cli");
}

#[tokio::test]
async fn test_ask_round_trip() {
    let url = spawn_gateway(reply_handler("hi there")).await;
    let session = connect(&url).await;
    session.initialize(&test_config(&url)).await.unwrap();

    let params = serde_json::to_value(AgentRunParams {
        message: "hello".to_string(),
        to: "user1".to_string(),
        channel: "telegram".to_string(),
    })
    .unwrap();

    let result = session.call(AGENT_RUN_METHOD, params).await.unwrap();
    assert_eq!(result["reply"], "hi there");
}

#[tokio::test]
async fn test_agent_run_params_reach_gateway() {
    let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let recorded = seen.clone();
    let handler: Arc<MethodHandler> = Arc::new(move |method, params| {
        if method == AGENT_RUN_METHOD {
            *recorded.lock().unwrap() = Some(params);
        }
        Ok(serde_json::json!({"reply": ""}))
    });

    let url = spawn_gateway(handler).await;
    let session = connect(&url).await;

    let params = serde_json::to_value(AgentRunParams {
        message: "hello".to_string(),
        to: "user1".to_string(),
        channel: "sms".to_string(),
    })
    .unwrap();
    session.call(AGENT_RUN_METHOD, params).await.unwrap();

    let seen = seen.lock().unwrap().clone().unwrap();
    assert_eq!(seen["message"], "hello");
    assert_eq!(seen["to"], "user1");
    assert_eq!(seen["channel"], "sms");
}

#[tokio::test]
async fn test_remote_failure_maps_to_session_error() {
    let handler: Arc<MethodHandler> = Arc::new(|method, _| match method {
        "initialize" => Ok(serde_json::json!({})),
        _ => Err(JsonRpcError::internal_error("agent failed")),
    });

    let url = spawn_gateway(handler).await;
    let session = connect(&url).await;
    session.initialize(&test_config(&url)).await.unwrap();

    let result = session.call(AGENT_RUN_METHOD, Value::Null).await;
    match result {
        Err(SessionError::Remote { code, message }) => {
            assert_eq!(code, -32603);
            assert!(message.contains("agent failed"));
        }
        other => panic!("expected remote error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_handshake_rejection_is_an_error() {
    let handler: Arc<MethodHandler> =
        Arc::new(|_, _| Err(JsonRpcError::new(-32001, "invalid token")));

    let url = spawn_gateway(handler).await;
    let session = connect(&url).await;

    let result = session.initialize(&test_config(&url)).await;
    assert!(matches!(result, Err(SessionError::Remote { code: -32001, .. })));
}

#[tokio::test]
async fn test_session_survives_failed_calls() {
    // A failed call must not poison the session for later calls.
    let handler: Arc<MethodHandler> = Arc::new(|_, params| {
        if params["fail"] == true {
            Err(JsonRpcError::internal_error("boom"))
        } else {
            Ok(serde_json::json!({"reply": "ok"}))
        }
    });

    let url = spawn_gateway(handler).await;
    let session = connect(&url).await;

    let failed = session
        .call(AGENT_RUN_METHOD, serde_json::json!({"fail": true}))
        .await;
    assert!(failed.is_err());

    let ok = session
        .call(AGENT_RUN_METHOD, serde_json::json!({"fail": false}))
        .await
        .unwrap();
    assert_eq!(ok["reply"], "ok");
}

#[tokio::test]
async fn test_connect_refused() {
    // Port 1 on loopback has no listener; the connection is refused.
    let result = Transport::connect("ws://127.0.0.1:1").await;
    assert!(matches!(result, Err(SessionError::Connect(_))));
}
