//! Session lifecycle integration tests

use olrpc_server::{from_fn, MailboxServer, SessionState};
use serde_json::{json, Value};

fn server() -> MailboxServer {
    MailboxServer::builder()
        .handler("get_folders", from_fn(|_| async { Ok(json!([{"name": "Inbox"}])) }))
        .handler("list_emails", from_fn(|p| async move { Ok(Value::Object(p)) }))
        .build()
        .unwrap()
}

async fn call(server: &MailboxServer, text: &str) -> Value {
    let reply = server.handle_message(text).await.expect("a reply");
    serde_json::from_str(&reply).unwrap()
}

const INIT: &str = r#"{"jsonrpc":"2.0","id":"init","method":"initialize","params":{"protocol_version":"2024-11-05","client_name":"test"}}"#;

#[tokio::test]
async fn test_handshake_advertises_four_tools() {
    let server = server();
    let reply = call(&server, INIT).await;

    assert_eq!(reply["id"], "init");
    assert_eq!(reply["result"]["protocol_version"], "2024-11-05");
    assert_eq!(reply["result"]["server_info"]["name"], "olrpc");

    let tools: Vec<&str> = reply["result"]["capabilities"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(tools, vec!["list_emails", "get_email", "search_emails", "get_folders"]);
    assert_eq!(server.session_state().await, SessionState::Active);
}

#[tokio::test]
async fn test_version_mismatch_stays_inactive() {
    let server = server();
    let reply = call(
        &server,
        r#"{"jsonrpc":"2.0","id":"i","method":"initialize","params":{"protocol_version":"2023-01-01"}}"#,
    )
    .await;

    assert_eq!(reply["error"]["code"], -32003);
    assert_eq!(reply["error"]["data"]["field"], "protocol_version");
    assert_eq!(server.session_state().await, SessionState::Uninitialized);

    let reply = call(&server, r#"{"jsonrpc":"2.0","id":"c","method":"get_folders"}"#).await;
    assert_eq!(reply["error"]["code"], -32600);
}

#[tokio::test]
async fn test_calls_before_handshake_fail() {
    let server = server();
    let reply = call(&server, r#"{"jsonrpc":"2.0","id":"early","method":"list_emails","params":{}}"#).await;

    assert_eq!(reply["id"], "early");
    assert_eq!(reply["error"]["code"], -32600);
    assert!(reply["error"]["message"].as_str().unwrap().contains("list_emails"));
}

#[tokio::test]
async fn test_active_session_routes_with_defaults() {
    let server = server();
    call(&server, INIT).await;

    let reply = call(
        &server,
        r#"{"jsonrpc":"2.0","id":"l","method":"list_emails","params":{"folder":"Inbox"}}"#,
    )
    .await;
    assert_eq!(reply["result"], json!({"folder": "Inbox", "limit": 50}));
}

#[tokio::test]
async fn test_shutdown_then_rehandshake() {
    let server = server();
    call(&server, INIT).await;

    let reply = call(&server, r#"{"jsonrpc":"2.0","id":"s","method":"shutdown"}"#).await;
    assert!(reply.get("error").is_none());
    assert_eq!(server.session_state().await, SessionState::Closed);

    let reply = call(&server, r#"{"jsonrpc":"2.0","id":"c","method":"get_folders"}"#).await;
    assert_eq!(reply["error"]["code"], -32600);

    call(&server, INIT).await;
    let reply = call(&server, r#"{"jsonrpc":"2.0","id":"c","method":"get_folders"}"#).await;
    assert_eq!(reply["result"][0]["name"], "Inbox");
}

#[tokio::test]
async fn test_gate_rejects_unadvertised_and_malformed_calls() {
    let server = server();
    call(&server, INIT).await;

    let reply = call(
        &server,
        r#"{"jsonrpc":"2.0","id":"x","method":"send_email","params":{"to":["a@example.com"],"subject":"s","body":"b"}}"#,
    )
    .await;
    assert_eq!(reply["error"]["code"], -32601);
    assert!(reply["error"]["data"]["available"].as_array().unwrap().len() == 4);

    let reply = call(&server, r#"{"jsonrpc":"2.0","id":"q","method":"search_emails","params":{"query":"  "}}"#).await;
    assert_eq!(reply["error"]["code"], -32602);

    let reply = call(&server, r#"{"jsonrpc":"2.0","id":"n","method":"list_emails","params":{"limit":"ten"}}"#).await;
    assert_eq!(reply["error"]["code"], -32602);
}

#[tokio::test]
async fn test_decode_failures() {
    let server = server();

    let reply = call(&server, "{not json").await;
    assert_eq!(reply["error"]["code"], -32700);
    assert_eq!(reply["id"], Value::Null);

    let reply = call(&server, r#"{"jsonrpc":"1.0","id":"old","method":"get_folders"}"#).await;
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(reply["id"], "old");

    let reply = call(&server, r#"[{"jsonrpc":"2.0","id":"b","method":"get_folders"}]"#).await;
    assert_eq!(reply["error"]["code"], -32600);

    let reply = call(&server, r#"{"jsonrpc":"2.0","id":7,"method":"get_folders"}"#).await;
    assert_eq!(reply["error"]["code"], -32600);
    assert_eq!(reply["id"], 7);
}
