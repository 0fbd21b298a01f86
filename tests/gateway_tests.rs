//! Backend gateway client and `execute_command` against a wiremock server.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use assistant_relay::assistant::ToolCall;
use assistant_relay::config::GatewayConfig;
use assistant_relay::gateway::{ApiClient, Gateway};
use assistant_relay::tools::{ToolDispatcher, ToolRegistry};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&GatewayConfig {
        base_url: format!("{}/api", server.uri()),
        service_key: "svc-key".into(),
    })
    .unwrap()
}

#[tokio::test]
async fn post_injects_service_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/servers/7/execute-command"))
        .and(header("authorization", "Bearer svc-key"))
        .and(body_json(serde_json::json!({ "command": "status" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "output": "up" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resp = client(&server)
        .post("/servers/7/execute-command", &serde_json::json!({ "command": "status" }))
        .await
        .unwrap();

    assert!(resp.is_success());
    assert_eq!(resp.json().unwrap(), serde_json::json!({ "output": "up" }));
}

#[tokio::test]
async fn non_success_status_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/servers/7/execute-command"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(serde_json::json!({ "error": "server offline" })),
        )
        .mount(&server)
        .await;

    let resp = client(&server)
        .post("/servers/7/execute-command", &serde_json::json!({ "command": "status" }))
        .await
        .unwrap();

    assert_eq!(resp.status, 503);
    assert_eq!(resp.json().unwrap()["error"], "server offline");
}

#[tokio::test]
async fn other_verbs_reach_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/servers/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 7 })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/servers/7/sessions"))
        .and(body_json(serde_json::json!({ "all": true })))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let api = client(&server);
    assert_eq!(api.get("/servers/7").await.unwrap().json().unwrap()["id"], 7);
    let resp = api
        .delete("/servers/7/sessions", &serde_json::json!({ "all": true }))
        .await
        .unwrap();
    assert_eq!(resp.status, 204);
}

#[tokio::test]
async fn execute_command_passes_backend_payload_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/servers/srv-1/execute-command"))
        .and(body_json(serde_json::json!({ "command": "status" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "output": "ok", "exitCode": 0 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = ToolDispatcher::new(ToolRegistry::builtin(Arc::new(client(&server))));
    let outputs = dispatcher
        .dispatch(
            &[ToolCall {
                id: "call_1".into(),
                name: "execute_command".into(),
                arguments: r#"{"command":"status"}"#.into(),
            }],
            Some("srv-1"),
        )
        .await;

    assert_eq!(outputs.len(), 1);
    let output: serde_json::Value = serde_json::from_str(&outputs[0].output).unwrap();
    assert_eq!(output, serde_json::json!({ "output": "ok", "exitCode": 0 }));
}

#[tokio::test]
async fn non_json_backend_body_becomes_error_output() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/servers/srv-1/execute-command"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let dispatcher = ToolDispatcher::new(ToolRegistry::builtin(Arc::new(client(&server))));
    let outputs = dispatcher
        .dispatch(
            &[ToolCall {
                id: "call_1".into(),
                name: "execute_command".into(),
                arguments: r#"{"command":"status"}"#.into(),
            }],
            Some("srv-1"),
        )
        .await;

    let output: serde_json::Value = serde_json::from_str(&outputs[0].output).unwrap();
    assert!(output["error"].as_str().unwrap().contains("Serialization error"));
}
