mod common;

use std::collections::BTreeMap;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use outlook_asana::asana_client::AsanaClient;
use outlook_asana::config::{AsanaConfig, Profile};
use outlook_asana::error::TaskError;
use outlook_asana::task::{CustomFieldValue, TaskRequest, TaskTargets};

use common::delegated_config;

fn asana_config(server: &MockServer) -> AsanaConfig {
    delegated_config(&server.uri(), Profile::Migration)
        .asana
        .expect("asana configuration")
}

fn request(section: Option<&str>) -> TaskRequest {
    let mut custom_fields = BTreeMap::new();
    custom_fields.insert("field-loc".to_string(), CustomFieldValue::Text("Harbor".to_string()));
    custom_fields.insert("field-job".to_string(), CustomFieldValue::Number(4410));

    TaskRequest {
        title: "Crane inspection".to_string(),
        notes: "**From:** a@example.com\n".to_string(),
        targets: TaskTargets {
            workspace_gid: "ws-1".to_string(),
            project_gid: "proj-1".to_string(),
            section_gid: section.map(str::to_string),
        },
        custom_fields,
    }
}

#[tokio::test]
async fn test_current_user() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/1.0/users/me"))
        .and(header("authorization", "Bearer pat-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "gid": "u-1", "name": "Alice", "email": "alice@example.com" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AsanaClient::new(&asana_config(&server)).expect("client");
    let user = client.current_user().await.expect("user");

    assert_eq!(user.gid, "u-1");
    assert_eq!(user.name.as_deref(), Some("Alice"));
}

#[tokio::test]
async fn test_create_task_then_add_to_section() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/1.0/tasks"))
        .and(header("authorization", "Bearer pat-123"))
        .and(body_partial_json(json!({
            "data": {
                "name": "Crane inspection",
                "workspace": "ws-1",
                "projects": ["proj-1"],
                "custom_fields": { "field-loc": "Harbor", "field-job": 4410 }
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "gid": "t-1", "name": "Crane inspection", "permalink_url": "https://app.asana.com/0/proj-1/t-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/1.0/sections/sec-1/addTask"))
        .and(body_partial_json(json!({ "data": { "task": "t-1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AsanaClient::new(&asana_config(&server)).expect("client");
    let task = client.create_task(&request(Some("sec-1"))).await.expect("task");

    assert_eq!(task.gid, "t-1");
    assert_eq!(task.permalink_url.as_deref(), Some("https://app.asana.com/0/proj-1/t-1"));
}

#[tokio::test]
async fn test_create_task_without_section() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/1.0/tasks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "gid": "t-2", "name": "Crane inspection" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/1.0/sections/sec-1/addTask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .expect(0)
        .mount(&server)
        .await;

    let client = AsanaClient::new(&asana_config(&server)).expect("client");
    let task = client.create_task(&request(None)).await.expect("task");

    assert_eq!(task.gid, "t-2");
}

#[tokio::test]
async fn test_unknown_project_is_invalid_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/1.0/tasks"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{ "message": "project: Not a recognized ID: proj-1" }]
        })))
        .mount(&server)
        .await;

    let client = AsanaClient::new(&asana_config(&server)).expect("client");
    match client.create_task(&request(None)).await {
        Err(TaskError::InvalidRequest { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "project: Not a recognized ID: proj-1");
        }
        other => panic!("expected InvalidRequest, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/1.0/tasks"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "30")
                .set_body_json(json!({ "errors": [{ "message": "Rate limit enforced" }] })),
        )
        .mount(&server)
        .await;

    let client = AsanaClient::new(&asana_config(&server)).expect("client");
    match client.create_task(&request(None)).await {
        Err(TaskError::RateLimited { retry_after, message }) => {
            assert_eq!(retry_after, Some(30));
            assert_eq!(message, "Rate limit enforced");
        }
        other => panic!("expected RateLimited, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bad_token_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/1.0/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{ "message": "Not Authorized" }]
        })))
        .mount(&server)
        .await;

    let client = AsanaClient::new(&asana_config(&server)).expect("client");
    assert!(matches!(
        client.current_user().await,
        Err(TaskError::Unauthorized { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_upload_attachment() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/1.0/tasks/t-1/attachments"))
        .and(header("authorization", "Bearer pat-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "gid": "a-1", "name": "plan.pdf" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AsanaClient::new(&asana_config(&server)).expect("client");
    client
        .upload_attachment("t-1", "plan.pdf", "application/pdf", b"%PDF-1.4".to_vec())
        .await
        .expect("upload");

    let received = server.received_requests().await.expect("recorded requests");
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"plan.pdf\""));
    assert!(body.contains("%PDF-1.4"));
}

#[tokio::test]
async fn test_failed_section_move_keeps_created_task() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/1.0/tasks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "gid": "t-3", "name": "Crane inspection" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/1.0/sections/gone/addTask"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{ "message": "section: Not a recognized ID: gone" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AsanaClient::new(&asana_config(&server)).expect("client");
    let task = client
        .create_task(&request(Some("gone")))
        .await
        .expect("task is reported even when the section move fails");

    assert_eq!(task.gid, "t-3");
}
