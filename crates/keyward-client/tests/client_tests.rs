//! HTTP-level tests for the Keyward client against a mock API server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use keyward_client::{Keyward, KeywardConfig, KeywardError, ProjectStore};
use keyward_core::decode_query;
use keyward_core::models::{CreateKeyRequest, CreateProjectRequest};

const PROJECT_ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

fn client(server: &MockServer) -> Keyward {
    Keyward::with_config(KeywardConfig {
        token: "test-token".to_owned(),
        base_url: server.base_url(),
        max_retries: 1,
        retry_base_delay: Duration::from_millis(1),
        ..Default::default()
    })
    .expect("client should build")
}

fn project_json(name: &str) -> Value {
    json!({
        "id": PROJECT_ID,
        "name": name,
        "description": "",
        "keyCount": 2,
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-02T00:00:00Z",
    })
}

fn project_id() -> Uuid {
    PROJECT_ID.parse().unwrap()
}

#[tokio::test]
async fn list_projects_sends_bearer_token() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/projects")
                .header("authorization", "Bearer test-token");
            then.status(200)
                .json_body(json!({ "projects": [project_json("iOS app")] }));
        })
        .await;

    let projects = client(&server).list_projects().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "iOS app");
    assert_eq!(projects[0].key_count, 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn create_key_posts_resumed_intent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("/v1/projects/{PROJECT_ID}/keys"))
                .json_body(json!({
                    "name": "OpenAI",
                    "key": "sk-live-123",
                    "description": "",
                    "allowsWeb": true,
                    "whitelistedUrls": ["api.openai.com"],
                    "rateLimit": 60,
                }));
            then.status(201).json_body(json!({
                "id": "7b0c6c1e-5d0e-4b8f-9d59-7a0f8f7f0a11",
                "projectId": PROJECT_ID,
                "name": "OpenAI",
                "partialKey": "sk-…-123",
                "allowsWeb": true,
                "whitelistedUrls": ["api.openai.com"],
                "rateLimit": 60,
                "createdAt": "2026-01-03T00:00:00Z",
            }));
        })
        .await;

    let intent = decode_query(
        "name=OpenAI&key=sk-live-123&allowsWeb=true&whitelistedUrls=https://api.openai.com&rateLimit=60&openModal=true",
    );
    let req = CreateKeyRequest::try_from(intent).unwrap();
    let key = client(&server).create_key(project_id(), &req).await.unwrap();

    assert_eq!(key.partial_key, "sk-…-123");
    assert_eq!(key.rate_limit.get(), Some(60));
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_attestation_settings_are_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("/v1/projects/{PROJECT_ID}/devicecheck"));
            then.status(404)
                .json_body(json!({ "error": "not_found", "message": "not configured" }));
        })
        .await;

    let settings = client(&server).get_device_check(project_id()).await.unwrap();
    assert!(settings.is_none());
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/me");
            then.status(401)
                .json_body(json!({ "error": "unauthorized", "message": "token expired" }));
        })
        .await;

    let err = client(&server).me().await.unwrap_err();
    assert!(matches!(err, KeywardError::Auth(ref msg) if msg == "token expired"), "{err}");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path(format!("/v1/projects/{PROJECT_ID}"));
            then.status(409)
                .json_body(json!({ "error": "conflict", "message": "project has keys" }));
        })
        .await;

    let err = client(&server).delete_project(project_id()).await.unwrap_err();
    match err {
        KeywardError::Api {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 409);
            assert_eq!(message, "project has keys");
        }
        other => panic!("unexpected error: {other}"),
    }
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/billing/subscription");
            then.status(503);
        })
        .await;

    let err = client(&server).subscription().await.unwrap_err();
    assert!(matches!(err, KeywardError::Api { status_code: 503, .. }));
    mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn invalid_project_is_rejected_locally() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/projects");
            then.status(200);
        })
        .await;

    let req = CreateProjectRequest {
        name: "   ".to_owned(),
        description: String::new(),
    };
    let err = client(&server).create_project(&req).await.unwrap_err();
    assert!(matches!(err, KeywardError::Invalid(_)));
    mock.assert_hits_async(0).await;
}

#[tokio::test]
async fn store_serves_cache_until_invalidated() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/projects");
            then.status(200)
                .json_body(json!({ "projects": [project_json("Android app")] }));
        })
        .await;

    let store = ProjectStore::with_ttl(client(&server), Duration::from_secs(60));
    assert!(store.is_stale().await);

    store.projects().await.unwrap();
    store.projects().await.unwrap();
    assert!(!store.is_stale().await);
    mock.assert_hits_async(1).await;

    let found = store.find("android APP").await.unwrap().unwrap();
    assert_eq!(found.id, project_id());
    assert!(store.find(PROJECT_ID).await.unwrap().is_some());
    assert!(store.find("missing").await.unwrap().is_none());
    mock.assert_hits_async(1).await;

    store.invalidate().await;
    assert!(store.is_stale().await);
    store.projects().await.unwrap();
    mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn store_refreshes_after_creating_a_project() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/projects")
                .json_body(json!({ "name": "Web", "description": "" }));
            then.status(201).json_body(project_json("Web"));
        })
        .await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/projects");
            then.status(200)
                .json_body(json!({ "projects": [project_json("Web")] }));
        })
        .await;

    let store = ProjectStore::with_ttl(client(&server), Duration::from_secs(60));
    let req = CreateProjectRequest {
        name: "Web".to_owned(),
        description: String::new(),
    };
    let project = store.create_project(&req).await.unwrap();
    assert_eq!(project.name, "Web");
    assert!(!store.is_stale().await);

    create.assert_async().await;
    list.assert_hits_async(1).await;
}
