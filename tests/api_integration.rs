//! HTTP API integration tests
//!
//! Exercise link creation and statistics through the full router.

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use linktrail::analytics::{NoopLocator, TransitionRecorder};
use linktrail::config::ProxyConfig;
use linktrail::create_app;
use linktrail::models::NewTransition;
use linktrail::storage::{SqliteStorage, Storage};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Helper to create test storage
async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn create_test_app(storage: Arc<dyn Storage>) -> Router {
    let recorder = Arc::new(TransitionRecorder::new(
        Arc::clone(&storage),
        Arc::new(NoopLocator),
        Duration::from_millis(500),
    ));
    create_app(storage, recorder, ProxyConfig::default())
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 12345))))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn create_request(payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/links/create/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn is_hex_token(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

#[tokio::test]
async fn test_create_link_returns_tokens() {
    let storage = create_test_storage().await;
    let app = create_test_app(Arc::clone(&storage));

    let (status, body) = send(
        &app,
        create_request(json!({ "original_link": "https://example.com/page" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(is_hex_token(&body["short_link"]), "got {}", body);
    assert!(is_hex_token(&body["access_key"]), "got {}", body);

    let stored = storage
        .get_link_by_short_link(body["short_link"].as_str().unwrap())
        .await
        .unwrap()
        .expect("created link should be stored");
    assert_eq!(stored.original_link, "https://example.com/page");
    assert_eq!(stored.access_key, body["access_key"].as_str().unwrap());
}

#[tokio::test]
async fn test_create_link_rejects_schemeless_url() {
    let app = create_test_app(create_test_storage().await);

    let (status, body) = send(
        &app,
        create_request(json!({ "original_link": "example.com/page" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("http"));
}

#[tokio::test]
async fn test_create_link_rejects_missing_field() {
    let app = create_test_app(create_test_storage().await);

    let response = app
        .oneshot(create_request(json!({ "url": "https://example.com" })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_stats_unknown_access_key() {
    let app = create_test_app(create_test_storage().await);

    let (status, body) = send(&app, get_request("/stats/doesnotexist/")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Link not found" }));
}

#[tokio::test]
async fn test_stats_response_shape() {
    let storage = create_test_storage().await;
    let app = create_test_app(Arc::clone(&storage));

    let link = storage.create_link("https://example.com/page").await.unwrap();
    for country in [Some("US"), Some("US"), None] {
        storage
            .create_transition(
                &link,
                &NewTransition {
                    from_country: country.map(str::to_string),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let (status, body) = send(&app, get_request(&format!("/stats/{}/", link.access_key))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "original_link": "https://example.com/page",
            "short_link": link.short_link,
            "number_of_transitions": 3,
            "number_of_transitions_by_country": { "US": 2, "Undefined Country": 1 },
            "number_of_transitions_from_sites": 0,
        })
    );
}

#[tokio::test]
async fn test_stats_from_sites_is_global() {
    let storage = create_test_storage().await;
    let app = create_test_app(Arc::clone(&storage));

    let quiet = storage.create_link("https://example.com/quiet").await.unwrap();
    let busy = storage.create_link("https://example.com/busy").await.unwrap();
    storage
        .create_transition(
            &busy,
            &NewTransition {
                forwarded_from: Some("https://news.example.org/".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let (status, body) = send(&app, get_request(&format!("/stats/{}/", quiet.access_key))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["number_of_transitions"], 0);
    // The referred visit belongs to another link but is still reported here
    assert_eq!(body["number_of_transitions_from_sites"], 1);
}

#[tokio::test]
async fn test_short_link_cannot_read_stats() {
    let storage = create_test_storage().await;
    let app = create_test_app(Arc::clone(&storage));
    let link = storage.create_link("https://example.com/private").await.unwrap();

    let (status, _) = send(&app, get_request(&format!("/stats/{}/", link.short_link))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(create_test_storage().await);

    let (status, body) = send(&app, get_request("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "OK" }));
}

#[tokio::test]
async fn test_storage_failure_is_internal_error() {
    let storage = create_test_storage().await;
    let app = create_test_app(Arc::clone(&storage));
    storage.close().await;

    let (status, body) = send(
        &app,
        create_request(json!({ "original_link": "https://example.com/page" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Internal server error" }));
}

#[tokio::test]
async fn test_create_link_rejects_control_characters() {
    let storage = create_test_storage().await;
    let app = create_test_app(Arc::clone(&storage));

    for original_link in ["https://example.com/a\nb", "https://example.com/a\tb"] {
        let (status, body) = send(&app, create_request(json!({ "original_link": original_link })))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {:?}", original_link);
        assert!(body["message"].as_str().unwrap().contains("control"));
    }
}

#[tokio::test]
async fn test_stats_storage_failure_is_internal_error() {
    let storage = create_test_storage().await;
    let link = storage.create_link("https://example.com/page").await.unwrap();
    let app = create_test_app(Arc::clone(&storage));
    storage.close().await;

    let (status, body) = send(&app, get_request(&format!("/stats/{}/", link.access_key))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Internal server error" }));
}

#[tokio::test]
async fn test_paths_without_trailing_slash() {
    let storage = create_test_storage().await;
    let app = create_test_app(Arc::clone(&storage));

    let request = Request::builder()
        .method("POST")
        .uri("/links/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "original_link": "https://example.com/page" }).to_string(),
        ))
        .unwrap();
    let (status, created) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let access_key = created["access_key"].as_str().unwrap();
    let (status, body) = send(&app, get_request(&format!("/stats/{}", access_key))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["original_link"], "https://example.com/page");
}
