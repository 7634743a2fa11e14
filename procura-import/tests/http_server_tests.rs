//! HTTP Server & Routing Integration Tests
//! Test File: http_server_tests.rs

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use procura_import::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

use helpers::*;

/// Create test app state over an in-memory store and a fixed source
fn test_app_state(store: Arc<MemoryStore>, source: StaticSource) -> AppState {
    AppState::new(store, Arc::new(source), test_config())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_health(app: Router) -> Value {
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// TC-HTTP-001: Health endpoint reports module identity
/// **Type:** Integration Test | **Priority:** P0
#[tokio::test]
async fn tc_http_001_health_endpoint() {
    // Given: Running server
    let state = test_app_state(Arc::new(MemoryStore::new()), StaticSource::failing("unused"));
    let app = build_router(state);

    // When: GET /health
    let json = get_health(app).await;

    // Then: Module info, no jobs running
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "procura-import");
    assert_eq!(json["active_imports"], 0);
    assert!(json["uptime_seconds"].is_u64());
    assert!(json.get("last_error").is_none());
}

/// TC-HTTP-002: Trigger without required fields is rejected
/// **Type:** Integration Test | **Priority:** P0
#[tokio::test]
async fn tc_http_002_process_requires_fields() {
    // Given: Running server
    let state = test_app_state(Arc::new(MemoryStore::new()), StaticSource::failing("unused"));
    let app = build_router(state);

    // When: POST /import/process with an empty object
    let response = app.oneshot(post_json("/import/process", json!({}))).await.unwrap();

    // Then: 400 with the error envelope
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("fileReference"));
}

/// TC-HTTP-003: Blank context label is rejected
/// **Type:** Integration Test | **Priority:** P1
#[tokio::test]
async fn tc_http_003_blank_context_label() {
    let state = test_app_state(Arc::new(MemoryStore::new()), StaticSource::failing("unused"));
    let app = build_router(state);

    let response = app
        .oneshot(post_json(
            "/import/process",
            json!({"fileReference": "https://files.example/oc.xlsx", "contextLabel": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("contextLabel"));
}

/// TC-HTTP-004: Declared size above the limit is rejected before any work
/// **Type:** Integration Test | **Priority:** P0
#[tokio::test]
async fn tc_http_004_file_too_large() {
    // Given: Running server with the default 50 MiB limit
    let store = Arc::new(MemoryStore::new());
    let state = test_app_state(store.clone(), StaticSource::failing("unused"));
    let app = build_router(state);

    // When: Trigger declares 60 MiB
    let response = app
        .oneshot(post_json(
            "/import/process",
            json!({
                "fileReference": "https://files.example/oc.xlsx",
                "fileName": "oc.xlsx",
                "fileSize": 60 * 1024 * 1024,
                "contextLabel": CONTEXT_LABEL,
            }),
        ))
        .await
        .unwrap();

    // Then: 400, store untouched
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("File too large"));
    assert_eq!(store.calls().deletes, 0);
}

/// TC-HTTP-005: Valid trigger answers with an event stream ending in an error event
/// **Type:** Integration Test | **Priority:** P0
#[tokio::test]
async fn tc_http_005_process_streams_events() {
    // Given: A source returning bytes that are not a workbook
    let store = Arc::new(MemoryStore::new());
    let state = test_app_state(
        store.clone(),
        StaticSource::bytes(b"definitely not a workbook".to_vec()),
    );
    let app = build_router(state.clone());

    // When: POST /import/process
    let response = app
        .oneshot(post_json(
            "/import/process",
            json!({
                "fileReference": "https://files.example/bucket/oc-2024.xlsx?sig=1",
                "fileSize": 25,
                "contextLabel": CONTEXT_LABEL,
            }),
        ))
        .await
        .unwrap();

    // Then: 200 text/event-stream whose only data line is the error event
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"), "{}", content_type);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    let events: Vec<Value> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();
    assert_eq!(events.len(), 1, "body: {}", body);
    assert_eq!(events[0]["type"], "error");
    assert!(events[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid workbook"));
    assert_eq!(store.calls().deletes, 0);

    // And: The failure shows up on /health once the job task finishes
    let mut last_error = Value::Null;
    for _ in 0..50 {
        let json = get_health(build_router(state.clone())).await;
        if let Some(err) = json.get("last_error") {
            last_error = err.clone();
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(last_error.as_str().unwrap_or("").starts_with("Invalid workbook"));
}

/// TC-HTTP-006: Second trigger for a running context is refused
/// **Type:** Integration Test | **Priority:** P0
#[tokio::test]
async fn tc_http_006_concurrent_context_conflict() {
    // Given: A job holding the context
    let state = test_app_state(Arc::new(MemoryStore::new()), StaticSource::failing("unused"));
    let _guard = state.active_contexts.try_acquire(CONTEXT_CODE).unwrap();
    let app = build_router(state);

    // When: Another import for the same agreement
    let response = app
        .oneshot(post_json(
            "/import/process",
            json!({
                "fileReference": "https://files.example/oc.xlsx",
                "contextLabel": "EXT-CE-2022-5 Otro texto",
            }),
        ))
        .await
        .unwrap();

    // Then: 409
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "CONFLICT");
}

/// TC-HTTP-007: Reset deletes the context's records
/// **Type:** Integration Test | **Priority:** P1
#[tokio::test]
async fn tc_http_007_reset_context() {
    // Given: Stored records for the agreement
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(store.clone(), test_config());
    let (mut emitter, _rx) = procura_common::events::ProgressEmitter::channel();
    orchestrator
        .import_rows(job(1_024), sheet(&numbered(3)), &mut emitter)
        .await;
    let state = test_app_state(store.clone(), StaticSource::failing("unused"));
    let app = build_router(state);

    // When: POST /import/reset
    let response = app
        .oneshot(post_json("/import/reset", json!({"contextCode": CONTEXT_CODE})))
        .await
        .unwrap();

    // Then: Count reported, records gone
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["contextCode"], CONTEXT_CODE);
    assert_eq!(json["deleted"], 3);
    assert!(store.records().is_empty());
}

/// TC-HTTP-008: Reset validation and conflict handling
/// **Type:** Integration Test | **Priority:** P1
#[tokio::test]
async fn tc_http_008_reset_rejections() {
    let state = test_app_state(Arc::new(MemoryStore::new()), StaticSource::failing("unused"));

    // Blank code
    let response = build_router(state.clone())
        .oneshot(post_json("/import/reset", json!({"contextCode": ""})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Import running
    let _guard = state.active_contexts.try_acquire(CONTEXT_CODE).unwrap();
    let response = build_router(state.clone())
        .oneshot(post_json("/import/reset", json!({"contextCode": CONTEXT_CODE})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

/// TC-HTTP-009: Store failure during reset maps to 500
/// **Type:** Integration Test | **Priority:** P2
#[tokio::test]
async fn tc_http_009_reset_store_failure() {
    let store = Arc::new(MemoryStore::with_faults(Faults {
        fail_delete: true,
        ..Default::default()
    }));
    let app = build_router(test_app_state(store, StaticSource::failing("unused")));

    let response = app
        .oneshot(post_json("/import/reset", json!({"contextCode": CONTEXT_CODE})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "STORE_ERROR");
}

/// TC-HTTP-010: Unknown routes return 404
/// **Type:** Integration Test | **Priority:** P2
#[tokio::test]
async fn tc_http_010_unknown_route() {
    let state = test_app_state(Arc::new(MemoryStore::new()), StaticSource::failing("unused"));
    let app = build_router(state);

    let response = app
        .oneshot(Request::builder().uri("/nonexistent").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
