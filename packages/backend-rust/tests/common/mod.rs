#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use mastery_backend::config::PolicyConfig;
use mastery_backend::state::AppState;

pub async fn create_test_app() -> Router {
    mastery_backend::build_app(AppState::new(PolicyConfig::default()))
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn put_student(app: &Router, id: &str, name: &str) {
    let (status, _) = send(
        app,
        "PUT",
        &format!("/api/students/{id}"),
        Some(serde_json::json!({ "name": name })),
    )
    .await;
    assert!(status.is_success(), "student upsert failed: {status}");
}

pub async fn put_components(app: &Router, components: Value) -> Value {
    let (status, body) = send(
        app,
        "PUT",
        "/api/knowledge-components",
        Some(serde_json::json!({ "knowledgeComponents": components })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "catalog upsert failed: {body}");
    body
}

pub async fn post_response(
    app: &Router,
    student: &str,
    kc: &str,
    correct: bool,
    timestamp: i64,
) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/responses",
        Some(serde_json::json!({
            "studentId": student,
            "contentItemId": format!("{kc}-item-{timestamp}"),
            "kcId": kc,
            "correct": correct,
            "timestamp": timestamp,
        })),
    )
    .await
}
