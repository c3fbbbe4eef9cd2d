use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    started_at: String,
    uptime: u64,
    knowledge_components: usize,
    students: usize,
    snapshot_age_secs: Option<u64>,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
}

async fn root(State(state): State<AppState>) -> Response {
    let response = HealthResponse {
        status: "ok",
        timestamp: now_iso(),
        started_at: chrono::DateTime::<chrono::Utc>::from(state.started_at_system())
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        uptime: state.uptime_seconds(),
        knowledge_components: state.store().component_count(),
        students: state.store().student_count(),
        snapshot_age_secs: state
            .snapshot()
            .map(|s| s.refreshed_at.elapsed().as_secs()),
    };
    Json(response).into_response()
}

async fn live() -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
    })
    .into_response()
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
