mod health;
mod interventions;
mod knowledge;
mod paths;
mod responses;
mod students;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/responses", post(responses::record).fallback(fallback_handler))
        .nest("/api/knowledge-components", knowledge::router())
        .nest("/api/students", students::router())
        .nest("/api/paths", paths::router())
        .nest("/api/interventions", interventions::router())
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Endpoint not found").into_response()
}
