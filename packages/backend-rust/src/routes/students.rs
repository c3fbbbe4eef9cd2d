use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::response::{ok, AppError};
use crate::services::students::{self, StudentInput};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:studentId", get(get_student).put(upsert_student))
        .route("/:studentId/knowledge-states", get(knowledge_states))
}

async fn get_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let profile = students::require_student(&state, &student_id)?;
    Ok(ok(profile))
}

async fn upsert_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(payload): Json<StudentInput>,
) -> Result<impl IntoResponse, AppError> {
    let (profile, created) = students::upsert_student(&state, &student_id, payload)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, ok(profile)))
}

async fn knowledge_states(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let states = students::knowledge_states(&state, &student_id)?;
    Ok(ok(states))
}
