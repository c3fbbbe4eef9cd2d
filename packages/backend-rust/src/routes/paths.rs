use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use mastery_algo::KcId;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::services::path;
use crate::state::AppState;

const MAX_RECONCILE_IDS: usize = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileRequest {
    #[serde(default)]
    kc_ids: Vec<KcId>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:studentId", get(get_path))
        .route("/:studentId/history", get(history))
        .route("/:studentId/advance", post(advance))
        .route("/:studentId/reconcile", post(reconcile))
        .route("/:studentId/supersede", post(supersede))
}

async fn get_path(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let learning_path = path::get_path(&state, &student_id)?;
    Ok(ok(learning_path))
}

async fn history(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let archived = path::path_history(&state, &student_id)?;
    Ok(ok(archived))
}

async fn advance(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let advance = path::advance_path(&state, &student_id)?;
    Ok(ok(advance))
}

async fn reconcile(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    payload: Option<Json<ReconcileRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    if request.kc_ids.len() > MAX_RECONCILE_IDS {
        return Err(AppError::validation(format!(
            "kcIds must not exceed {MAX_RECONCILE_IDS} items"
        )));
    }
    let reconciliation = path::reconcile_path(&state, &student_id, request.kc_ids)?;
    Ok(ok(reconciliation))
}

async fn supersede(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let supersession = path::supersede_path(&state, &student_id)?;
    Ok(ok(supersession))
}
