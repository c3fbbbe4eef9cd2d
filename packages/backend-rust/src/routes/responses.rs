use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::response::{ok, AppError};
use crate::services::mastery::{self, RecordResponseInput};
use crate::state::AppState;

pub(super) async fn record(
    State(state): State<AppState>,
    Json(payload): Json<RecordResponseInput>,
) -> Result<impl IntoResponse, AppError> {
    let recorded = mastery::record_response(&state, payload)?;
    Ok((StatusCode::CREATED, ok(recorded)))
}
