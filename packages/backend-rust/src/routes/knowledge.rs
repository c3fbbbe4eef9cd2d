use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::put;
use axum::{Json, Router};
use mastery_algo::KnowledgeComponent;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::services::catalog;
use crate::state::AppState;

const MAX_BATCH_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertRequest {
    knowledge_components: Vec<KnowledgeComponent>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", put(upsert))
}

async fn upsert(
    State(state): State<AppState>,
    Json(payload): Json<UpsertRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.knowledge_components.len() > MAX_BATCH_SIZE {
        return Err(AppError::validation(format!(
            "knowledgeComponents must not exceed {MAX_BATCH_SIZE} items"
        )));
    }
    let update = catalog::upsert_components(&state, payload.knowledge_components)?;
    Ok(ok(update))
}
