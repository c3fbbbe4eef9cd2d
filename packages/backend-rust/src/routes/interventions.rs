use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use mastery_algo::Priority;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::services::{intervention, now_ms};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankQuery {
    /// Evaluation time in epoch ms, for reproducible reports
    now: Option<i64>,
    priority: Option<Priority>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(rank))
        .route("/urgent", get(urgent))
}

async fn rank(
    State(state): State<AppState>,
    Query(query): Query<RankQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut report = intervention::compute_interventions(&state, query.now.unwrap_or_else(now_ms));
    if let Some(priority) = query.priority {
        report.records.retain(|r| r.priority == priority);
    }
    Ok(ok(report))
}

async fn urgent(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(ok(intervention::urgent_interventions(&state, now_ms())))
}
