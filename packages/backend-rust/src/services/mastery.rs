use mastery_algo::{Advance, KnowledgeState, ParamWarning, Response};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::services::{now_ms, path, require_id, students, ServiceError};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponseInput {
    pub student_id: String,
    pub content_item_id: String,
    pub kc_id: String,
    pub correct: bool,
    /// Epoch ms; defaults to the time of receipt
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub latency_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedResponse {
    pub response_id: Uuid,
    pub knowledge_state: KnowledgeState,
    pub evidence_posterior: f64,
    pub mastered: bool,
    pub warnings: Vec<ParamWarning>,
    /// Path progress after this response, when the student has a path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Advance>,
}

/// Apply one scored attempt: seed the state on first exposure, run the BKT
/// update, then move the student's path forward.
pub fn record_response(
    state: &AppState,
    input: RecordResponseInput,
) -> Result<RecordedResponse, ServiceError> {
    let student_id = require_id("studentId", &input.student_id)?;
    let kc_id = require_id("kcId", &input.kc_id)?;
    let content_item_id = require_id("contentItemId", &input.content_item_id)?;
    if input.latency_ms.is_some_and(|ms| ms < 0) {
        return Err(ServiceError::Validation(
            "latencyMs must not be negative".to_string(),
        ));
    }

    students::require_student(state, &student_id)?;
    let kc = state
        .store()
        .component(&kc_id)
        .ok_or_else(|| ServiceError::NotFound(format!("knowledge component {kc_id}")))?;

    let received_at = now_ms();
    let response = Response {
        student_id: student_id.clone(),
        content_item_id,
        kc_id: kc_id.clone(),
        correct: input.correct,
        timestamp: input.timestamp.unwrap_or(received_at),
        latency_ms: input.latency_ms,
    };

    let applied = state.store().apply(&kc, response, received_at)?;
    let mastered = state
        .sequencer()
        .mastery_policy()
        .is_mastered(applied.state.p_mastery);

    info!(
        student_id = %student_id,
        kc_id = %kc_id,
        correct = input.correct,
        p_mastery = applied.state.p_mastery,
        attempts = applied.state.attempts,
        mastered,
        "response recorded"
    );

    let path = path::advance_existing(state, &student_id)?;

    Ok(RecordedResponse {
        response_id: applied.id,
        knowledge_state: applied.state,
        evidence_posterior: applied.update.evidence_posterior,
        mastered,
        warnings: applied.update.warnings,
        path,
    })
}
