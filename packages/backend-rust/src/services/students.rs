use mastery_algo::{KnowledgeState, Priority};
use serde::Deserialize;
use tracing::info;

use crate::services::{require_id, ServiceError};
use crate::state::AppState;
use crate::store::StudentProfile;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub name: String,
    #[serde(default)]
    pub grade_level: Option<u8>,
    #[serde(default)]
    pub curriculum_prefix: Option<String>,
    #[serde(default)]
    pub declared_priority: Option<Priority>,
}

/// Returns the stored profile and whether it was newly created
pub fn upsert_student(
    state: &AppState,
    student_id: &str,
    input: StudentInput,
) -> Result<(StudentProfile, bool), ServiceError> {
    let student_id = require_id("studentId", student_id)?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("name must not be empty".to_string()));
    }

    let profile = StudentProfile {
        student_id: student_id.clone(),
        name: name.to_string(),
        grade_level: input.grade_level,
        curriculum_prefix: input
            .curriculum_prefix
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        declared_priority: input.declared_priority,
    };

    let created = state.store().upsert_student(profile.clone());
    info!(student_id = %student_id, created, "student upserted");
    Ok((profile, created))
}

pub fn require_student(state: &AppState, student_id: &str) -> Result<StudentProfile, ServiceError> {
    state
        .store()
        .student(student_id)
        .ok_or_else(|| ServiceError::NotFound(format!("student {student_id}")))
}

/// All knowledge states of a student, ordered by KC id
pub fn knowledge_states(
    state: &AppState,
    student_id: &str,
) -> Result<Vec<KnowledgeState>, ServiceError> {
    require_student(state, student_id)?;
    let mut states: Vec<KnowledgeState> =
        state.store().states_for(student_id).into_values().collect();
    states.sort_by(|a, b| a.kc_id.cmp(&b.kc_id));
    Ok(states)
}
