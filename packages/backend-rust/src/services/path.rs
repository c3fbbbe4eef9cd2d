use mastery_algo::{Advance, KcId, LearningPath, Reconciliation, Supersession};
use tracing::info;

use crate::services::{now_ms, require_id, students, ServiceError};
use crate::state::AppState;

pub fn get_path(state: &AppState, student_id: &str) -> Result<LearningPath, ServiceError> {
    students::require_student(state, student_id)?;
    state
        .store()
        .path(student_id)
        .ok_or_else(|| ServiceError::NotFound(format!("learning path for student {student_id}")))
}

/// Archived paths of a student, oldest first
pub fn path_history(state: &AppState, student_id: &str) -> Result<Vec<LearningPath>, ServiceError> {
    students::require_student(state, student_id)?;
    Ok(state.store().archived_paths_for(student_id))
}

/// Complete mastered KCs and commit to the next one. The first request
/// builds the student's path from their curriculum scope.
pub fn advance_path(state: &AppState, student_id: &str) -> Result<Advance, ServiceError> {
    let profile = students::require_student(state, student_id)?;
    let knowledge = state.store().states_for(student_id);
    let sequencer = state.sequencer();

    let advance = state.store().with_catalog(|catalog| {
        state.store().update_path(
            student_id,
            now_ms(),
            |existing| -> Result<(Option<LearningPath>, Advance), ServiceError> {
                let path = match existing {
                    Some(path) => path.clone(),
                    None => {
                        sequencer
                            .build_path(student_id, catalog, &profile.scope())
                            .path
                    }
                };
                let advance = sequencer.advance(catalog, &path, &knowledge)?;
                Ok((Some(advance.path.clone()), advance))
            },
        )
    })?;

    info!(
        student_id,
        next = ?advance.next,
        outcome = ?advance.outcome,
        version = advance.path.version,
        "learning path advanced"
    );
    Ok(advance)
}

/// Advance only when the student already has a path
pub(crate) fn advance_existing(
    state: &AppState,
    student_id: &str,
) -> Result<Option<Advance>, ServiceError> {
    if state.store().path(student_id).is_none() {
        return Ok(None);
    }
    advance_path(state, student_id).map(Some)
}

/// Fold KCs into the student's path. An empty request re-syncs every
/// in-scope KC.
pub fn reconcile_path(
    state: &AppState,
    student_id: &str,
    kc_ids: Vec<KcId>,
) -> Result<Reconciliation, ServiceError> {
    let profile = students::require_student(state, student_id)?;
    let scope = profile.scope();
    let mut requested = Vec::with_capacity(kc_ids.len());
    for id in &kc_ids {
        requested.push(require_id("kcIds[]", id)?);
    }
    let sequencer = state.sequencer();

    let reconciliation = state.store().with_catalog(|catalog| {
        if requested.is_empty() {
            requested = catalog.scoped_ids(&scope);
        }
        state.store().update_path(
            student_id,
            now_ms(),
            |existing| -> Result<(Option<LearningPath>, Reconciliation), ServiceError> {
                let base = existing
                    .cloned()
                    .unwrap_or_else(|| LearningPath::new(student_id));
                let result = sequencer.reconcile(catalog, &base, &requested, &scope)?;
                let save = (existing.is_none() || result.changed).then(|| result.path.clone());
                Ok((save, result))
            },
        )
    })?;

    info!(
        student_id,
        inserted = reconciliation.inserted.len(),
        rejected = reconciliation.rejected.len(),
        cycles = reconciliation.cycles.cycles.len(),
        "learning path reconciled"
    );
    Ok(reconciliation)
}

/// Archive the active path and replace it with a rebuilt one
pub fn supersede_path(state: &AppState, student_id: &str) -> Result<Supersession, ServiceError> {
    let profile = students::require_student(state, student_id)?;
    let sequencer = state.sequencer();
    let now = now_ms();

    let supersession = state.store().with_catalog(|catalog| {
        state.store().update_path(
            student_id,
            now,
            |existing| -> Result<(Option<LearningPath>, Supersession), ServiceError> {
                let old = existing.ok_or_else(|| {
                    ServiceError::NotFound(format!("learning path for student {student_id}"))
                })?;
                let result = sequencer.supersede(old, catalog, &profile.scope())?;
                Ok((Some(result.path.clone()), result))
            },
        )
    })?;

    state.store().archive_path(supersession.archived.clone(), now);
    info!(
        student_id,
        carried = supersession.carried.len(),
        archived_version = supersession.archived.version,
        "learning path superseded"
    );
    Ok(supersession)
}
