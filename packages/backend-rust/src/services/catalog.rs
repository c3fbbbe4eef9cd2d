use mastery_algo::sanitize::validate_params;
use mastery_algo::{
    CycleReport, KcId, KnowledgeComponent, ParamWarning, PrereqGraph, RejectReason, RejectedKc,
    StudentId,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::services::{path, require_id, ServiceError};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentWarnings {
    pub kc_id: KcId,
    pub warnings: Vec<ParamWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRejection {
    pub student_id: StudentId,
    #[serde(flatten)]
    pub rejected: RejectedKc,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogUpdate {
    pub changed: Vec<KcId>,
    /// Parameter problems; the KC is stored anyway and clamped at use
    pub warnings: Vec<ComponentWarnings>,
    pub paths_updated: usize,
    pub rejected: Vec<PathRejection>,
    pub cycles: CycleReport,
}

/// Upsert KCs from content authoring and fold changes into active paths.
pub fn upsert_components(
    state: &AppState,
    components: Vec<KnowledgeComponent>,
) -> Result<CatalogUpdate, ServiceError> {
    if components.is_empty() {
        return Err(ServiceError::Validation(
            "knowledgeComponents must be a non-empty array".to_string(),
        ));
    }

    let mut normalized = Vec::with_capacity(components.len());
    let mut warnings = Vec::new();
    for mut kc in components {
        kc.id = require_id("id", &kc.id)?;
        if kc.name.trim().is_empty() {
            kc.name = kc.id.clone();
        }
        let found = validate_params(&kc.params);
        if !found.is_empty() {
            warn!(kc_id = %kc.id, warnings = ?found, "KC parameters need review");
            warnings.push(ComponentWarnings {
                kc_id: kc.id.clone(),
                warnings: found,
            });
        }
        normalized.push(kc);
    }

    let changed = state.store().upsert_components(normalized)?;

    let cycles = state
        .store()
        .with_catalog(|catalog| PrereqGraph::build(catalog).cycle_report(catalog));
    if !cycles.is_empty() {
        warn!(
            cycles = ?cycles.cycles,
            blocked = ?cycles.blocked,
            "prerequisite cycles in catalog"
        );
    }

    let mut paths_updated = 0;
    let mut rejected = Vec::new();
    if !changed.is_empty() {
        for student_id in state.store().student_ids_with_paths() {
            let reconciliation = path::reconcile_path(state, &student_id, changed.clone())?;
            if reconciliation.changed {
                paths_updated += 1;
            }
            // Out-of-scope and retired KCs are routine per student.
            rejected.extend(
                reconciliation
                    .rejected
                    .into_iter()
                    .filter(|r| !matches!(r.reason, RejectReason::OutOfScope | RejectReason::Retired))
                    .map(|r| PathRejection {
                        student_id: student_id.clone(),
                        rejected: r,
                    }),
            );
        }
    }

    info!(
        changed = changed.len(),
        paths_updated,
        catalog_size = state.store().component_count(),
        "catalog updated"
    );

    Ok(CatalogUpdate {
        changed,
        warnings,
        paths_updated,
        rejected,
        cycles,
    })
}
