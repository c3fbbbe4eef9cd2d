use mastery_algo::{InterventionRecord, InterventionReport};
use serde::Serialize;
use tracing::{debug, info};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrgentInterventions {
    pub records: Vec<InterventionRecord>,
    pub generated_at: i64,
    /// True when served from the refresh worker's snapshot
    pub cached: bool,
}

/// Rank every rostered student at `now` (epoch ms). Read-only.
pub fn compute_interventions(state: &AppState, now: i64) -> InterventionReport {
    let roster = state.store().performance_snapshot();
    let report = state.scorer().rank(&roster, now);
    debug!(
        students = roster.len(),
        urgent = report.urgent().len(),
        "interventions computed"
    );
    report
}

/// Recompute and cache the ranking; returns the roster size
pub fn refresh_snapshot(state: &AppState, now: i64) -> usize {
    let report = compute_interventions(state, now);
    let size = report.len();
    state.set_snapshot(report);
    info!(students = size, "intervention snapshot refreshed");
    size
}

/// Top urgent students, from the worker snapshot while it is fresh
pub fn urgent_interventions(state: &AppState, now: i64) -> UrgentInterventions {
    let max_age = state.policy().snapshot_max_age;
    if let Some(snapshot) = state.snapshot() {
        if snapshot.refreshed_at.elapsed() <= max_age {
            return UrgentInterventions {
                records: snapshot.report.urgent(),
                generated_at: snapshot.report.generated_at,
                cached: true,
            };
        }
    }

    let report = compute_interventions(state, now);
    UrgentInterventions {
        records: report.urgent(),
        generated_at: report.generated_at,
        cached: false,
    }
}
