//! Bayesian Knowledge Tracing
//!
//! Single-skill forward filter. Each scored attempt moves the mastery
//! estimate for one (student, KC) pair through two steps:
//!
//! 1. **Evidence** - Bayes' rule over {knows, doesn't know} given correctness
//! 2. **Learning** - the chance of transitioning to "knows" after practice
//!
//! The update is pure. Parameter problems are clamped and reported, never
//! propagated as errors.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::sanitize::{clamp_probability, sanitize_params, sanitize_probability, ParamWarning};
use crate::types::{BktParams, KcId, KnowledgeComponent, KnowledgeState, Response, StudentId, EPSILON};

/// Default p_mastery at which a KC counts as mastered
pub const DEFAULT_MASTERY_THRESHOLD: f64 = 0.90;

// ==================== Policy ====================

/// Completion policy, kept apart from the update math
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryPolicy {
    pub threshold: f64,
}

impl Default for MasteryPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MASTERY_THRESHOLD,
        }
    }
}

impl MasteryPolicy {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: clamp_probability(threshold),
        }
    }

    pub fn is_mastered(&self, p_mastery: f64) -> bool {
        p_mastery >= self.threshold
    }
}

// ==================== Update ====================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TraceError {
    #[error("response targets KC {response} but state tracks KC {state}")]
    KcMismatch { state: KcId, response: KcId },
    #[error("response belongs to student {response} but state tracks student {state}")]
    StudentMismatch { state: StudentId, response: StudentId },
}

/// Full result of one BKT step
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BktUpdate {
    pub prior: f64,
    /// Posterior after the evidence step, before learning
    pub evidence_posterior: f64,
    pub p_mastery: f64,
    pub warnings: Vec<ParamWarning>,
}

/// Posterior mastery after observing one response
pub fn update(prior: f64, correct: bool, params: &BktParams) -> f64 {
    update_detailed(prior, correct, params).p_mastery
}

pub fn update_detailed(prior: f64, correct: bool, params: &BktParams) -> BktUpdate {
    let mut warnings = Vec::new();
    let params = sanitize_params(params, &mut warnings);
    let p = sanitize_probability("prior", prior, &mut warnings);

    let (numerator, denominator) = if correct {
        let known = p * (1.0 - params.p_slip);
        (known, known + (1.0 - p) * params.p_guess)
    } else {
        let known = p * params.p_slip;
        (known, known + (1.0 - p) * (1.0 - params.p_guess))
    };

    let evidence_posterior = if denominator <= EPSILON {
        warnings.push(ParamWarning::DegenerateEvidence { correct });
        p
    } else {
        numerator / denominator
    };

    let learned = evidence_posterior + (1.0 - evidence_posterior) * params.p_transit;
    let p_mastery = clamp_probability(learned);

    if !warnings.is_empty() {
        warn!(?warnings, prior, correct, "BKT parameter validity warning");
    }

    BktUpdate {
        prior: p,
        evidence_posterior,
        p_mastery,
        warnings,
    }
}

// ==================== Knowledge State ====================

/// Fresh state for a first exposure, seeded from the KC's pL0
pub fn seed_state(student_id: &str, kc: &KnowledgeComponent) -> KnowledgeState {
    KnowledgeState {
        student_id: student_id.to_string(),
        kc_id: kc.id.clone(),
        p_mastery: clamp_probability(kc.params.p_init),
        params: kc.params,
        attempts: 0,
        correct_count: 0,
        last_response_at: None,
    }
}

/// Return the existing state for this KC, creating it only on first exposure
pub fn ensure_state<'a>(
    states: &'a mut HashMap<KcId, KnowledgeState>,
    student_id: &str,
    kc: &KnowledgeComponent,
) -> &'a mut KnowledgeState {
    states
        .entry(kc.id.clone())
        .or_insert_with(|| seed_state(student_id, kc))
}

/// Apply one response to its state.
///
/// Responses must arrive in timestamp order per (student, KC). An earlier
/// timestamp is still applied, and logged, because BKT is a sequential
/// filter and there is no way to rewind it here.
pub fn apply_response(
    state: &mut KnowledgeState,
    response: &Response,
) -> Result<BktUpdate, TraceError> {
    if state.kc_id != response.kc_id {
        return Err(TraceError::KcMismatch {
            state: state.kc_id.clone(),
            response: response.kc_id.clone(),
        });
    }
    if state.student_id != response.student_id {
        return Err(TraceError::StudentMismatch {
            state: state.student_id.clone(),
            response: response.student_id.clone(),
        });
    }

    if let Some(last) = state.last_response_at {
        if response.timestamp < last {
            warn!(
                student_id = %state.student_id,
                kc_id = %state.kc_id,
                last,
                timestamp = response.timestamp,
                "out-of-order response applied; mastery estimate may be corrupted"
            );
        }
    }

    let result = update_detailed(state.p_mastery, response.correct, &state.params);
    state.p_mastery = result.p_mastery;
    state.attempts = state.attempts.saturating_add(1);
    if response.correct {
        state.correct_count = state.correct_count.saturating_add(1);
    }
    state.last_response_at = Some(
        state
            .last_response_at
            .map_or(response.timestamp, |last| last.max(response.timestamp)),
    );

    Ok(result)
}

/// Recompute mastery from pL0 over a response history, oldest first.
/// Equal timestamps keep their given order.
pub fn replay(params: &BktParams, responses: &[Response]) -> f64 {
    let mut ordered: Vec<&Response> = responses.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);

    ordered
        .into_iter()
        .fold(clamp_probability(params.p_init), |p, r| {
            update(p, r.correct, params)
        })
}
