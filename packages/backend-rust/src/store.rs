//! In-memory persistence for the reference service.
//!
//! Each key space sits behind its own `parking_lot::RwLock`. Writers hold the
//! write lock for the whole read-modify-write, so updates to one key space
//! are serialized and readers always see a consistent snapshot.

use std::collections::HashMap;

use mastery_algo::{
    apply_response, ensure_state, BktUpdate, Catalog, CatalogError, CurriculumScope, KcId,
    KnowledgeComponent, KnowledgeState, LearningPath, Priority, Response, StudentId,
    StudentPerformance, TraceError,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("response at {timestamp} precedes last applied response at {last}")]
    OutOfOrder {
        student_id: StudentId,
        kc_id: KcId,
        last: i64,
        timestamp: i64,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Trace(#[from] TraceError),
}

/// Roster entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: StudentId,
    pub name: String,
    pub grade_level: Option<u8>,
    pub curriculum_prefix: Option<String>,
    pub declared_priority: Option<Priority>,
}

impl StudentProfile {
    pub fn scope(&self) -> CurriculumScope {
        CurriculumScope {
            grade_levels: self.grade_level.map(|g| vec![g]),
            code_prefix: self.curriculum_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResponse {
    pub id: Uuid,
    pub received_at: i64,
    #[serde(flatten)]
    pub response: Response,
}

/// Result of applying one response
#[derive(Debug, Clone)]
pub struct AppliedResponse {
    pub id: Uuid,
    pub update: BktUpdate,
    pub state: KnowledgeState,
}

#[derive(Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
    students: RwLock<HashMap<StudentId, StudentProfile>>,
    states: RwLock<HashMap<StudentId, HashMap<KcId, KnowledgeState>>>,
    responses: RwLock<Vec<StoredResponse>>,
    paths: RwLock<HashMap<StudentId, LearningPath>>,
    archived_paths: RwLock<Vec<LearningPath>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Catalog ====================

    /// Upsert a batch as a unit; returns the ids whose stored value changed.
    /// A rejected KC leaves the catalog untouched.
    pub fn upsert_components(
        &self,
        components: Vec<KnowledgeComponent>,
    ) -> Result<Vec<KcId>, StoreError> {
        Ok(self.catalog.write().upsert_all(components)?)
    }

    pub fn with_catalog<R>(&self, f: impl FnOnce(&Catalog) -> R) -> R {
        f(&self.catalog.read())
    }

    pub fn component(&self, kc_id: &str) -> Option<KnowledgeComponent> {
        self.catalog.read().get(kc_id).cloned()
    }

    pub fn component_count(&self) -> usize {
        self.catalog.read().len()
    }

    // ==================== Students ====================

    /// Returns true when the student is new
    pub fn upsert_student(&self, profile: StudentProfile) -> bool {
        self.students
            .write()
            .insert(profile.student_id.clone(), profile)
            .is_none()
    }

    pub fn student(&self, student_id: &str) -> Option<StudentProfile> {
        self.students.read().get(student_id).cloned()
    }

    pub fn student_count(&self) -> usize {
        self.students.read().len()
    }

    // ==================== Knowledge State ====================

    pub fn states_for(&self, student_id: &str) -> HashMap<KcId, KnowledgeState> {
        self.states
            .read()
            .get(student_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Seed-if-absent, order check, BKT update and response append in one
    /// critical section.
    pub fn apply(
        &self,
        kc: &KnowledgeComponent,
        response: Response,
        received_at: i64,
    ) -> Result<AppliedResponse, StoreError> {
        let mut states = self.states.write();
        let per_student = states.entry(response.student_id.clone()).or_default();
        let state = ensure_state(per_student, &response.student_id, kc);

        if let Some(last) = state.last_response_at {
            if response.timestamp < last {
                return Err(StoreError::OutOfOrder {
                    student_id: response.student_id,
                    kc_id: response.kc_id,
                    last,
                    timestamp: response.timestamp,
                });
            }
        }

        let update = apply_response(state, &response)?;
        let state = state.clone();
        let id = Uuid::new_v4();
        self.responses.write().push(StoredResponse {
            id,
            received_at,
            response,
        });

        Ok(AppliedResponse { id, update, state })
    }

    pub fn responses_for(&self, student_id: &str) -> Vec<StoredResponse> {
        self.responses
            .read()
            .iter()
            .filter(|r| r.response.student_id == student_id)
            .cloned()
            .collect()
    }

    // ==================== Paths ====================

    pub fn path(&self, student_id: &str) -> Option<LearningPath> {
        self.paths.read().get(student_id).cloned()
    }

    pub fn student_ids_with_paths(&self) -> Vec<StudentId> {
        let mut ids: Vec<StudentId> = self.paths.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Read-modify-write of one student's active path under the write lock.
    /// The closure returns the path to save (if any) and a result.
    pub fn update_path<R, E>(
        &self,
        student_id: &str,
        now: i64,
        f: impl FnOnce(Option<&LearningPath>) -> Result<(Option<LearningPath>, R), E>,
    ) -> Result<R, E> {
        let mut paths = self.paths.write();
        let (next, result) = f(paths.get(student_id))?;
        if let Some(mut path) = next {
            let changed = paths.get(student_id) != Some(&path);
            if changed {
                path.updated_at = Some(now);
            }
            paths.insert(student_id.to_string(), path);
        }
        Ok(result)
    }

    pub fn archive_path(&self, mut path: LearningPath, now: i64) {
        path.updated_at = Some(now);
        self.archived_paths.write().push(path);
    }

    pub fn archived_paths_for(&self, student_id: &str) -> Vec<LearningPath> {
        self.archived_paths
            .read()
            .iter()
            .filter(|p| p.student_id == student_id)
            .cloned()
            .collect()
    }

    // ==================== Aggregates ====================

    /// Scorer input for every rostered student
    pub fn performance_snapshot(&self) -> Vec<StudentPerformance> {
        let students = self.students.read();
        let states = self.states.read();

        let mut snapshot: Vec<StudentPerformance> = students
            .values()
            .map(|profile| {
                let own = states.get(&profile.student_id);
                let (sum, count, last, responses) = own
                    .map(|m| {
                        m.values().fold((0.0, 0usize, None, 0u64), |acc, s| {
                            let last = match (acc.2, s.last_response_at) {
                                (Some(a), Some(b)) => Some(i64::max(a, b)),
                                (a, b) => a.or(b),
                            };
                            (acc.0 + s.p_mastery, acc.1 + 1, last, acc.3 + u64::from(s.attempts))
                        })
                    })
                    .unwrap_or((0.0, 0, None, 0));

                StudentPerformance {
                    student_id: profile.student_id.clone(),
                    name: profile.name.clone(),
                    p_mastery: (count > 0).then(|| sum / count as f64),
                    last_response_at: last,
                    response_count: responses,
                    declared_priority: profile.declared_priority,
                }
            })
            .collect();

        snapshot.sort_by(|a, b| a.student_id.cmp(&b.student_id));
        snapshot
    }
}
