//! Common Types and Constants
//!
//! Shared data structures used across the tracer, sequencer and scorer.
//! All timestamps are epoch milliseconds.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Numerical stability epsilon for Bayes denominators
pub const EPSILON: f64 = 1e-12;

/// Milliseconds in one day
pub const DAY_MS: i64 = 86_400_000;

pub type KcId = String;
pub type StudentId = String;

// ==================== Knowledge Components ====================

/// BKT parameter quadruple
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BktParams {
    /// Initial mastery probability
    #[serde(rename = "pL0")]
    pub p_init: f64,
    /// Learn-transition probability
    #[serde(rename = "pT")]
    pub p_transit: f64,
    /// Slip probability
    #[serde(rename = "pS")]
    pub p_slip: f64,
    /// Guess probability
    #[serde(rename = "pG")]
    pub p_guess: f64,
}

impl BktParams {
    pub fn new(p_init: f64, p_transit: f64, p_slip: f64, p_guess: f64) -> Self {
        Self {
            p_init,
            p_transit,
            p_slip,
            p_guess,
        }
    }
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            p_init: 0.3,
            p_transit: 0.09,
            p_slip: 0.1,
            p_guess: 0.2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KcStatus {
    #[default]
    Active,
    /// Soft-deleted: kept for existing states and paths, never added to new paths
    Retired,
}

/// An atomic skill
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeComponent {
    pub id: KcId,
    pub name: String,
    #[serde(default)]
    pub curriculum_code: Option<String>,
    #[serde(default)]
    pub grade_level: Option<u8>,
    /// Author-defined curriculum order, used for tie-breaking
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub params: BktParams,
    /// KCs this one requires
    #[serde(default)]
    pub prerequisites: Vec<KcId>,
    #[serde(default)]
    pub status: KcStatus,
}

impl KnowledgeComponent {
    pub fn new(id: impl Into<KcId>, position: i64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            curriculum_code: None,
            grade_level: None,
            position,
            params: BktParams::default(),
            prerequisites: Vec::new(),
            status: KcStatus::Active,
        }
    }

    pub fn requires<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<KcId>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_params(mut self, params: BktParams) -> Self {
        self.params = params;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == KcStatus::Active
    }

    /// Curriculum ordering key: position first, id as a stable fallback
    pub fn order_key(&self) -> (i64, &str) {
        (self.position, self.id.as_str())
    }
}

// ==================== Knowledge State ====================

/// Mastery estimate for one (student, KC) pair
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeState {
    pub student_id: StudentId,
    pub kc_id: KcId,
    /// Current posterior in [0, 1]
    pub p_mastery: f64,
    /// Parameters in effect for this pair, copied from the KC at creation
    pub params: BktParams,
    pub attempts: u32,
    pub correct_count: u32,
    pub last_response_at: Option<i64>,
}

/// A single scored attempt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub student_id: StudentId,
    pub content_item_id: String,
    pub kc_id: KcId,
    pub correct: bool,
    pub timestamp: i64,
    #[serde(default)]
    pub latency_ms: Option<i64>,
}

// ==================== Learning Path ====================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    InProgress,
    Completed,
}

impl EntryStatus {
    /// Whether the sequencer has committed to this entry
    pub fn is_committed(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStatus {
    #[default]
    Active,
    Archived,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    pub kc_id: KcId,
    pub status: EntryStatus,
}

impl PathEntry {
    pub fn pending(kc_id: impl Into<KcId>) -> Self {
        Self {
            kc_id: kc_id.into(),
            status: EntryStatus::Pending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub student_id: StudentId,
    pub entries: Vec<PathEntry>,
    pub status: PathStatus,
    /// Bumped on every mutation
    pub version: u64,
    /// Stamped by the store when the path is saved
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl LearningPath {
    pub fn new(student_id: impl Into<StudentId>) -> Self {
        Self {
            student_id: student_id.into(),
            entries: Vec::new(),
            status: PathStatus::Active,
            version: 0,
            updated_at: None,
        }
    }

    pub fn entry(&self, kc_id: &str) -> Option<&PathEntry> {
        self.entries.iter().find(|e| e.kc_id == kc_id)
    }

    pub fn status_of(&self, kc_id: &str) -> Option<EntryStatus> {
        self.entry(kc_id).map(|e| e.status)
    }

    pub fn position_of(&self, kc_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.kc_id == kc_id)
    }

    pub fn contains(&self, kc_id: &str) -> bool {
        self.position_of(kc_id).is_some()
    }

    pub fn is_active(&self) -> bool {
        self.status == PathStatus::Active
    }

    pub fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}

// ==================== Interventions ====================

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Aggregated performance of one student, as read from the store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPerformance {
    pub student_id: StudentId,
    pub name: String,
    /// Mean mastery over the student's KCs, if any state exists
    #[serde(default)]
    pub p_mastery: Option<f64>,
    #[serde(default)]
    pub last_response_at: Option<i64>,
    #[serde(default)]
    pub response_count: u64,
    #[serde(default)]
    pub declared_priority: Option<Priority>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    CriticalMastery,
    VeryLowMastery,
    NeverStarted,
    InactiveLong,
    InactiveShort,
    DeclaredHighPriority,
}

/// One fired signal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionReason {
    pub code: ReasonCode,
    pub message: String,
    pub weight: f64,
}

/// Ranked output row; derived, never persisted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionRecord {
    pub student_id: StudentId,
    pub name: String,
    pub urgency_score: f64,
    /// Fired signals in evaluation order
    pub reasons: Vec<InterventionReason>,
    pub priority: Priority,
}

impl InterventionRecord {
    pub fn has_reason(&self, code: ReasonCode) -> bool {
        self.reasons.iter().any(|r| r.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bkt_params_wire_names() {
        let json = serde_json::to_value(BktParams::default()).unwrap();
        assert_eq!(json["pL0"], 0.3);
        assert_eq!(json["pT"], 0.09);
        assert_eq!(json["pS"], 0.1);
        assert_eq!(json["pG"], 0.2);
    }

    #[test]
    fn test_kc_defaults_from_minimal_json() {
        let kc: KnowledgeComponent =
            serde_json::from_str(r#"{"id":"frac-add","name":"Adding fractions"}"#).unwrap();
        assert_eq!(kc.position, 0);
        assert!(kc.prerequisites.is_empty());
        assert!(kc.is_active());
        assert_eq!(kc.params, BktParams::default());
    }

    #[test]
    fn test_entry_status_serializes_snake_case() {
        let json = serde_json::to_string(&EntryStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert!(EntryStatus::Completed.is_committed());
        assert!(!EntryStatus::Pending.is_committed());
    }

    #[test]
    fn test_path_lookup() {
        let mut path = LearningPath::new("s1");
        path.entries.push(PathEntry::pending("a"));
        path.entries.push(PathEntry::pending("b"));
        assert_eq!(path.position_of("b"), Some(1));
        assert_eq!(path.status_of("a"), Some(EntryStatus::Pending));
        assert!(!path.contains("c"));
        assert_eq!(path.count(EntryStatus::Pending), 2);
    }
}
