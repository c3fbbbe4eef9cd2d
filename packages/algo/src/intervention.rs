//! Intervention Scorer
//!
//! Ranks students by how urgently a teacher should step in. Each student is
//! scored independently from three signal groups, evaluated in this order:
//!
//! 1. **Mastery** - aggregated estimate below the critical or very-low band
//! 2. **Inactivity** - never started, or whole days since the last response
//! 3. **Declared priority** - a teacher-set high priority
//!
//! Every fired signal adds its weight and a human-readable reason.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{
    InterventionReason, InterventionRecord, Priority, ReasonCode, StudentPerformance, DAY_MS,
};

/// Number of records in the urgent view
pub const DEFAULT_TOP_N: usize = 5;

// ==================== Policy ====================

/// Thresholds and weights for the scorer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterventionPolicy {
    /// Mastery below this is critical
    pub critical_mastery: f64,
    pub critical_weight: f64,
    /// Mastery below this (and not critical) is very low
    pub very_low_mastery: f64,
    pub very_low_weight: f64,
    pub never_started_weight: f64,
    /// Whole days of inactivity beyond which the long signal fires
    pub inactive_long_days: i64,
    pub inactive_long_weight: f64,
    pub inactive_short_days: i64,
    pub inactive_short_weight: f64,
    pub declared_priority_weight: f64,
    /// Bucket boundaries on the summed score
    pub high_score: f64,
    pub medium_score: f64,
    pub top_n: usize,
}

impl Default for InterventionPolicy {
    fn default() -> Self {
        Self {
            critical_mastery: 0.20,
            critical_weight: 50.0,
            very_low_mastery: 0.30,
            very_low_weight: 30.0,
            never_started_weight: 10.0,
            inactive_long_days: 7,
            inactive_long_weight: 25.0,
            inactive_short_days: 3,
            inactive_short_weight: 15.0,
            declared_priority_weight: 20.0,
            high_score: 50.0,
            medium_score: 25.0,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl InterventionPolicy {
    pub fn bucket(&self, score: f64) -> Priority {
        if score >= self.high_score {
            Priority::High
        } else if score >= self.medium_score {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

// ==================== Report ====================

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionReport {
    /// Every student, most urgent first
    pub records: Vec<InterventionRecord>,
    pub generated_at: i64,
    pub top_n: usize,
}

impl InterventionReport {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// First `top_n` records that fired at least one signal
    pub fn urgent(&self) -> Vec<InterventionRecord> {
        self.records
            .iter()
            .filter(|r| r.urgency_score > 0.0)
            .take(self.top_n)
            .cloned()
            .collect()
    }

    pub fn by_priority(&self, priority: Priority) -> impl Iterator<Item = &InterventionRecord> {
        self.records.iter().filter(move |r| r.priority == priority)
    }
}

// ==================== Scorer ====================

#[derive(Clone, Debug, Default)]
pub struct InterventionScorer {
    policy: InterventionPolicy,
}

impl InterventionScorer {
    pub fn new(policy: InterventionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &InterventionPolicy {
        &self.policy
    }

    /// Score one student at `now` (epoch ms)
    pub fn score(&self, student: &StudentPerformance, now: i64) -> InterventionRecord {
        let policy = &self.policy;
        let mut reasons = Vec::new();

        if let Some(p) = student.p_mastery {
            if p < policy.critical_mastery {
                reasons.push(InterventionReason {
                    code: ReasonCode::CriticalMastery,
                    message: format!("Critical mastery level ({:.0}%)", p * 100.0),
                    weight: policy.critical_weight,
                });
            } else if p < policy.very_low_mastery {
                reasons.push(InterventionReason {
                    code: ReasonCode::VeryLowMastery,
                    message: format!("Very low mastery ({:.0}%)", p * 100.0),
                    weight: policy.very_low_weight,
                });
            }
        }

        match student.last_response_at {
            None => reasons.push(InterventionReason {
                code: ReasonCode::NeverStarted,
                message: "No activity recorded yet".to_string(),
                weight: policy.never_started_weight,
            }),
            Some(last) => {
                let days = (now - last).div_euclid(DAY_MS);
                if days > policy.inactive_long_days {
                    reasons.push(InterventionReason {
                        code: ReasonCode::InactiveLong,
                        message: format!("Inactive for {days} days"),
                        weight: policy.inactive_long_weight,
                    });
                } else if days > policy.inactive_short_days {
                    reasons.push(InterventionReason {
                        code: ReasonCode::InactiveShort,
                        message: format!("No activity in {days} days"),
                        weight: policy.inactive_short_weight,
                    });
                }
            }
        }

        if student.declared_priority == Some(Priority::High) {
            reasons.push(InterventionReason {
                code: ReasonCode::DeclaredHighPriority,
                message: "Marked as high priority".to_string(),
                weight: policy.declared_priority_weight,
            });
        }

        let urgency_score: f64 = reasons.iter().map(|r| r.weight).sum();

        InterventionRecord {
            student_id: student.student_id.clone(),
            name: student.name.clone(),
            urgency_score,
            priority: policy.bucket(urgency_score),
            reasons,
        }
    }

    /// Score the whole roster and sort most urgent first.
    /// Ties break by name, then student id.
    pub fn rank(&self, students: &[StudentPerformance], now: i64) -> InterventionReport {
        let mut records: Vec<InterventionRecord> = students
            .par_iter()
            .map(|student| self.score(student, now))
            .collect();

        records.sort_by(compare_urgency);

        debug!(
            students = students.len(),
            high = records.iter().filter(|r| r.priority == Priority::High).count(),
            "intervention ranking computed"
        );

        InterventionReport {
            records,
            generated_at: now,
            top_n: self.policy.top_n,
        }
    }
}

fn compare_urgency(a: &InterventionRecord, b: &InterventionRecord) -> Ordering {
    b.urgency_score
        .total_cmp(&a.urgency_score)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.student_id.cmp(&b.student_id))
}
