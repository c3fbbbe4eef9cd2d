//! Property-Based Tests for Intervention Ranking
//!
//! Tests the following invariants:
//! - Stability: ranking is independent of roster order
//! - Ordering: scores never increase down the list; equal scores sort by name
//! - Score integrity: the score is the sum of the fired reason weights

use proptest::prelude::*;

use mastery_algo::{InterventionScorer, Priority, StudentPerformance, DAY_MS};

const NOW: i64 = 1_700_000_000_000;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Alice".to_string()),
        Just("Bob".to_string()),
        Just("Carol".to_string()),
        "[A-Z][a-z]{2,6}",
    ]
}

fn arb_priority() -> impl Strategy<Value = Option<Priority>> {
    proptest::option::of(prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
    ])
}

fn arb_roster() -> impl Strategy<Value = Vec<StudentPerformance>> {
    prop::collection::vec(
        (
            arb_name(),
            proptest::option::of((0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)),
            proptest::option::of(0i64..20 * DAY_MS),
            (0u64..200u64),
            arb_priority(),
        ),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(
                |(i, (name, p_mastery, idle, response_count, declared_priority))| {
                    StudentPerformance {
                        student_id: format!("s{i:03}"),
                        name,
                        p_mastery,
                        last_response_at: idle.map(|ms| NOW - ms),
                        response_count,
                        declared_priority,
                    }
                },
            )
            .collect()
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn ranking_ignores_input_order(roster in arb_roster()) {
        let scorer = InterventionScorer::default();
        let forward = scorer.rank(&roster, NOW);

        let mut reversed = roster.clone();
        reversed.reverse();
        let backward = scorer.rank(&reversed, NOW);

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.len(), roster.len());
    }

    #[test]
    fn ranking_is_sorted(roster in arb_roster()) {
        let report = InterventionScorer::default().rank(&roster, NOW);

        for pair in report.records.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.urgency_score >= b.urgency_score);
            if a.urgency_score == b.urgency_score {
                prop_assert!((&a.name, &a.student_id) <= (&b.name, &b.student_id));
            }
        }
    }

    #[test]
    fn score_is_sum_of_reasons(roster in arb_roster()) {
        let scorer = InterventionScorer::default();
        let report = scorer.rank(&roster, NOW);

        for record in &report.records {
            let total: f64 = record.reasons.iter().map(|r| r.weight).sum();
            prop_assert!((record.urgency_score - total).abs() < 1e-9);
            prop_assert_eq!(record.priority, scorer.policy().bucket(record.urgency_score));
        }
        for record in report.urgent() {
            prop_assert!(record.urgency_score > 0.0);
        }
    }
}
