//! Property-Based Tests for the in-memory store
//!
//! Tests the following invariants:
//! - Ordering: accepted responses per (student, KC) never go back in time
//! - Accounting: attempts equal the number of accepted responses
//! - Bounds: mastery stays in [0, 1] whatever the answer sequence

use proptest::prelude::*;

use mastery_algo::{BktParams, KnowledgeComponent, Response};
use mastery_backend::store::{MemoryStore, StoreError};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_params() -> impl Strategy<Value = BktParams> {
    (0u64..=1000, 0u64..=1000, 0u64..=1000, 0u64..=1000).prop_map(|(a, b, c, d)| {
        BktParams::new(
            a as f64 / 1000.0,
            b as f64 / 1000.0,
            c as f64 / 1000.0,
            d as f64 / 1000.0,
        )
    })
}

fn arb_answers() -> impl Strategy<Value = Vec<(bool, i64)>> {
    prop::collection::vec((any::<bool>(), 0i64..10_000), 1..40)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn accepted_responses_are_ordered(params in arb_params(), answers in arb_answers()) {
        let store = MemoryStore::new();
        let kc = KnowledgeComponent::new("kc", 0).with_params(params);

        let mut accepted: Vec<i64> = Vec::new();
        for (i, (correct, timestamp)) in answers.into_iter().enumerate() {
            let response = Response {
                student_id: "s1".to_string(),
                content_item_id: format!("item-{i}"),
                kc_id: "kc".to_string(),
                correct,
                timestamp,
                latency_ms: None,
            };
            match store.apply(&kc, response, timestamp) {
                Ok(applied) => {
                    prop_assert!((0.0..=1.0).contains(&applied.state.p_mastery));
                    accepted.push(timestamp);
                }
                Err(StoreError::OutOfOrder { last, timestamp: rejected, .. }) => {
                    prop_assert!(rejected < last);
                    prop_assert_eq!(accepted.last().copied(), Some(last));
                }
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        prop_assert!(accepted.windows(2).all(|w| w[0] <= w[1]));
        let states = store.states_for("s1");
        prop_assert_eq!(states["kc"].attempts as usize, accepted.len());
        prop_assert_eq!(store.responses_for("s1").len(), accepted.len());
    }
}
