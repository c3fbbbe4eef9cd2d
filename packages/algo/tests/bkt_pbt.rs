//! Property-Based Tests for Knowledge Tracing
//!
//! Tests the following invariants:
//! - Bounds: every update stays in [0, 1], even for out-of-range inputs
//! - Monotonicity: a correct answer never scores below an incorrect one
//!   when the parameters are identifiable (pS + pG < 1)
//! - Idempotent seeding: ensure_state never resets progressed mastery
//! - Replay: folding responses in timestamp order matches apply_response

use std::collections::HashMap;

use proptest::prelude::*;

use mastery_algo::{
    apply_response, ensure_state, replay, update, BktParams, KnowledgeComponent, Response,
};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_probability() -> impl Strategy<Value = f64> {
    (0u64..=1000u64).prop_map(|v| v as f64 / 1000.0)
}

fn arb_params() -> impl Strategy<Value = BktParams> {
    (
        arb_probability(),
        arb_probability(),
        arb_probability(),
        arb_probability(),
    )
        .prop_map(|(p_init, p_transit, p_slip, p_guess)| {
            BktParams::new(p_init, p_transit, p_slip, p_guess)
        })
}

/// pS + pG < 1
fn arb_identifiable_params() -> impl Strategy<Value = BktParams> {
    (
        arb_probability(),
        arb_probability(),
        (0u64..=499u64),
        (0u64..=499u64),
    )
        .prop_map(|(p_init, p_transit, slip, guess)| {
            BktParams::new(p_init, p_transit, slip as f64 / 1000.0, guess as f64 / 1000.0)
        })
}

fn arb_wild_f64() -> impl Strategy<Value = f64> {
    prop_oneof![
        (-10.0f64..10.0f64),
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
}

fn arb_responses() -> impl Strategy<Value = Vec<(bool, i64)>> {
    prop::collection::vec((any::<bool>(), 0i64..1_000_000i64), 0..30)
}

fn response(correct: bool, timestamp: i64) -> Response {
    Response {
        student_id: "s1".to_string(),
        content_item_id: format!("item-{timestamp}"),
        kc_id: "kc".to_string(),
        correct,
        timestamp,
        latency_ms: None,
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn update_stays_in_unit_interval(
        prior in arb_probability(),
        correct in any::<bool>(),
        params in arb_params(),
    ) {
        let p = update(prior, correct, &params);
        prop_assert!((0.0..=1.0).contains(&p), "p = {}", p);
    }

    #[test]
    fn update_bounded_for_invalid_inputs(
        prior in arb_wild_f64(),
        correct in any::<bool>(),
        values in (arb_wild_f64(), arb_wild_f64(), arb_wild_f64(), arb_wild_f64()),
    ) {
        let params = BktParams::new(values.0, values.1, values.2, values.3);
        let p = update(prior, correct, &params);
        prop_assert!((0.0..=1.0).contains(&p), "p = {}", p);
    }

    #[test]
    fn correct_never_below_incorrect(
        prior in arb_probability(),
        params in arb_identifiable_params(),
    ) {
        let right = update(prior, true, &params);
        let wrong = update(prior, false, &params);
        prop_assert!(right >= wrong - 1e-12, "correct {} < incorrect {}", right, wrong);
    }

    #[test]
    fn seeding_twice_keeps_progress(
        params in arb_params(),
        progressed in arb_probability(),
    ) {
        let kc = KnowledgeComponent::new("kc", 0).with_params(params);
        let mut states = HashMap::new();

        ensure_state(&mut states, "s1", &kc).p_mastery = progressed;
        let again = ensure_state(&mut states, "s1", &kc);

        prop_assert_eq!(again.p_mastery, progressed);
        prop_assert_eq!(states.len(), 1);
    }

    #[test]
    fn replay_matches_sequential_application(
        params in arb_identifiable_params(),
        history in arb_responses(),
    ) {
        let mut ordered: Vec<Response> = history
            .iter()
            .map(|&(correct, ts)| response(correct, ts))
            .collect();
        ordered.sort_by_key(|r| r.timestamp);

        let kc = KnowledgeComponent::new("kc", 0).with_params(params);
        let mut states = HashMap::new();
        let state = ensure_state(&mut states, "s1", &kc);
        for r in &ordered {
            apply_response(state, r).unwrap();
        }

        let replayed = replay(&params, &ordered);
        prop_assert!((state.p_mastery - replayed).abs() < 1e-12);
        prop_assert_eq!(state.attempts as usize, ordered.len());
    }
}
