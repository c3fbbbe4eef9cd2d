//! # mastery-algo - adaptive learning core
//!
//! Pure Rust implementation of the learning-engine core:
//!
//! - **Bayesian Knowledge Tracing** - per (student, KC) mastery estimate
//! - **Path Sequencer** - prerequisite-aware choice of the next KC
//! - **Intervention Scorer** - explained ranking of students needing attention
//!
//! Everything here is synchronous and side-effect free apart from `tracing`
//! events. Persistence, ordering of writes and HTTP live in the service crate.
//!
//! ## Modules
//!
//! - [`bkt`] - BKT forward update, knowledge state seeding, mastery policy
//! - [`catalog`] - KC table and curriculum scope
//! - [`graph`] - prerequisite graph (cycles, ancestors, topological order)
//! - [`sequencer`] - learning path selection, advance, reconcile, supersede
//! - [`intervention`] - urgency scoring and ranking
//! - [`sanitize`] - probability clamping and parameter validation
//! - [`types`] - shared data model
//!
//! ## Example
//!
//! ```rust
//! use mastery_algo::{update, BktParams};
//!
//! let params = BktParams::new(0.3, 0.09, 0.1, 0.2);
//! let mut p = params.p_init;
//! for _ in 0..3 {
//!     p = update(p, true, &params);
//! }
//! assert!(p > 0.8);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod bkt;
pub mod catalog;
pub mod graph;
pub mod intervention;
pub mod sanitize;
pub mod sequencer;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use types::*;

pub use bkt::{
    apply_response, ensure_state, replay, seed_state, update, update_detailed, BktUpdate,
    MasteryPolicy, TraceError, DEFAULT_MASTERY_THRESHOLD,
};

pub use catalog::{Catalog, CatalogError, CurriculumScope};

pub use graph::{CycleReport, PrereqGraph};

pub use sequencer::{
    Advance, PathError, PathOutcome, PathSequencer, Reconciliation, RejectReason, RejectedKc,
    StatusChange, Supersession,
};

pub use intervention::{InterventionPolicy, InterventionReport, InterventionScorer};

pub use sanitize::ParamWarning;
