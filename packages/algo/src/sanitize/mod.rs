//! Data Sanitization
//!
//! Numerical stability utilities for probabilities.
//!
//! Functions:
//! - Probability clamping with NaN/Inf handling
//! - BKT parameter validation
//!
//! Bad values are never fatal: they are clamped into range and reported so one
//! misconfigured KC cannot block other students.

use serde::Serialize;

use crate::types::BktParams;

/// A problem found while sanitizing inputs to the tracer
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamWarning {
    /// Value was outside [0, 1] or not finite and has been clamped
    OutOfRange {
        field: &'static str,
        value: f64,
        clamped: f64,
    },
    /// Bayes denominator was zero; evidence step left the prior unchanged
    DegenerateEvidence { correct: bool },
    /// pS + pG >= 1: a correct answer no longer raises the estimate
    NonIdentifiable { p_slip: f64, p_guess: f64 },
}

/// Clamp a value into [0, 1]; NaN maps to 0
pub fn clamp_probability(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Clamp a probability and record a warning when it changed
pub fn sanitize_probability(
    field: &'static str,
    value: f64,
    warnings: &mut Vec<ParamWarning>,
) -> f64 {
    let clamped = clamp_probability(value);
    if clamped != value || value.is_nan() {
        warnings.push(ParamWarning::OutOfRange {
            field,
            value,
            clamped,
        });
    }
    clamped
}

/// Return a sanitized copy of a BKT quadruple
pub fn sanitize_params(params: &BktParams, warnings: &mut Vec<ParamWarning>) -> BktParams {
    let sanitized = BktParams {
        p_init: sanitize_probability("pL0", params.p_init, warnings),
        p_transit: sanitize_probability("pT", params.p_transit, warnings),
        p_slip: sanitize_probability("pS", params.p_slip, warnings),
        p_guess: sanitize_probability("pG", params.p_guess, warnings),
    };

    if sanitized.p_slip + sanitized.p_guess >= 1.0 {
        warnings.push(ParamWarning::NonIdentifiable {
            p_slip: sanitized.p_slip,
            p_guess: sanitized.p_guess,
        });
    }

    sanitized
}

/// Validate without modifying; returns every problem found
pub fn validate_params(params: &BktParams) -> Vec<ParamWarning> {
    let mut warnings = Vec::new();
    sanitize_params(params, &mut warnings);
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_probability() {
        assert_eq!(clamp_probability(0.4), 0.4);
        assert_eq!(clamp_probability(-0.2), 0.0);
        assert_eq!(clamp_probability(1.7), 1.0);
        assert_eq!(clamp_probability(f64::NAN), 0.0);
        assert_eq!(clamp_probability(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_sanitize_probability_records_warning() {
        let mut warnings = Vec::new();
        assert_eq!(sanitize_probability("pS", 0.1, &mut warnings), 0.1);
        assert!(warnings.is_empty());

        assert_eq!(sanitize_probability("pS", 1.5, &mut warnings), 1.0);
        assert_eq!(
            warnings,
            vec![ParamWarning::OutOfRange {
                field: "pS",
                value: 1.5,
                clamped: 1.0
            }]
        );
    }

    #[test]
    fn test_sanitize_params_valid() {
        assert!(validate_params(&BktParams::default()).is_empty());
    }

    #[test]
    fn test_sanitize_params_clamps_each_field() {
        let mut warnings = Vec::new();
        let params = sanitize_params(&BktParams::new(-0.1, 2.0, f64::NAN, 0.2), &mut warnings);
        assert_eq!(params, BktParams::new(0.0, 1.0, 0.0, 0.2));
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_non_identifiable_reported_not_altered() {
        let mut warnings = Vec::new();
        let params = sanitize_params(&BktParams::new(0.3, 0.1, 0.6, 0.5), &mut warnings);
        assert_eq!(params.p_slip, 0.6);
        assert_eq!(params.p_guess, 0.5);
        assert!(matches!(warnings[0], ParamWarning::NonIdentifiable { .. }));
    }
}
