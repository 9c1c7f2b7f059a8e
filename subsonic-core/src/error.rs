//! Input errors — precondition violations surfaced by the qualifier.
//!
//! A business-rule failure is never an error: it is a `Verdict::Rejected`.
//! These variants cover malformed bars and parameter records only.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("bar field `{field}` is not a finite number ({value})")]
    NonFinite { field: &'static str, value: f64 },

    #[error("bar high {high} is below low {low}")]
    InvertedRange { high: f64, low: f64 },

    #[error("bar is missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("invalid setup parameters: {0}")]
    InvalidParams(String),
}

/// Fail with `NonFinite` unless `value` is a finite number.
pub(crate) fn require_finite(field: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::NonFinite { field, value })
    }
}

/// Fail with `MissingField` when the optional value is absent, `NonFinite` when it is NaN/inf.
pub(crate) fn require_present(field: &'static str, value: Option<f64>) -> Result<f64, InputError> {
    match value {
        Some(v) => require_finite(field, v),
        None => Err(InputError::MissingField { field }),
    }
}
