use thiserror::Error;

/// Contract violations raised by the field engine and the signal estimator.
///
/// Every variant carries only `Copy` data so it can be returned from the
/// audio callback without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FieldError {
    #[error("field bounds must have positive finite size, got {width}x{height}")]
    InvalidBounds { width: f32, height: f32 },

    #[error("block shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("invalid tuning: {0}")]
    InvalidTuning(&'static str),
}
