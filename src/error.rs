use derive_more::{Display, Error};

use crate::types::{Point, Value};

pub type Result<T> = core::result::Result<T, MarchingCubesError>;

#[derive(Debug, Clone, PartialEq, Display, Error)]
pub enum MarchingCubesError {
    /// The domain bounds cannot be traversed: `step` is not positive, a value is not
    /// finite, or `min > max`.
    #[display("invalid domain: min = {min}, max = {max}, step = {step}")]
    InvalidDomain { min: Value, max: Value, step: Value },

    /// The scalar field failed to produce a value.
    #[display("field evaluation failed at {point}: {source}")]
    Evaluation { point: Point, source: FieldError },
}

/// Failure reported by a [`Fallible`](crate::types::Fallible) scalar field.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("{reason}")]
pub struct FieldError {
    reason: String,
}

impl FieldError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}
