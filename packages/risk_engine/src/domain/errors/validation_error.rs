//! Accumulated, structured validation errors.
//!
//! Validation never short-circuits: every rule that fails is recorded, so a
//! single round-trip reports every problem. [`ValidationErrors`] is the
//! applicative-style accumulator; the conversion to a response is simply
//! its `Vec<FieldError>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RequiredField,
    InvalidFormat,
    InvalidLength,
    InvalidPattern,
    InvalidRange,
    InvalidCombination,
    InvalidNodeType,
    InvalidLognormalParams,
    InvalidDistribution,
    UnsupportedDistributionType,
    MissingReference,
    AmbiguousReference,
    DuplicateValue,
    EmptyCollection,
    ConstraintViolation,
}

/// One field-level violation: `{field, code, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: ErrorCode,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}: {}", self.field, self.code, self.message)
    }
}

/// Accumulates [`FieldError`]s across independent validation branches
/// instead of short-circuiting on the first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn push_if_err<T>(&mut self, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.push(error);
                None
            }
        }
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.errors
    }

    pub fn as_slice(&self) -> &[FieldError] {
        &self.errors
    }

    /// Converts into `Err(self)` if any errors were accumulated, else `Ok(value)`.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl FromIterator<FieldError> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}
