//! Refined primitives: the validator is the constructor. Each newtype's
//! only public constructor validates its raw input and is the sole path
//! to a value of that type.

use crate::domain::errors::{ErrorCode, FieldError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A trimmed, non-blank string of at most 50 characters, unique within a
/// tree (uniqueness is a tree-level rule, enforced by the validator, not
/// by this type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub const MAX_LEN: usize = 50;

    pub fn parse(field: &str, raw: impl Into<String>) -> Result<Self, FieldError> {
        let trimmed = raw.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(FieldError::new(
                field,
                ErrorCode::RequiredField,
                "name must not be blank",
            ));
        }
        if trimmed.chars().count() > Self::MAX_LEN {
            return Err(FieldError::new(
                field,
                ErrorCode::InvalidLength,
                format!("name must be at most {} characters", Self::MAX_LEN),
            ));
        }
        Ok(Name(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Name {
    type Error = FieldError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Name::parse("name", raw)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A real number strictly in `(0, 1)`, used both for leaf occurrence and
/// for Metalog percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Probability(f64);

impl Probability {
    pub fn parse(field: &str, raw: f64) -> Result<Self, FieldError> {
        if !raw.is_finite() || raw <= 0.0 || raw >= 1.0 {
            return Err(FieldError::new(
                field,
                ErrorCode::InvalidRange,
                "probability must be strictly between 0.0 and 1.0",
            ));
        }
        Ok(Probability(raw))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Probability {
    type Error = FieldError;

    fn try_from(raw: f64) -> Result<Self, Self::Error> {
        Probability::parse("probability", raw)
    }
}

impl From<Probability> for f64 {
    fn from(p: Probability) -> Self {
        p.0
    }
}

/// A non-negative integer loss amount, in a caller-chosen currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Loss(pub u64);

impl Loss {
    pub const ZERO: Loss = Loss(0);

    pub fn checked_add(self, other: Loss) -> Option<Loss> {
        self.0.checked_add(other.0).map(Loss)
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tree's monotonically increasing version counter, bumped on every
/// mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn next(self) -> Epoch {
        Epoch(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
