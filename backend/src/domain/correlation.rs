//! Correlation identifiers pairing a price entry with its log entry.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Validation errors returned by [`CorrelationId::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationIdValidationError {
    Empty,
    Malformed,
}

impl fmt::Display for CorrelationIdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "correlation id must not be empty"),
            Self::Malformed => write!(f, "correlation id must be a valid UUID"),
        }
    }
}

impl std::error::Error for CorrelationIdValidationError {}

/// Identifier shared by a price entry and the activity entry that reported it.
///
/// Freshly generated for every submission, so no two price entries ever
/// share one. Retraction matches on this value exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Parse a correlation id from its textual form.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CorrelationIdValidationError> {
        let raw = raw.as_ref();
        if raw.trim().is_empty() {
            return Err(CorrelationIdValidationError::Empty);
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| CorrelationIdValidationError::Malformed)
    }

    /// Generate a fresh identifier for a new submission.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an identifier read back from storage.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl From<CorrelationId> for String {
    fn from(value: CorrelationId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for CorrelationId {
    type Error = CorrelationIdValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
