//! Domain-level error types.
//!
//! These errors are transport agnostic. Whatever adapter drives the ledger
//! maps them onto its own envelope (HTTP status, CLI exit code, and so on).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation. Nothing was written.
    InvalidRequest,
    /// The referenced user does not exist.
    UserNotFound,
    /// The referenced station has never received a price report.
    StationNotFound,
    /// The first half of a dual-write committed and the second half failed.
    PartialConsistency,
    /// The backing store could not be reached.
    StoreUnavailable,
    /// The backing store rejected or failed the operation.
    StoreFailure,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use gaswatch::domain::{Error, ErrorCode};
///
/// let err = Error::new(ErrorCode::UserNotFound, "missing");
/// assert_eq!(err.code(), ErrorCode::UserNotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    code: ErrorCode,
    message: String,
    details: Option<Value>,
}

/// Validation errors emitted by the constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorValidationError {
    EmptyMessage,
}

impl std::fmt::Display for ErrorValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "error message must not be empty"),
        }
    }
}

impl std::error::Error for ErrorValidationError {}

/// Which half of a dual-write an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerSide {
    /// The per-station price ledger.
    PriceLedger,
    /// The per-user activity log.
    ActivityLog,
}

impl LedgerSide {
    /// Stable label used in error details and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceLedger => "priceLedger",
            Self::ActivityLog => "activityLog",
        }
    }
}

/// Description of a dual-write that only half applied.
///
/// Carried in the `details` of a [`ErrorCode::PartialConsistency`] error so
/// operators can reconcile the two sides later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialWrite {
    pub operation: &'static str,
    pub correlation_id: String,
    pub committed: LedgerSide,
    pub failed: LedgerSide,
    pub cause: String,
}

impl Error {
    /// Create a new error, panicking if validation fails.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        match Self::try_new(code, message) {
            Ok(value) => value,
            Err(err) => panic!("error messages must satisfy validation: {err}"),
        }
    }

    /// Fallible constructor that validates the message content.
    pub fn try_new(
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            details: None,
        })
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use gaswatch::domain::{Error, ErrorCode};
    /// use serde_json::json;
    ///
    /// let err = Error::new(ErrorCode::InvalidRequest, "bad")
    ///     .with_details(json!({ "field": "fuelType" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Invalid request pointing at a single offending field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::invalid_request(message).with_details(json!({ "field": field }))
    }

    /// Convenience constructor for [`ErrorCode::UserNotFound`].
    pub fn user_not_found(user_id: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::UserNotFound, format!("user {user_id} not found"))
            .with_details(json!({ "userId": user_id.to_string() }))
    }

    /// Convenience constructor for [`ErrorCode::StationNotFound`].
    pub fn station_not_found(station_id: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::StationNotFound,
            format!("station {station_id} has no reported prices"),
        )
        .with_details(json!({ "stationId": station_id.to_string() }))
    }

    /// Convenience constructor for [`ErrorCode::StoreUnavailable`].
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::StoreFailure`].
    pub fn store_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreFailure, message)
    }

    /// Convenience constructor for [`ErrorCode::PartialConsistency`].
    pub fn partial_consistency(write: PartialWrite) -> Self {
        let PartialWrite {
            operation,
            correlation_id,
            committed,
            failed,
            cause,
        } = write;
        Self::new(
            ErrorCode::PartialConsistency,
            format!(
                "{operation} committed to the {} but failed on the {}: {cause}",
                committed.as_str(),
                failed.as_str()
            ),
        )
        .with_details(json!({
            "operation": operation,
            "correlationId": correlation_id,
            "committed": committed.as_str(),
            "failed": failed.as_str(),
            "cause": cause,
        }))
    }

    /// Whether this error reports a half-applied dual-write.
    pub fn is_partial(&self) -> bool {
        self.code == ErrorCode::PartialConsistency
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            details,
        } = value;

        let mut error = Error::try_new(code, message)?;
        error.details = details;
        Ok(error)
    }
}
