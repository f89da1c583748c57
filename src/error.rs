//! Custom error types for SpendGuard
//!
//! This module defines the error hierarchy for the library using thiserror.
//! The CLI binary wraps these in `anyhow` at the outermost layer only.

use thiserror::Error;

/// The main error type for SpendGuard operations
#[derive(Error, Debug)]
pub enum SpendError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Rejected input (non-positive amount, malformed date, bad name)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unrecognized period label
    #[error("Invalid period '{0}': expected one of weekly, monthly, yearly")]
    InvalidPeriod(String),

    /// Entity is missing or belongs to another user.
    ///
    /// Both cases render identically so callers cannot discover the
    /// existence of another user's records.
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// Persistence failures, annotated with the operation that hit them
    #[error("Storage error: {0}")]
    Storage(String),

    /// The per-operation deadline passed before the storage call ran
    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// A budget's stored spent amount disagrees with its expenses
    #[error("Inconsistency detected: {0}")]
    Inconsistency(String),
}

impl SpendError {
    /// Create a "not found" error for expenses
    pub fn expense_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Expense",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for categories
    pub fn category_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Category",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for budgets
    pub fn budget_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Budget",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<std::io::Error> for SpendError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for SpendError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for SpendGuard operations
pub type SpendResult<T> = Result<T, SpendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = SpendError::budget_not_found("bud-1234abcd");
        assert_eq!(err.to_string(), "Budget not found: bud-1234abcd");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_period_message() {
        let err = SpendError::InvalidPeriod("daily".into());
        assert_eq!(
            err.to_string(),
            "Invalid period 'daily': expected one of weekly, monthly, yearly"
        );
    }

    #[test]
    fn test_timeout_error() {
        let err = SpendError::Timeout {
            operation: "insert_expense",
            timeout_ms: 3000,
        };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Operation 'insert_expense' timed out after 3000ms"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SpendError = io_err.into();
        assert!(matches!(err, SpendError::Io(_)));
    }
}
