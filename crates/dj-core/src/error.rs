//! # AppError
//!
//! Centralized error handling for Digital Journal.
//! Maps domain-specific failures to actionable error types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The primary error type for all dj-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Journal, Entry, Template)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// User input failed one or more field rules
    #[error("validation error: {0}")]
    Validation(FieldErrors),

    /// Credentials were rejected
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A domain rule forbids the operation (e.g., second entry on the same day)
    #[error("conflict: {0}")]
    Conflict(String),

    /// A call site wired a component incorrectly. Not recoverable by the user.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        AppError::NotFound(kind, id.to_string())
    }

    /// Shorthand for a single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        AppError::Validation(errors)
    }
}

/// A specialized Result type for Digital Journal logic.
pub type Result<T> = std::result::Result<T, AppError>;

/// Field-level validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(())` when nothing was collected, otherwise a validation error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}
