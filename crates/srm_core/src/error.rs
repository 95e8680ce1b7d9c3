//! Error types for queue, registry and schema operations.
//!
//! Three kinds of failure surface at the boundary where they occur:
//! - `ValidationErrors`: malformed or out-of-range values, collected per field
//! - `QueueError::NotFound`: the operation named a uuid the queue never held
//! - `QueueError::State`: the change would break a record's state machine
//!
//! None of them are fatal; a failed mutation leaves prior state unchanged.

use std::fmt;

use thiserror::Error;

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted field path (`inputFiles[2].iterations`).
    pub path: String,
    /// Human-readable reason.
    pub reason: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Prefix the field path with a parent path.
    pub fn nested(self, parent: &str) -> Self {
        let path = if self.path.is_empty() {
            parent.to_string()
        } else {
            format!("{}.{}", parent, self.path)
        };
        Self {
            path,
            reason: self.reason,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Every validation problem found in one pass over an input.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", summarize(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection holding one error.
    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(path, reason)],
        }
    }

    /// Record a problem with a field.
    pub fn push(&mut self, path: impl Into<String>, reason: impl Into<String>) {
        self.errors.push(FieldError::new(path, reason));
    }

    /// Merge errors from a nested value under `parent`.
    pub fn extend_nested(&mut self, parent: &str, other: ValidationErrors) {
        self.errors
            .extend(other.errors.into_iter().map(|e| e.nested(parent)));
    }

    /// Merge errors without touching their paths.
    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// All collected errors, in the order they were found.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether any error is reported for exactly this path.
    pub fn has_field(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }

    /// `Ok(value)` when nothing was collected, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
    if details.is_empty() {
        "0 validation error(s)".to_string()
    } else {
        format!("{} validation error(s): {}", errors.len(), details.join("; "))
    }
}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Failure of a queue or registry mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// One or more input values were rejected.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// No record with this uuid exists or ever existed in the queue.
    #[error("No file record with uuid '{uuid}'")]
    NotFound { uuid: String },

    /// The record's current state does not allow the change.
    #[error("File record '{uuid}' rejected the change: {reason}")]
    State { uuid: String, reason: String },
}

impl QueueError {
    /// Create a not-found error.
    pub fn not_found(uuid: impl Into<String>) -> Self {
        Self::NotFound { uuid: uuid.into() }
    }

    /// Create a state error.
    pub fn state(uuid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::State {
            uuid: uuid.into(),
            reason: reason.into(),
        }
    }

    /// The uuid the failure is tied to, if any.
    pub fn uuid(&self) -> Option<&str> {
        match self {
            Self::Validation(_) => None,
            Self::NotFound { uuid } | Self::State { uuid, .. } => Some(uuid),
        }
    }
}

/// Result type for queue and registry operations.
pub type QueueResult<T> = Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_list_every_field() {
        let mut errors = ValidationErrors::new();
        errors.push("uuid", "expected a string");
        errors.push("iterations", "expected a non-negative integer");

        let msg = errors.to_string();
        assert!(msg.starts_with("2 validation error(s)"));
        assert!(msg.contains("uuid: expected a string"));
        assert!(msg.contains("iterations: expected a non-negative integer"));
        assert_eq!(
            msg,
            "2 validation error(s): uuid: expected a string; iterations: expected a non-negative integer"
        );
    }

    #[test]
    fn validation_errors_are_std_errors() {
        let err: Box<dyn std::error::Error> = Box::new(ValidationErrors::single("uuid", "empty"));
        assert_eq!(err.to_string(), "1 validation error(s): uuid: empty");
        assert_eq!(ValidationErrors::new().to_string(), "0 validation error(s)");
    }

    #[test]
    fn nested_errors_are_prefixed() {
        let mut inner = ValidationErrors::new();
        inner.push("iterations", "bad");
        inner.push("", "not an object");

        let mut outer = ValidationErrors::new();
        outer.extend_nested("inputFiles[2]", inner);

        assert!(outer.has_field("inputFiles[2].iterations"));
        assert!(outer.has_field("inputFiles[2]"));
    }

    #[test]
    fn queue_error_carries_uuid() {
        let err = QueueError::state("abc", "record is terminal");
        assert_eq!(err.uuid(), Some("abc"));
        assert!(err.to_string().contains("record is terminal"));

        let err: QueueError = ValidationErrors::single("path", "empty").into();
        assert_eq!(err.uuid(), None);
    }
}
