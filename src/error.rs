//! Typed error taxonomy for the knowledge engine.
//!
//! Validation failures name the offending field and surface before anything
//! is persisted. Backend unavailability is distinguished from missing data so
//! the read path can degrade instead of failing outright.

use thiserror::Error;

/// Errors raised by the core knowledge modules.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// A node field failed its minimum constraint. Rejected before persistence.
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: &'static str, message: String },

    /// A node id referenced by a caller does not exist.
    #[error("node not found: {0}")]
    NotFound(String),

    /// The graph store or an external service is unreachable.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KnowledgeError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the `knowledge` modules.
pub type Result<T> = std::result::Result<T, KnowledgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_field() {
        let err = KnowledgeError::validation("context", "must be at least 10 characters");
        assert!(err.to_string().contains("context"));
        assert!(err.to_string().contains("10 characters"));
    }

    #[test]
    fn not_found_carries_id() {
        let err = KnowledgeError::NotFound("D-deadbeef".into());
        assert_eq!(err.to_string(), "node not found: D-deadbeef");
    }
}
