//! Error types for Folio operations.
//!
//! The taxonomy separates "your input was wrong" (validation) from "the
//! system is unavailable" (storage) so callers can react differently.
//! Not-found is never an error: lookup operations return `Ok(None)`.

use thiserror::Error;

use crate::identity::{TopicId, TopicVersionId};

/// Backing-store layer errors. Any of these raised inside a transaction
/// aborts the whole transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Insert failed for {entity}: {reason}")]
    InsertFailed { entity: &'static str, reason: String },

    #[error("Update failed for {entity} with id {id}: {reason}")]
    UpdateFailed {
        entity: &'static str,
        id: i32,
        reason: String,
    },

    #[error("Referential integrity violation: {reason}")]
    IntegrityViolation { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Backing store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Malformed row for {entity}: {reason}")]
    MalformedRow { entity: &'static str, reason: String },
}

/// Validation errors, surfaced before or during the transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: &'static str },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Invalid topic name '{name}': {reason}")]
    InvalidTopicName { name: String, reason: String },

    #[error("Unknown virtual wiki: {name}")]
    UnknownVirtualWiki { name: String },

    #[error("Move blocked: destination '{destination}' already exists")]
    MoveDestinationExists { destination: String },

    #[error("Move blocked: cannot move across virtual wikis (from '{from}' to '{to}')")]
    CrossWikiMove { from: String, to: String },

    #[error("Cannot purge version {topic_version_id}: it is the only version of topic {topic_id}")]
    PurgeSoleVersion {
        topic_id: TopicId,
        topic_version_id: TopicVersionId,
    },

    #[error("Cannot purge version {topic_version_id}: no such version")]
    PurgeUnknownVersion { topic_version_id: TopicVersionId },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: &'static str },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// Top-level error type for all Folio operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FolioError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for Folio operations.
pub type FolioResult<T> = Result<T, FolioError>;

impl FolioError {
    /// True when the failure is caller error rather than infrastructure.
    pub fn is_validation(&self) -> bool {
        matches!(self, FolioError::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_sole_version_display() {
        let err = ValidationError::PurgeSoleVersion {
            topic_id: 7,
            topic_version_id: 12,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("12"));
        assert!(msg.contains("only version"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn test_error_classification() {
        let validation: FolioError = ValidationError::RequiredFieldMissing { field: "page_name" }.into();
        let storage: FolioError = StorageError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into();
        assert!(validation.is_validation());
        assert!(!storage.is_validation());
    }
}
