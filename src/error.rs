//! Error types for the timetabler schedule generation system.

use crate::agenda::Token;
use crate::agenda::validation::Violation;
use crate::types::CourseId;
use thiserror::Error;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Agenda not found: {0}")]
    AgendaNotFound(Token),

    #[error("Failed to encode {what}: {message}")]
    Encode { what: &'static str, message: String },

    #[error("Failed to decode {what}: {message}")]
    Decode { what: &'static str, message: String },

    #[error("Unsupported {what} record version: {version}")]
    UnsupportedVersion { what: &'static str, version: u32 },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Top-level errors surfaced by the orchestrator, dispatcher and CLI
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Agenda not found: {0}")]
    AgendaNotFound(Token),

    #[error("Agenda is invalid: {}", format_violations(.0))]
    Validation(Vec<Violation>),

    #[error("Mandatory courses overlap a leave: {0:?}")]
    MandatoryBlocked(Vec<CourseId>),

    #[error("Caller unauthorized: {0}")]
    Unauthorized(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// Whether a dispatcher may retry the failed unit.
    ///
    /// Only storage failures are transient; everything else fails the same
    /// way on identical input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::StorageError(StorageError::IoError(_)))
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl Clone for ApiError {
    fn clone(&self) -> Self {
        match self {
            ApiError::AgendaNotFound(token) => ApiError::AgendaNotFound(token.clone()),
            ApiError::Validation(violations) => ApiError::Validation(violations.clone()),
            ApiError::MandatoryBlocked(ids) => ApiError::MandatoryBlocked(ids.clone()),
            ApiError::Unauthorized(msg) => ApiError::Unauthorized(msg.clone()),
            ApiError::Catalog(msg) => ApiError::Catalog(msg.clone()),
            ApiError::Dispatch(msg) => ApiError::Dispatch(msg.clone()),
            ApiError::ConfigError(msg) => ApiError::ConfigError(msg.clone()),
            // io::Error is not Clone; keep kind and message
            ApiError::StorageError(StorageError::IoError(e)) => ApiError::StorageError(
                StorageError::IoError(std::io::Error::new(e.kind(), e.to_string())),
            ),
            ApiError::StorageError(other) => ApiError::StorageError(clone_storage(other)),
        }
    }
}

fn clone_storage(err: &StorageError) -> StorageError {
    match err {
        StorageError::AgendaNotFound(token) => StorageError::AgendaNotFound(token.clone()),
        StorageError::Encode { what, message } => StorageError::Encode {
            what,
            message: message.clone(),
        },
        StorageError::Decode { what, message } => StorageError::Decode {
            what,
            message: message.clone(),
        },
        StorageError::UnsupportedVersion { what, version } => StorageError::UnsupportedVersion {
            what,
            version: *version,
        },
        StorageError::IoError(e) => StorageError::IoError(std::io::Error::new(e.kind(), e.to_string())),
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
