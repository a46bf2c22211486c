//! Error types and error handling utilities
//!
//! The eight public error kinds defined here are the only failure
//! vocabulary the HTTP layer and the storage adapter share. Everything
//! backend-specific is mapped into one of these before it crosses a
//! crate boundary.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Core result type used throughout the application
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error types for Kargo
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum CoreError {
    /// Malformed or rejected input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing or invalid credentials
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Entity not found
    #[error("Not found: {entity} {id}")]
    NotFound { entity: String, id: String },

    /// Uniqueness or state conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Statement or operation deadline exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Backend temporarily unreachable
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Create an invalid-argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        CoreError::InvalidArgument(message.into())
    }

    /// Create an unauthenticated error
    pub fn unauthenticated<S: Into<String>>(message: S) -> Self {
        CoreError::Unauthenticated(message.into())
    }

    /// Create a forbidden error
    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        CoreError::Forbidden(message.into())
    }

    /// Create a not-found error
    pub fn not_found<S: Into<String>>(entity: S, id: S) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        CoreError::Conflict(message.into())
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        CoreError::Timeout(message.into())
    }

    /// Create an unavailable error
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        CoreError::Unavailable(message.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        CoreError::Internal(message.into())
    }

    /// Get the error kind for HTTP mapping and logging
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CoreError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::Timeout(_) => ErrorKind::Timeout,
            CoreError::Unavailable(_) => ErrorKind::Unavailable,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Timeout(_) | CoreError::Unavailable(_))
    }

    /// Check if the error should be logged at error level
    pub fn is_critical(&self) -> bool {
        matches!(self, CoreError::Internal(_) | CoreError::Unavailable(_))
    }
}

/// Error kinds, the wire-visible classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Timeout,
    Unavailable,
    Internal,
}

impl ErrorKind {
    /// HTTP status code for this kind
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::InvalidArgument => 400,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
            ErrorKind::Unavailable => 503,
            ErrorKind::Timeout => 504,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "invalid_argument"),
            ErrorKind::Unauthenticated => write!(f, "unauthenticated"),
            ErrorKind::Forbidden => write!(f, "forbidden"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Unavailable => write!(f, "unavailable"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Convert from validator::ValidationErrors
impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::InvalidArgument(err.to_string())
    }
}

/// Convert from serde_json::Error
impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(format!("serialization: {}", err))
    }
}

/// Convert from anyhow::Error for internal errors
impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}
