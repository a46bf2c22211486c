//! API error envelope
//!
//! Every failure leaving the HTTP surface has the shape
//! `{ success: false, error: <kind>, message: <human> }`. Internal errors
//! are masked behind a correlation id; the detail only goes to the log.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use kargo_core::errors::{CoreError, ErrorKind};
use serde_json::json;
use std::fmt;
use tracing::error;
use uuid::Uuid;

pub type ApiResult<T> = Result<T, ApiError>;

/// One wire-visible error
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "error": self.kind.to_string(),
            "message": self.message,
        });

        if self.kind == ErrorKind::Internal {
            // Never leak internals; hand the caller a correlation id instead.
            let correlation_id = Uuid::new_v4().to_string();
            error!(%correlation_id, detail = %self.message, "internal error");
            body["message"] = json!("internal error");
            body["correlation_id"] = json!(correlation_id);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}
