//! HTTP error type and its mapping to status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::error::LessonNoteError;
use crate::import::ImportIssue;

/// Request limits
pub mod limits {
    pub const MAX_TITLE_LENGTH: usize = 500;
    pub const MAX_CONTENT_SIZE: usize = 102_400; // 100KB
    pub const MAX_SEARCH_LIMIT: usize = 200;
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Lesson import is invalid")]
    InvalidImport(Vec<ImportIssue>),

    #[error("Title too long: {actual} characters (max {max})")]
    TitleTooLong { max: usize, actual: usize },

    #[error("Content too large: {actual} bytes (max {max})")]
    ContentTooLarge { max: usize, actual: usize },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_)
            | ApiError::InvalidImport(_)
            | ApiError::TitleTooLong { .. } => StatusCode::BAD_REQUEST,
            ApiError::ContentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::InvalidImport(_) => "InvalidImport",
            ApiError::TitleTooLong { .. } => "TitleTooLong",
            ApiError::ContentTooLarge { .. } => "ContentTooLarge",
            ApiError::Internal(_) => "Internal",
        }
    }
}

impl From<LessonNoteError> for ApiError {
    fn from(err: LessonNoteError) -> Self {
        match err {
            e if e.is_not_found() => ApiError::NotFound(e.to_string()),
            e @ (LessonNoteError::Validation(_)
            | LessonNoteError::InvalidKey(_)
            | LessonNoteError::AmbiguousId(_)) => ApiError::BadRequest(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = json!({
            "error": self.to_string(),
            "errorType": self.error_type(),
        });
        if let ApiError::InvalidImport(issues) = &self {
            body["issues"] = json!(issues);
        }

        (status, Json(body)).into_response()
    }
}

pub fn check_title(title: &str) -> Result<(), ApiError> {
    let actual = title.chars().count();
    if actual > limits::MAX_TITLE_LENGTH {
        return Err(ApiError::TitleTooLong {
            max: limits::MAX_TITLE_LENGTH,
            actual,
        });
    }
    Ok(())
}

pub fn check_content(content: &str) -> Result<(), ApiError> {
    if content.len() > limits::MAX_CONTENT_SIZE {
        return Err(ApiError::ContentTooLarge {
            max: limits::MAX_CONTENT_SIZE,
            actual: content.len(),
        });
    }
    Ok(())
}
