//! Consistent response envelope for all JSON endpoints.
//!
//! Every JSON response is wrapped in either [`ApiResponse`] (success) or
//! [`ApiErrorResponse`] (error), ensuring a uniform shape. Chart, report and
//! export endpoints return their documents directly on success but still use
//! the error envelope on failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::PipelineError;

/// Metadata included in every JSON response.
#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
    pub version: &'static str,
}

impl Default for ResponseMeta {
    fn default() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            version: "1",
        }
    }
}

/// Successful response: `{ "data": T, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn created(data: T) -> Response {
        Self::with_status(StatusCode::CREATED, data)
    }

    fn with_status(status: StatusCode, data: T) -> Response {
        let body = Self {
            data,
            meta: ResponseMeta::default(),
        };
        (status, axum::Json(body)).into_response()
    }
}

/// Error detail inside [`ApiErrorResponse`].
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response: `{ "error": { "code": "...", "message": "..." }, "meta": { ... } }`
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn build(
        status: StatusCode,
        code: &str,
        msg: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Response {
        let body = Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: msg.into(),
                details,
            },
            meta: ResponseMeta::default(),
        };
        (status, axum::Json(body)).into_response()
    }

    pub fn not_found(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::NOT_FOUND, "NOT_FOUND", msg, None)
    }

    pub fn bad_request(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None)
    }

    pub fn conflict(code: &str, msg: impl Into<String>, details: Option<serde_json::Value>) -> Response {
        Self::build(StatusCode::CONFLICT, code, msg, details)
    }

    pub fn unprocessable(code: &str, msg: impl Into<String>, details: Option<serde_json::Value>) -> Response {
        Self::build(StatusCode::UNPROCESSABLE_ENTITY, code, msg, details)
    }

    pub fn internal(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None)
    }

    /// Map a pipeline failure onto its HTTP status.
    pub fn from_pipeline(err: &PipelineError) -> Response {
        let message = err.to_string();
        match err {
            PipelineError::IncompleteSelection { name, available } => Self::conflict(
                "INCOMPLETE_SELECTION",
                message,
                Some(serde_json::json!({ "source": name, "available": available })),
            ),
            PipelineError::UnknownSheet {
                name,
                sheet,
                available,
            } => Self::build(
                StatusCode::BAD_REQUEST,
                "UNKNOWN_SHEET",
                message,
                Some(serde_json::json!({ "source": name, "sheet": sheet, "available": available })),
            ),
            PipelineError::EmptyDataset { skipped } => Self::unprocessable(
                "EMPTY_DATASET",
                message,
                Some(serde_json::json!({ "skipped": skipped })),
            ),
        }
    }
}
