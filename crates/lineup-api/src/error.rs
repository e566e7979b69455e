//! Error types for the lookup API server.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.
//!
//! A lookup that finds nothing is not an error; it is a normal response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lineup_core::CatalogUnavailable;
use serde::Serialize;

/// One rejected request field, shaped like the lookup frontend expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Always `"field"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// The value as received, after trimming.
    pub value: String,
    /// Human-readable reason.
    pub msg: String,
    /// Name of the offending field.
    pub path: String,
    /// Where the field was read from (`"body"`).
    pub location: &'static str,
}

impl FieldError {
    /// A body field that failed validation.
    pub fn body(path: impl Into<String>, value: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind: "field",
            value: value.into(),
            msg: msg.into(),
            path: path.into(),
            location: "body",
        }
    }
}

/// Errors that can occur in the lookup API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// One or more request fields failed validation.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// The request body could not be read as JSON.
    #[error("malformed request: {0}")]
    BadRequest(String),

    /// No catalog snapshot has been loaded yet.
    #[error(transparent)]
    CatalogUnavailable(#[from] CatalogUnavailable),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation(errors) => serde_json::json!({
                "errors": errors,
                "status": status.as_u16(),
            }),
            other => serde_json::json!({
                "error": other.to_string(),
                "status": status.as_u16(),
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}
