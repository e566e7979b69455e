//! REST API endpoint handlers for the lookup server.
//!
//! Handlers read the catalog through the shared [`AppState`]. Each request
//! captures one snapshot and uses it throughout.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/check-dj` | Look up a name (exact, then fuzzy) |
//! | `GET` | `/api/catalog` | Current snapshot status |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use lineup_core::CatalogStatus;
use tracing::{debug, info};
use validator::Validate;

use crate::error::{ApiError, FieldError};
use crate::response::LookupResponse;
use crate::state::AppState;

/// Wire name of the query field.
pub const DJ_NAME_FIELD: &str = "djName";

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /check-dj`.
#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct CheckDjRequest {
    /// The name to look up, 1 to 100 characters after trimming. A missing
    /// field is treated as empty.
    #[serde(rename = "djName", default)]
    #[validate(length(min = 1, max = 100, message = "Invalid value"))]
    pub dj_name: String,
}

impl CheckDjRequest {
    /// Trim, validate and HTML-escape the query.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] if the trimmed name is empty or
    /// longer than 100 characters.
    pub fn sanitize(self) -> Result<String, ApiError> {
        let trimmed = Self {
            dj_name: self.dj_name.trim().to_owned(),
        };

        if let Err(errors) = trimmed.validate() {
            let fields = errors
                .field_errors()
                .into_values()
                .flat_map(|errs| errs.iter())
                .map(|e| {
                    FieldError::body(
                        DJ_NAME_FIELD,
                        trimmed.dj_name.clone(),
                        e.message.as_deref().unwrap_or("Invalid value"),
                    )
                })
                .collect();
            return Err(ApiError::Validation(fields));
        }

        Ok(escape_html(&trimmed.dj_name))
    }
}

/// Replace HTML-significant characters with entities.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// POST /check-dj
// ---------------------------------------------------------------------------

/// Resolve a name against the current catalog snapshot.
///
/// Always answers with exactly one of exact match, fuzzy match or no match.
/// Only a catalog that was never loaded surfaces as an error (503).
pub async fn check_dj(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckDjRequest>, JsonRejection>,
) -> Result<Json<LookupResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = request.sanitize()?;

    let snapshot = state.reader.require()?;
    let result = state.engine.resolve(&snapshot, &query);
    let response = LookupResponse::from_result(result, &state.venue_name);

    info!(
        query = %query,
        result = response.result,
        generation = snapshot.generation(),
        "lookup"
    );

    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// GET /api/catalog
// ---------------------------------------------------------------------------

/// Describe the snapshot currently being served.
pub async fn catalog_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CatalogStatus>, ApiError> {
    let snapshot = state.reader.require()?;
    let status = snapshot.status();
    debug!(generation = status.generation, "catalog status");
    Ok(Json(status))
}
