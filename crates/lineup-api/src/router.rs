//! Axum router construction for the lookup API.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled for the browser frontend.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the lookup server.
///
/// The router includes:
/// - `POST /check-dj` -- resolve a name against the catalog
/// - `GET /api/catalog` -- status of the snapshot being served
///
/// CORS allows any origin; the frontend is served from elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/check-dj", post(handlers::check_dj))
        .route("/api/catalog", get(handlers::catalog_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
