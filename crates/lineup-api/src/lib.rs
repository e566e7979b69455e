//! Lookup API server for the Lineup catalog.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`POST /check-dj`** -- validate and escape a name, resolve it against
//!   the current catalog snapshot, and answer with a human-readable
//!   message plus the matched occurrences
//! - **`GET /api/catalog`** -- generation, load time and size of the
//!   snapshot being served
//!
//! # Architecture
//!
//! Handlers hold a [`SnapshotReader`](lineup_core::SnapshotReader) and
//! never block on the refresh controller: each request clones the current
//! `Arc<Snapshot>` once and resolves against it.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::{ApiError, FieldError};
pub use response::LookupResponse;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
