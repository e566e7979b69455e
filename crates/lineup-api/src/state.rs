//! Shared application state for the lookup API server.
//!
//! [`AppState`] holds a read handle on the catalog snapshot cell. Handlers
//! capture the current snapshot once per request, so a refresh that
//! completes mid-request never mixes two generations.

use lineup_core::config::LineupConfig;
use lineup_core::{ResolutionEngine, SnapshotReader};

/// Venue name used when none is configured.
pub const DEFAULT_VENUE: &str = "Berghain";

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read side of the snapshot cell owned by the refresh controller.
    pub reader: SnapshotReader,
    /// Exact-then-fuzzy resolver.
    pub engine: ResolutionEngine,
    /// Venue named in response messages.
    pub venue_name: String,
}

impl AppState {
    /// State with the default engine and venue.
    pub fn new(reader: SnapshotReader) -> Self {
        Self {
            reader,
            engine: ResolutionEngine::default(),
            venue_name: String::from(DEFAULT_VENUE),
        }
    }

    /// State configured from the service configuration.
    pub fn from_config(reader: SnapshotReader, config: &LineupConfig) -> Self {
        Self {
            reader,
            engine: ResolutionEngine::new(config.matching.fuzzy_cutoff),
            venue_name: config.catalog.venue_name.clone(),
        }
    }
}
