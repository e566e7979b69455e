//! Catalog snapshot, similarity index, resolution engine, and refresh
//! controller for the Lineup service.
//!
//! This crate answers "has entity X appeared in the catalog, and if not
//! exactly, what is the closest match?" against an in-memory snapshot that
//! is rebuilt wholesale on a schedule.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `lineup-config.yaml` into
//!   strongly-typed structs.
//! - [`store`] -- Feed rows to occurrence records (pure transform).
//! - [`similarity`] -- Fuzzy name index with distance-like scores.
//! - [`snapshot`] -- Immutable snapshots and the single-writer cell that
//!   publishes them.
//! - [`resolve`] -- [`ResolutionEngine`]: exact match first, fuzzy fallback.
//! - [`refresh`] -- [`RefreshController`] and the [`FeedSource`] trait.
//!
//! [`ResolutionEngine`]: resolve::ResolutionEngine
//! [`RefreshController`]: refresh::RefreshController
//! [`FeedSource`]: refresh::FeedSource

pub mod config;
pub mod refresh;
pub mod resolve;
pub mod similarity;
pub mod snapshot;
pub mod store;

pub use refresh::{FeedSource, LoadFault, RefreshController, RefreshTask, StaticFeed};
pub use resolve::ResolutionEngine;
pub use similarity::{SimilarityIndex, SimilarityOptions};
pub use snapshot::{CatalogStatus, CatalogUnavailable, Snapshot, SnapshotReader};
