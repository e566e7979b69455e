//! Shared type definitions for the Lineup catalog lookup service.
//!
//! This crate is the single source of truth for the data model shared by
//! the core engine, the feed reader and the HTTP boundary. Types flow
//! downstream to `TypeScript` via `ts-rs` for the lookup frontend.
//!
//! # Modules
//!
//! - [`record`] -- Raw feed rows and cleaned occurrence records
//! - [`resolution`] -- Tagged lookup results (exact, fuzzy, none)

pub mod record;
pub mod resolution;

// Re-export all public types at crate root for convenience.
pub use record::{CLOSING_TOKEN, FeedRow, OccurrenceRecord};
pub use resolution::{ExactMatch, FuzzyMatch, MostRecent, NoMatch, ResolutionResult};
