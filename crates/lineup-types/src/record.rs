//! Catalog record types.
//!
//! [`FeedRow`] is the raw, all-string shape delivered by the feed
//! collaborator. [`OccurrenceRecord`] is the cleaned, immutable record the
//! catalog is built from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The token that marks a closing set in the feed's `closing` column.
pub const CLOSING_TOKEN: &str = "TRUE";

// ---------------------------------------------------------------------------
// Raw feed rows
// ---------------------------------------------------------------------------

/// One raw row of the lineup feed.
///
/// Every column is kept as the literal string found in the source. Cleaning
/// and coercion happen when the row is turned into an [`OccurrenceRecord`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRow {
    /// Calendar date of the appearance, as written in the source.
    pub date: String,
    /// Display name of the entity (untrimmed).
    pub name: String,
    /// Auxiliary label (untrimmed).
    pub label: String,
    /// Venue-local time slot.
    pub time: String,
    /// Stage or floor.
    pub floor: String,
    /// `"TRUE"` for a closing set, anything else otherwise.
    pub closing: String,
    /// Year as a numeric-looking string.
    pub year: String,
}

// ---------------------------------------------------------------------------
// Occurrence records
// ---------------------------------------------------------------------------

/// One historical appearance of a named entity.
///
/// Records are created in bulk when a snapshot is built and never mutated
/// afterwards. The serialized form uses camelCase keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceRecord {
    /// Calendar date string exactly as delivered by the feed.
    pub date: String,
    /// Trimmed display name.
    pub name: String,
    /// Trimmed auxiliary label.
    pub label: String,
    /// Venue-local time slot.
    pub time: String,
    /// Stage or floor the appearance happened on.
    pub location: String,
    /// Whether this appearance closed the night.
    pub is_closing_set: bool,
    /// Year parsed from the feed, `None` when the source value was not an
    /// integer.
    pub year: Option<i32>,
    /// Parsed form of [`date`](Self::date), used only for ordering.
    ///
    /// `None` when the date string could not be parsed.
    #[serde(skip)]
    #[ts(skip)]
    pub date_key: Option<NaiveDate>,
}

impl OccurrenceRecord {
    /// The case-folded name used as the aggregation key.
    ///
    /// Display variants that differ only in case or surrounding whitespace
    /// share one key.
    pub fn name_key(&self) -> String {
        self.name.trim().to_lowercase()
    }
}
