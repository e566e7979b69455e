//! Resolution results returned by the lookup engine.
//!
//! A lookup always produces exactly one [`ResolutionResult`]. A missing
//! entity is a normal [`ResolutionResult::NoMatch`], not an error.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::record::OccurrenceRecord;

/// Where and when the most recent occurrence of an entity happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct MostRecent {
    /// Calendar date string of the occurrence.
    pub date: String,
    /// Venue-local time slot.
    pub time: String,
    /// Stage or floor.
    pub location: String,
}

impl From<&OccurrenceRecord> for MostRecent {
    fn from(record: &OccurrenceRecord) -> Self {
        Self {
            date: record.date.clone(),
            time: record.time.clone(),
            location: record.location.clone(),
        }
    }
}

/// The query matched an entity name exactly (after trim and case-fold).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct ExactMatch {
    /// Display name of the entity, taken from its most recent occurrence.
    pub entity_name: String,
    /// Number of occurrences aggregated under the entity.
    pub performance_count: usize,
    /// The first occurrence after sorting newest first.
    pub most_recent: MostRecent,
    /// Every occurrence of the entity, newest first.
    pub all_occurrences: Vec<OccurrenceRecord>,
}

/// The query did not match exactly but the similarity index found a close
/// enough entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct FuzzyMatch {
    /// The trimmed query as the caller wrote it.
    pub queried_name: String,
    /// Display name of the best similarity hit.
    pub suggested_name: String,
    /// Number of occurrences aggregated under the suggested entity.
    pub performance_count: usize,
    /// The first occurrence after sorting newest first.
    pub most_recent: MostRecent,
    /// Every occurrence of the suggested entity, newest first.
    pub all_occurrences: Vec<OccurrenceRecord>,
}

/// Neither an exact nor a close enough fuzzy match exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct NoMatch {
    /// The trimmed query as the caller wrote it.
    pub queried_name: String,
}

/// Outcome of resolving one query against a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionResult {
    /// Exact identity match.
    ExactMatch(ExactMatch),
    /// Approximate match below the fuzzy cutoff.
    FuzzyMatch(FuzzyMatch),
    /// Nothing matched.
    NoMatch(NoMatch),
}

impl ResolutionResult {
    /// Number of aggregated occurrences (0 for [`Self::NoMatch`]).
    pub const fn performance_count(&self) -> usize {
        match self {
            Self::ExactMatch(m) => m.performance_count,
            Self::FuzzyMatch(m) => m.performance_count,
            Self::NoMatch(_) => 0,
        }
    }

    /// The aggregated occurrences, newest first (empty for [`Self::NoMatch`]).
    pub fn all_occurrences(&self) -> &[OccurrenceRecord] {
        match self {
            Self::ExactMatch(m) => &m.all_occurrences,
            Self::FuzzyMatch(m) => &m.all_occurrences,
            Self::NoMatch(_) => &[],
        }
    }

    /// The most recent occurrence, if any entity was resolved.
    pub const fn most_recent(&self) -> Option<&MostRecent> {
        match self {
            Self::ExactMatch(m) => Some(&m.most_recent),
            Self::FuzzyMatch(m) => Some(&m.most_recent),
            Self::NoMatch(_) => None,
        }
    }

    /// Display name of the resolved entity, if any.
    pub fn resolved_name(&self) -> Option<&str> {
        match self {
            Self::ExactMatch(m) => Some(&m.entity_name),
            Self::FuzzyMatch(m) => Some(&m.suggested_name),
            Self::NoMatch(_) => None,
        }
    }

    /// Short label of the variant, used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ExactMatch(_) => "exact_match",
            Self::FuzzyMatch(_) => "fuzzy_match",
            Self::NoMatch(_) => "no_match",
        }
    }
}
