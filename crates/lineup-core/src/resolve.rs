//! The resolution engine: exact match first, fuzzy fallback second.
//!
//! [`ResolutionEngine::resolve`] turns a raw query into exactly one
//! [`ResolutionResult`]:
//!
//! 1. Normalize the query (trim, lowercase).
//! 2. Exact pass: every record whose case-folded name equals the query.
//! 3. Fuzzy pass, only when the exact pass is empty: the best similarity
//!    hit is accepted when its score is strictly below the fuzzy cutoff.
//!    The hit only decides *which* entity; its occurrences are then
//!    collected by exact key, as in step 2.
//! 4. Otherwise, no match.
//!
//! Occurrences are ordered newest first. Records whose date cannot be
//! parsed sort after all dated records; the sort is stable, so records
//! with equal dates keep feed order.

use std::cmp::Ordering;

use lineup_types::{
    ExactMatch, FuzzyMatch, MostRecent, NoMatch, OccurrenceRecord, ResolutionResult,
};
use tracing::debug;

use crate::snapshot::{CatalogUnavailable, Snapshot, SnapshotReader};

/// Reference fuzzy cutoff: a hit must score strictly below this.
pub const DEFAULT_FUZZY_CUTOFF: f64 = 0.4;

/// Stateless query resolver.
///
/// The engine never touches the shared snapshot cell itself; callers pass
/// the snapshot they captured, or use [`resolve_current`](Self::resolve_current)
/// which captures it once up front.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionEngine {
    fuzzy_cutoff: f64,
}

impl Default for ResolutionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_FUZZY_CUTOFF)
    }
}

impl ResolutionEngine {
    /// Create an engine with the given fuzzy cutoff.
    pub const fn new(fuzzy_cutoff: f64) -> Self {
        Self { fuzzy_cutoff }
    }

    /// The configured fuzzy cutoff.
    pub const fn fuzzy_cutoff(&self) -> f64 {
        self.fuzzy_cutoff
    }

    /// Whether a similarity score is good enough to suggest.
    pub fn accepts(&self, score: f64) -> bool {
        score < self.fuzzy_cutoff()
    }

    /// Resolve against whatever snapshot is current right now.
    ///
    /// The snapshot is captured once; a refresh completing mid-call does not
    /// affect the result.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogUnavailable`] if no snapshot was ever published.
    pub fn resolve_current(
        &self,
        reader: &SnapshotReader,
        raw_query: &str,
    ) -> Result<ResolutionResult, CatalogUnavailable> {
        let snapshot = reader.require()?;
        Ok(self.resolve(&snapshot, raw_query))
    }

    /// Resolve `raw_query` against `snapshot`.
    pub fn resolve(&self, snapshot: &Snapshot, raw_query: &str) -> ResolutionResult {
        let queried_name = raw_query.trim();
        let key = normalize(raw_query);

        let exact = collect_newest_first(snapshot, &key);
        if let Some(first) = exact.first() {
            let result = ResolutionResult::ExactMatch(ExactMatch {
                entity_name: first.name.clone(),
                performance_count: exact.len(),
                most_recent: MostRecent::from(first),
                all_occurrences: exact,
            });
            debug!(
                query = queried_name,
                generation = snapshot.generation(),
                count = result.performance_count(),
                "exact match"
            );
            return result;
        }

        let best = snapshot.search(&key).into_iter().next();
        let Some((suggestion, score)) = best else {
            debug!(query = queried_name, "no fuzzy candidate");
            return no_match(queried_name);
        };

        if !self.accepts(score) {
            debug!(
                query = queried_name,
                candidate = suggestion.name.as_str(),
                score,
                cutoff = self.fuzzy_cutoff(),
                "best fuzzy candidate above cutoff"
            );
            return no_match(queried_name);
        }

        let occurrences = collect_newest_first(snapshot, &suggestion.name_key());
        let Some(first) = occurrences.first() else {
            return no_match(queried_name);
        };
        let most_recent = MostRecent::from(first);

        debug!(
            query = queried_name,
            suggestion = suggestion.name.as_str(),
            score,
            count = occurrences.len(),
            generation = snapshot.generation(),
            "fuzzy match"
        );

        ResolutionResult::FuzzyMatch(FuzzyMatch {
            queried_name: queried_name.to_owned(),
            suggested_name: suggestion.name.clone(),
            performance_count: occurrences.len(),
            most_recent,
            all_occurrences: occurrences,
        })
    }
}

/// Trim and case-fold a query.
pub fn normalize(raw_query: &str) -> String {
    raw_query.trim().to_lowercase()
}

/// Newest-first ordering; undated records go last.
pub fn newest_first(a: &OccurrenceRecord, b: &OccurrenceRecord) -> Ordering {
    match (a.date_key, b.date_key) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn collect_newest_first(snapshot: &Snapshot, key: &str) -> Vec<OccurrenceRecord> {
    let mut records: Vec<OccurrenceRecord> =
        snapshot.matching(key).into_iter().cloned().collect();
    // `sort_by` is stable.
    records.sort_by(newest_first);
    records
}

fn no_match(queried_name: &str) -> ResolutionResult {
    ResolutionResult::NoMatch(NoMatch {
        queried_name: queried_name.to_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::similarity::SimilarityOptions;
    use crate::store::parse_date;

    fn record(name: &str, date: &str) -> OccurrenceRecord {
        OccurrenceRecord {
            date: date.to_owned(),
            name: name.to_owned(),
            label: String::new(),
            time: String::from("23:59"),
            location: String::from("Berghain"),
            is_closing_set: false,
            year: None,
            date_key: parse_date(date),
        }
    }

    fn snapshot(records: Vec<OccurrenceRecord>) -> Snapshot {
        Snapshot::from_records(1, records, SimilarityOptions::default())
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Ben KLOCK \t"), "ben klock");
    }

    #[test]
    fn default_cutoff() {
        let default = ResolutionEngine::default().fuzzy_cutoff();
        assert!((default - DEFAULT_FUZZY_CUTOFF).abs() < f64::EPSILON);
        let custom = ResolutionEngine::new(0.25).fuzzy_cutoff();
        assert!((custom - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_is_strict() {
        let engine = ResolutionEngine::default();
        assert!(!engine.accepts(0.4));
        assert!(engine.accepts(0.39999));
        assert!(!engine.accepts(0.9));
    }

    #[test]
    fn newest_first_puts_undated_last() {
        let dated = record("a", "2020-01-01");
        let newer = record("a", "2021-01-01");
        let undated = record("a", "someday");
        assert_eq!(newest_first(&newer, &dated), Ordering::Less);
        assert_eq!(newest_first(&dated, &undated), Ordering::Less);
        assert_eq!(newest_first(&undated, &dated), Ordering::Greater);
        assert_eq!(newest_first(&undated, &undated), Ordering::Equal);
    }

    #[test]
    fn exact_match_uses_latest_display_name() {
        let snap = snapshot(vec![
            record("BEN KLOCK", "2019-03-02"),
            record("Ben Klock", "2024-01-10"),
        ]);
        let result = ResolutionEngine::default().resolve(&snap, "ben klock");
        let ResolutionResult::ExactMatch(m) = result else {
            panic!("expected exact match");
        };
        assert_eq!(m.entity_name, "Ben Klock");
        assert_eq!(m.performance_count, 2);
    }

    #[test]
    fn undated_occurrences_sort_after_dated_ones() {
        let snap = snapshot(vec![
            record("DVS1", "tbd"),
            record("DVS1", "2018-07-07"),
            record("DVS1", "2022-12-31"),
        ]);
        let result = ResolutionEngine::default().resolve(&snap, "DVS1");
        let dates: Vec<&str> = result.all_occurrences().iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2022-12-31", "2018-07-07", "tbd"]);
        assert_eq!(
            result.all_occurrences().first().unwrap().date_key,
            NaiveDate::from_ymd_opt(2022, 12, 31)
        );
    }

    #[test]
    fn fuzzy_match_reports_query_and_suggestion() {
        let snap = snapshot(vec![
            record("Marcel Dettmann", "2020-01-01"),
            record("Ben Klock", "2023-05-01"),
            record("ben klock", "2024-01-10"),
        ]);
        let result = ResolutionEngine::default().resolve(&snap, "  Ben Klok ");
        let ResolutionResult::FuzzyMatch(m) = result else {
            panic!("expected fuzzy match");
        };
        assert_eq!(m.queried_name, "Ben Klok");
        assert_eq!(m.suggested_name, "Ben Klock");
        assert_eq!(m.performance_count, 2);
        assert_eq!(m.most_recent.date, "2024-01-10");
    }

    #[test]
    fn empty_catalog_is_no_match() {
        let snap = snapshot(Vec::new());
        let result = ResolutionEngine::default().resolve(&snap, "Anyone");
        assert_eq!(
            result,
            ResolutionResult::NoMatch(NoMatch {
                queried_name: String::from("Anyone")
            })
        );
    }

    #[test]
    fn resolve_current_requires_a_snapshot() {
        let (_publisher, reader) = crate::snapshot::channel();
        let result = ResolutionEngine::default().resolve_current(&reader, "DVS1");
        assert_eq!(result.unwrap_err(), CatalogUnavailable);
    }
}
