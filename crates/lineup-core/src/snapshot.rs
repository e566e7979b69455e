//! Immutable catalog snapshots and the single-writer cell that publishes them.
//!
//! A [`Snapshot`] pairs the record sequence of one feed generation with the
//! [`SimilarityIndex`] built from exactly those records. Snapshots are
//! shared as `Arc<Snapshot>` and never mutated.
//!
//! The "current snapshot" reference lives in a [`tokio::sync::watch`]
//! channel. [`SnapshotPublisher`] is the only writer and replaces the value
//! wholesale; any number of [`SnapshotReader`]s clone the `Arc` once per
//! request and keep using that generation even if a newer one is published
//! mid-request.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lineup_types::{FeedRow, OccurrenceRecord};
use serde::Serialize;
use tokio::sync::watch;

use crate::similarity::{SimilarityIndex, SimilarityOptions};
use crate::store;

/// No snapshot has ever been built successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("catalog unavailable: no snapshot has been loaded yet")]
pub struct CatalogUnavailable;

/// One fully built catalog generation.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    loaded_at: DateTime<Utc>,
    records: Vec<OccurrenceRecord>,
    name_keys: Vec<String>,
    index: SimilarityIndex,
}

impl Snapshot {
    /// Build a snapshot from raw feed rows.
    pub fn build(generation: u64, rows: Vec<FeedRow>, options: SimilarityOptions) -> Self {
        Self::from_records(generation, store::build(rows), options)
    }

    /// Build a snapshot from already cleaned records.
    pub fn from_records(
        generation: u64,
        records: Vec<OccurrenceRecord>,
        options: SimilarityOptions,
    ) -> Self {
        let index = SimilarityIndex::build(&records, options);
        let name_keys = records.iter().map(OccurrenceRecord::name_key).collect();
        Self {
            generation,
            loaded_at: Utc::now(),
            records,
            name_keys,
            index,
        }
    }

    /// Monotonic generation number, starting at 1 for the first load.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// When this snapshot was built.
    pub const fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// All records in feed order.
    pub fn records(&self) -> &[OccurrenceRecord] {
        &self.records
    }

    /// The similarity index over this snapshot's names.
    pub const fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    /// Records whose case-folded name equals `name_key`, in feed order.
    ///
    /// `name_key` must already be trimmed and lowercased.
    pub fn matching(&self, name_key: &str) -> Vec<&OccurrenceRecord> {
        self.records
            .iter()
            .zip(&self.name_keys)
            .filter(|(_, key)| key.as_str() == name_key)
            .map(|(record, _)| record)
            .collect()
    }

    /// Fuzzy search resolved to records, best score first.
    pub fn search(&self, query: &str) -> Vec<(&OccurrenceRecord, f64)> {
        self.index
            .search(query)
            .into_iter()
            .filter_map(|hit| self.records.get(hit.position).map(|r| (r, hit.score)))
            .collect()
    }

    /// Number of distinct case-folded names.
    pub fn distinct_names(&self) -> usize {
        self.name_keys.iter().collect::<BTreeSet<_>>().len()
    }

    /// Summary used by status endpoints and logs.
    pub fn status(&self) -> CatalogStatus {
        CatalogStatus {
            generation: self.generation,
            loaded_at: self.loaded_at(),
            record_count: self.records.len(),
            distinct_names: self.distinct_names(),
        }
    }
}

/// Lightweight description of the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStatus {
    /// Generation number of the snapshot.
    pub generation: u64,
    /// When the snapshot was built.
    pub loaded_at: DateTime<Utc>,
    /// Number of records, duplicates included.
    pub record_count: usize,
    /// Number of distinct case-folded names.
    pub distinct_names: usize,
}

/// Create an empty snapshot cell.
///
/// The reader reports [`CatalogUnavailable`] until the publisher stores
/// the first snapshot.
pub fn channel() -> (SnapshotPublisher, SnapshotReader) {
    let (tx, rx) = watch::channel(None);
    (SnapshotPublisher { tx }, SnapshotReader { rx })
}

/// Write side of the snapshot cell. Not cloneable: there is one writer.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Option<Arc<Snapshot>>>,
}

impl SnapshotPublisher {
    /// Replace the current snapshot and return the previous one.
    pub fn publish(&self, snapshot: Arc<Snapshot>) -> Option<Arc<Snapshot>> {
        self.tx.send_replace(Some(snapshot))
    }

    /// The snapshot currently visible to readers.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.tx.borrow().clone()
    }

    /// A new reader handle.
    pub fn subscribe(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of the snapshot cell.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Option<Arc<Snapshot>>>,
}

impl SnapshotReader {
    /// The current snapshot, if one has been published.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.rx.borrow().clone()
    }

    /// The current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogUnavailable`] if nothing has been published yet.
    pub fn require(&self) -> Result<Arc<Snapshot>, CatalogUnavailable> {
        self.current().ok_or(CatalogUnavailable)
    }

    /// Wait until a snapshot newer than the last one seen by this handle is
    /// published, and return it.
    ///
    /// Returns `None` once the publisher has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Snapshot>> {
        self.rx.changed().await.ok()?;
        self.rx.borrow_and_update().clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(name: &str) -> OccurrenceRecord {
        OccurrenceRecord {
            date: String::from("2024-01-01"),
            name: name.to_owned(),
            label: String::new(),
            time: String::new(),
            location: String::new(),
            is_closing_set: false,
            year: Some(2024),
            date_key: None,
        }
    }

    fn snapshot(generation: u64, names: &[&str]) -> Arc<Snapshot> {
        let records = names.iter().map(|n| record(n)).collect();
        Arc::new(Snapshot::from_records(generation, records, SimilarityOptions::default()))
    }

    #[test]
    fn empty_cell_is_unavailable() {
        let (_publisher, reader) = channel();
        assert!(reader.current().is_none());
        assert_eq!(reader.require().unwrap_err(), CatalogUnavailable);
    }

    #[test]
    fn publish_replaces_whole_snapshot() {
        let (publisher, reader) = channel();
        assert!(publisher.publish(snapshot(1, &["Ben Klock"])).is_none());
        let previous = publisher.publish(snapshot(2, &["DVS1", "Len Faki"]));
        assert_eq!(previous.map(|s| s.generation()), Some(1));

        let current = reader.require().unwrap();
        assert_eq!(current.generation(), 2);
        assert_eq!(current.records().len(), 2);
        assert_eq!(current.index().len(), 2);
    }

    #[test]
    fn captured_snapshot_survives_publish() {
        let (publisher, reader) = channel();
        let _ = publisher.publish(snapshot(1, &["Ben Klock"]));
        let held = reader.require().unwrap();
        let _ = publisher.publish(snapshot(2, &["DVS1"]));

        assert_eq!(held.generation(), 1);
        assert_eq!(held.records().first().unwrap().name, "Ben Klock");
        assert_eq!(reader.require().unwrap().generation(), 2);
    }

    #[test]
    fn matching_uses_case_folded_keys() {
        let snap = snapshot(1, &["Ben Klock", "ben klock", "DVS1", "BEN KLOCK"]);
        let names: Vec<&str> = snap.matching("ben klock").iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ben Klock", "ben klock", "BEN KLOCK"]);
        assert!(snap.matching("Ben Klock").is_empty());
    }

    #[test]
    fn status_counts_distinct_names() {
        let snap = snapshot(3, &["Ben Klock", "ben klock", "DVS1"]);
        let status = snap.status();
        assert_eq!(status.generation, 3);
        assert_eq!(status.record_count, 3);
        assert_eq!(status.distinct_names, 2);
        assert_eq!(status.loaded_at, snap.loaded_at());
    }

    #[test]
    fn loaded_at_is_set_at_build_time() {
        let before = Utc::now();
        let snap = snapshot(1, &["DVS1"]);
        assert!(snap.loaded_at() >= before);
        assert!(snap.loaded_at() <= Utc::now());
    }

    #[test]
    fn search_maps_hits_to_records() {
        let snap = snapshot(1, &["Marcel Dettmann", "Ben Klock"]);
        let hits = snap.search("ben klok");
        let (best, score) = hits.first().copied().unwrap();
        assert_eq!(best.name, "Ben Klock");
        assert!(score < 0.4);
    }

    #[tokio::test]
    async fn reader_observes_changes() {
        let (publisher, mut reader) = channel();
        let waiter = tokio::spawn(async move { reader.changed().await.map(|s| s.generation()) });
        let _ = publisher.publish(snapshot(7, &["DVS1"]));
        assert_eq!(waiter.await.unwrap(), Some(7));
    }
}
