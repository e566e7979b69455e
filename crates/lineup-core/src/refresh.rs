//! Refresh controller: reloads the feed and swaps in a new snapshot.
//!
//! The controller is the only component that builds snapshots and the only
//! writer of the snapshot cell. A refresh either publishes a complete new
//! snapshot or leaves the previous one untouched; readers never see a
//! partially loaded catalog.
//!
//! # Scheduling
//!
//! [`RefreshController::spawn`] starts a background Tokio task that calls
//! [`RefreshController::refresh`] once per interval. Feed reads are
//! blocking I/O and run on the blocking pool. Failed refreshes are logged
//! and the loop keeps going.

use std::sync::{Arc, Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lineup_types::FeedRow;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::similarity::SimilarityOptions;
use crate::snapshot::{self, Snapshot, SnapshotPublisher, SnapshotReader};

/// The feed could not be turned into a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum LoadFault {
    /// The feed could not be read.
    #[error("feed {feed} unreadable: {source}")]
    Io {
        /// Human-readable feed identifier (usually a path).
        feed: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The feed was read but its content is not a valid lineup.
    #[error("feed {feed} malformed{}: {message}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    Malformed {
        /// Human-readable feed identifier.
        feed: String,
        /// 1-based line of the offending row, when known.
        line: Option<u64>,
        /// What was wrong.
        message: String,
    },

    /// The background load task was cancelled or panicked.
    #[error("feed load interrupted: {message}")]
    Interrupted {
        /// Description of the interruption.
        message: String,
    },
}

/// A source of raw lineup rows.
///
/// Implementations do blocking I/O; the controller calls them from the
/// blocking pool when refreshing in the background.
pub trait FeedSource: Send + Sync {
    /// Identifier used in logs and errors.
    fn describe(&self) -> String;

    /// Read every row of the feed.
    ///
    /// # Errors
    ///
    /// Returns [`LoadFault::Io`] when the feed is unreadable and
    /// [`LoadFault::Malformed`] when its content cannot be parsed.
    fn load(&self) -> Result<Vec<FeedRow>, LoadFault>;
}

/// A feed held in memory. Handy for tests and fixtures.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    rows: Vec<FeedRow>,
}

impl StaticFeed {
    /// Wrap a fixed set of rows.
    pub const fn new(rows: Vec<FeedRow>) -> Self {
        Self { rows }
    }
}

impl FeedSource for StaticFeed {
    fn describe(&self) -> String {
        String::from("static")
    }

    fn load(&self) -> Result<Vec<FeedRow>, LoadFault> {
        Ok(self.rows.clone())
    }
}

/// Counters reported by the background refresh task when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Refreshes attempted by the loop.
    pub attempts: u64,
    /// Refreshes that failed and kept the previous snapshot.
    pub failures: u64,
}

/// Owns snapshot construction and the current-snapshot reference.
pub struct RefreshController {
    feed: Arc<dyn FeedSource>,
    options: SimilarityOptions,
    publisher: SnapshotPublisher,
    generation: AtomicU64,
    /// Held for a whole refresh so overlapping callers publish in order.
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for RefreshController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshController")
            .field("feed", &self.feed.describe())
            .field("options", &self.options)
            .field("generation", &self.generation.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl RefreshController {
    /// Create a controller with an empty snapshot cell.
    pub fn new(feed: Arc<dyn FeedSource>, options: SimilarityOptions) -> Self {
        let (publisher, _) = snapshot::channel();
        Self {
            feed,
            options,
            publisher,
            generation: AtomicU64::new(0),
            refresh_lock: Mutex::new(()),
        }
    }

    /// A read handle on the current snapshot.
    pub fn reader(&self) -> SnapshotReader {
        self.publisher.subscribe()
    }

    /// The snapshot currently published, if any.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.publisher.current()
    }

    /// Generation of the last successfully published snapshot (0 = none).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Load the feed, build a snapshot and publish it.
    ///
    /// On failure the fault is logged, the previous snapshot stays current,
    /// and the fault is returned to the caller.
    ///
    /// Concurrent calls are serialized: each one reads the feed, takes the
    /// next generation and publishes before the next call starts.
    ///
    /// # Errors
    ///
    /// Returns the [`LoadFault`] raised by the feed.
    pub fn refresh(&self) -> Result<Arc<Snapshot>, LoadFault> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();
        let rows = match self.feed.load() {
            Ok(rows) => rows,
            Err(fault) => {
                self.report_failure(&fault);
                return Err(fault);
            }
        };

        let generation = self.generation.load(Ordering::Acquire).saturating_add(1);
        let snapshot = Arc::new(Snapshot::build(generation, rows, self.options));
        let _previous = self.publisher.publish(Arc::clone(&snapshot));
        self.generation.store(generation, Ordering::Release);

        let status = snapshot.status();
        info!(
            feed = self.feed.describe(),
            generation,
            records = status.record_count,
            distinct_names = status.distinct_names,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Catalog snapshot published"
        );
        Ok(snapshot)
    }

    /// [`refresh`](Self::refresh) on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns the feed's [`LoadFault`], or [`LoadFault::Interrupted`] if the
    /// blocking task did not complete.
    pub async fn refresh_in_background(self: &Arc<Self>) -> Result<Arc<Snapshot>, LoadFault> {
        let controller = Arc::clone(self);
        tokio::task::spawn_blocking(move || controller.refresh())
            .await
            .map_err(|e| LoadFault::Interrupted {
                message: e.to_string(),
            })?
    }

    /// Start the periodic refresh loop.
    ///
    /// The first reload happens one `interval` after the call; the initial
    /// load is the caller's job (see [`refresh`](Self::refresh)).
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> RefreshTask {
        let stop = Arc::new(Notify::new());
        let controller = Arc::clone(self);
        let stop_signal = Arc::clone(&stop);
        let handle = tokio::spawn(async move { controller.run(interval, &stop_signal).await });
        info!(interval_secs = interval.as_secs(), "Refresh loop started");
        RefreshTask { stop, handle }
    }

    async fn run(self: Arc<Self>, interval: Duration, stop: &Notify) -> RefreshStats {
        let mut stats = RefreshStats::default();
        let period = interval.max(Duration::from_millis(1));
        let now = tokio::time::Instant::now();
        let mut ticker = tokio::time::interval_at(now.checked_add(period).unwrap_or(now), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = stop.notified() => break,
                _ = ticker.tick() => {
                    stats.attempts = stats.attempts.saturating_add(1);
                    if self.refresh_in_background().await.is_err() {
                        stats.failures = stats.failures.saturating_add(1);
                    }
                }
            }
        }

        info!(
            attempts = stats.attempts,
            failures = stats.failures,
            "Refresh loop stopped"
        );
        stats
    }

    fn report_failure(&self, fault: &LoadFault) {
        let generation = self.generation();
        if generation == 0 {
            error!(
                feed = self.feed.describe(),
                error = %fault,
                "Catalog load failed and no previous snapshot exists"
            );
        } else {
            warn!(
                feed = self.feed.describe(),
                error = %fault,
                kept_generation = generation,
                "Catalog refresh failed, keeping previous snapshot"
            );
        }
    }
}

/// Handle on the background refresh loop.
#[derive(Debug)]
pub struct RefreshTask {
    stop: Arc<Notify>,
    handle: JoinHandle<RefreshStats>,
}

impl RefreshTask {
    /// Ask the loop to stop and wait for it.
    ///
    /// A refresh already in progress completes first.
    ///
    /// # Errors
    ///
    /// Returns [`LoadFault::Interrupted`] if the loop task panicked or was
    /// aborted.
    pub async fn shutdown(self) -> Result<RefreshStats, LoadFault> {
        self.stop.notify_one();
        self.handle.await.map_err(|e| LoadFault::Interrupted {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn row(name: &str, date: &str) -> FeedRow {
        FeedRow {
            date: date.to_owned(),
            name: name.to_owned(),
            label: String::new(),
            time: String::from("00:00"),
            floor: String::from("Berghain"),
            closing: String::from("FALSE"),
            year: String::from("2024"),
        }
    }

    /// A feed whose next answers are scripted by the test. Once the script
    /// runs out it keeps serving `fallback`.
    struct ScriptedFeed {
        answers: Mutex<Vec<Result<Vec<FeedRow>, LoadFault>>>,
        fallback: Vec<FeedRow>,
    }

    impl ScriptedFeed {
        fn new(mut answers: Vec<Result<Vec<FeedRow>, LoadFault>>) -> Self {
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                fallback: Vec::new(),
            }
        }

        fn with_fallback(mut self, rows: Vec<FeedRow>) -> Self {
            self.fallback = rows;
            self
        }
    }

    impl FeedSource for ScriptedFeed {
        fn describe(&self) -> String {
            String::from("scripted")
        }

        fn load(&self) -> Result<Vec<FeedRow>, LoadFault> {
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    fn unreadable() -> LoadFault {
        LoadFault::Io {
            feed: String::from("scripted"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }
    }

    #[test]
    fn first_refresh_publishes_generation_one() {
        let feed = Arc::new(StaticFeed::new(vec![row("Ben Klock", "2024-01-10")]));
        let controller = RefreshController::new(feed, SimilarityOptions::default());
        let reader = controller.reader();
        assert!(reader.current().is_none());

        let snapshot = controller.refresh().unwrap();
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(controller.generation(), 1);
        assert_eq!(reader.require().unwrap().records().len(), 1);
    }

    #[test]
    fn failed_refresh_keeps_previous_snapshot() {
        let feed = Arc::new(ScriptedFeed::new(vec![
            Ok(vec![row("Ben Klock", "2024-01-10"), row("DVS1", "2023-02-02")]),
            Err(unreadable()),
        ]));
        let controller = RefreshController::new(feed, SimilarityOptions::default());
        let reader = controller.reader();

        let _ = controller.refresh().unwrap();
        let fault = controller.refresh().unwrap_err();
        assert!(matches!(fault, LoadFault::Io { .. }));

        let current = reader.require().unwrap();
        assert_eq!(current.generation(), 1);
        assert_eq!(current.records().len(), 2);
        assert_eq!(controller.generation(), 1);
    }

    #[test]
    fn failure_before_first_load_leaves_catalog_unavailable() {
        let feed = Arc::new(ScriptedFeed::new(vec![Err(unreadable())]));
        let controller = RefreshController::new(feed, SimilarityOptions::default());
        assert!(controller.refresh().is_err());
        assert!(controller.reader().require().is_err());
        assert_eq!(controller.generation(), 0);
    }

    #[test]
    fn malformed_fault_mentions_line() {
        let fault = LoadFault::Malformed {
            feed: String::from("lineup.csv"),
            line: Some(4),
            message: String::from("found 3 fields, expected 7"),
        };
        assert_eq!(
            fault.to_string(),
            "feed lineup.csv malformed at line 4: found 3 fields, expected 7"
        );
    }

    #[test]
    fn concurrent_refreshes_take_distinct_generations() {
        let feed = Arc::new(StaticFeed::new(vec![row("Ben Klock", "2024-01-10")]));
        let controller = Arc::new(RefreshController::new(feed, SimilarityOptions::default()));
        let reader = controller.reader();

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let controller = Arc::clone(&controller);
                std::thread::spawn(move || controller.refresh().unwrap().generation())
            })
            .collect();
        let mut generations: Vec<u64> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        generations.sort_unstable();

        assert_eq!(generations, (1..=8).collect::<Vec<u64>>());
        assert_eq!(controller.generation(), 8);
        assert_eq!(reader.require().unwrap().generation(), 8);
    }

    #[tokio::test]
    async fn background_refresh_publishes() {
        let feed = Arc::new(StaticFeed::new(vec![row("Len Faki", "2021-06-06")]));
        let controller = Arc::new(RefreshController::new(feed, SimilarityOptions::default()));
        let snapshot = controller.refresh_in_background().await.unwrap();
        assert_eq!(snapshot.generation(), 1);
    }

    #[tokio::test]
    async fn loop_refreshes_until_shutdown() {
        let later = vec![row("DVS1", "2023-02-02"), row("Len Faki", "2021-06-06")];
        let feed = Arc::new(
            ScriptedFeed::new(vec![Ok(vec![row("Ben Klock", "2024-01-10")]), Err(unreadable())])
                .with_fallback(later),
        );
        let controller = Arc::new(RefreshController::new(feed, SimilarityOptions::default()));
        let mut reader = controller.reader();
        let task = controller.spawn(Duration::from_millis(50));

        let first = tokio::time::timeout(Duration::from_secs(5), reader.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.generation(), 1);

        assert_eq!(first.records().len(), 1);

        // The scripted failure publishes nothing; the next success does.
        let second = tokio::time::timeout(Duration::from_secs(5), reader.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(second.generation() >= 2);
        assert_eq!(second.records().len(), 2);

        let stats = task.shutdown().await.unwrap();
        assert!(stats.attempts >= 3);
        assert!(stats.failures >= 1);
    }
}
