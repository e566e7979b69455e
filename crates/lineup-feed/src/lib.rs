//! CSV lineup feed for the Lineup service.
//!
//! The feed is a CSV file with a header row naming at least the columns
//! `date, name, label, time, floor, closing, year`. Extra columns are
//! ignored and empty lines are skipped. Everything else (missing columns,
//! ragged rows, invalid UTF-8) makes the whole load fail with
//! [`LoadFault::Malformed`] so the previous snapshot stays in service.
//!
//! [`CsvFileFeed`] plugs into [`RefreshController`] as a [`FeedSource`].
//!
//! [`RefreshController`]: lineup_core::RefreshController

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use lineup_core::refresh::{FeedSource, LoadFault};
use lineup_types::FeedRow;
use tracing::debug;

/// A lineup CSV file on disk, re-read on every load.
#[derive(Debug, Clone)]
pub struct CsvFileFeed {
    path: PathBuf,
}

impl CsvFileFeed {
    /// Feed backed by the file at `path`. The file is not opened until
    /// [`load`](FeedSource::load) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this feed reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedSource for CsvFileFeed {
    fn describe(&self) -> String {
        self.path().display().to_string()
    }

    fn load(&self) -> Result<Vec<FeedRow>, LoadFault> {
        let file = File::open(self.path()).map_err(|source| LoadFault::Io {
            feed: self.describe(),
            source,
        })?;
        let rows = parse_csv(file, &self.describe())?;
        debug!(path = %self.path().display(), rows = rows.len(), "CSV feed read");
        Ok(rows)
    }
}

/// Parse lineup rows from any CSV reader.
///
/// `feed` names the source in errors.
///
/// # Errors
///
/// Returns [`LoadFault::Io`] if reading fails and [`LoadFault::Malformed`]
/// if the content is not a valid lineup table.
pub fn parse_csv<R: Read>(reader: R, feed: &str) -> Result<Vec<FeedRow>, LoadFault> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    csv_reader
        .deserialize::<FeedRow>()
        .map(|row| row.map_err(|e| to_fault(e, feed)))
        .collect()
}

fn to_fault(error: csv::Error, feed: &str) -> LoadFault {
    let line = error.position().map(csv::Position::line);
    match error.into_kind() {
        csv::ErrorKind::Io(source) => LoadFault::Io {
            feed: feed.to_owned(),
            source,
        },
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => LoadFault::Malformed {
            feed: feed.to_owned(),
            line,
            message: format!("found {len} fields, expected {expected_len}"),
        },
        csv::ErrorKind::Utf8 { err, .. } => LoadFault::Malformed {
            feed: feed.to_owned(),
            line,
            message: format!("invalid UTF-8: {err}"),
        },
        csv::ErrorKind::Deserialize { err, .. } => LoadFault::Malformed {
            feed: feed.to_owned(),
            line,
            message: err.to_string(),
        },
        other => LoadFault::Malformed {
            feed: feed.to_owned(),
            line,
            message: format!("{other:?}"),
        },
    }
}
