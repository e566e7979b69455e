//! Configuration loading and typed config structures for the Lineup service.
//!
//! The canonical configuration lives in `lineup-config.yaml` at the working
//! directory. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads and validates the file.
//! Every section is optional; omitted values fall back to the reference
//! deployment (hourly refresh, 0.4 fuzzy tolerance, port 5000).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::similarity::SimilarityOptions;

/// Environment variable overriding [`FeedConfig::path`].
pub const FEED_PATH_ENV: &str = "LINEUP_FEED_PATH";

/// Environment variable overriding [`ServerSection::port`].
pub const PORT_ENV: &str = "LINEUP_PORT";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `lineup-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LineupConfig {
    /// Where the occurrence feed is read from.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Refresh schedule.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Fuzzy matching parameters.
    #[serde(default)]
    pub matching: MatchingConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Catalog presentation settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LineupConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `LINEUP_FEED_PATH` overrides `feed.path`
    /// - `LINEUP_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Does not consult the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml rejects an empty document; treat it as "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LINEUP_FEED_PATH` and `LINEUP_PORT` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `LINEUP_PORT` is not a port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = std::env::var(FEED_PATH_ENV) {
            self.feed.path = path;
        }
        if let Ok(port) = std::env::var(PORT_ENV) {
            self.server.port = port.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "server.port",
                reason: format!("{PORT_ENV}={port}: {e}"),
            })?;
        }
        Ok(())
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "feed.path",
                reason: String::from("must not be empty"),
            });
        }
        if self.refresh.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "refresh.interval_secs",
                reason: String::from("must be greater than zero"),
            });
        }
        check_unit_interval("matching.threshold", self.matching.threshold)?;
        check_unit_interval("matching.fuzzy_cutoff", self.matching.fuzzy_cutoff)?;
        Ok(())
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} is outside [0, 1]"),
        })
    }
}

/// Feed source configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// Path of the CSV lineup file.
    #[serde(default = "default_feed_path")]
    pub path: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: default_feed_path(),
        }
    }
}

/// Refresh schedule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between two catalog reloads.
    #[serde(default = "default_refresh_interval_secs")]
    pub interval_secs: u64,
}

impl RefreshConfig {
    /// The refresh interval as a [`Duration`].
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval_secs(),
        }
    }
}

/// Fuzzy matching configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchingConfig {
    /// Maximum raw score (0 = perfect, 1 = total miss) the similarity index
    /// accepts as a hit.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Expected position of the match inside a name.
    #[serde(default)]
    pub location: usize,

    /// How far from `location` a match may start before it counts as a
    /// full miss.
    #[serde(default = "default_distance")]
    pub distance: usize,

    /// Whether longer names are penalized by field-length normalization.
    #[serde(default = "default_true")]
    pub field_norm: bool,

    /// The best hit is accepted as a suggestion only when its final score
    /// is strictly below this value.
    #[serde(default = "default_fuzzy_cutoff")]
    pub fuzzy_cutoff: f64,
}

impl MatchingConfig {
    /// Similarity index options derived from this section.
    pub const fn similarity_options(&self) -> SimilarityOptions {
        SimilarityOptions {
            threshold: self.threshold,
            location: self.location,
            distance: self.distance,
            field_norm: self.field_norm,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            location: 0,
            distance: default_distance(),
            field_norm: true,
            fuzzy_cutoff: default_fuzzy_cutoff(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Catalog presentation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// Venue name used in human-readable answers.
    #[serde(default = "default_venue_name")]
    pub venue_name: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            venue_name: default_venue_name(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit one JSON object per event instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_feed_path() -> String {
    "berghain_lineup.csv".to_owned()
}

const fn default_refresh_interval_secs() -> u64 {
    3600
}

const fn default_threshold() -> f64 {
    0.4
}

const fn default_distance() -> usize {
    100
}

const fn default_fuzzy_cutoff() -> f64 {
    0.4
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    5000
}

fn default_venue_name() -> String {
    "Berghain".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
