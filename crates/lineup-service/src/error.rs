//! Error types for the lookup service binary.
//!
//! [`ServiceError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving. A failed catalog load is not
//! one of them: the service starts without a catalog and keeps retrying.

/// Top-level error for the lookup service binary.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: lineup_core::config::ConfigError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: lineup_api::ServerError,
    },

    /// The refresh loop did not shut down cleanly.
    #[error("refresh loop error: {source}")]
    Refresh {
        /// The underlying fault.
        #[from]
        source: lineup_core::LoadFault,
    },
}
