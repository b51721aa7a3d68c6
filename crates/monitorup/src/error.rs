//! Error types for MonitorUP.

use thiserror::Error;

/// Failures surfaced by single-entity operations.
///
/// Fan-out operations (active probing batches, aggregation, monitor
/// initialisation) absorb these per task and only report the success set.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Transport query failed: {0}")]
    Transport(String),

    #[error("Geospatial lookup failed: {0}")]
    Geospatial(String),

    #[error("Profile fetch failed for {identity}: {reason}")]
    Profile { identity: String, reason: String },

    #[error("Cache backend error: {0}")]
    Cache(String),

    #[error("Fetch was cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown aggregate strategy: {0}")]
    UnknownStrategy(String),
}

impl MonitorError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn geospatial(err: impl std::fmt::Display) -> Self {
        Self::Geospatial(err.to_string())
    }

    pub fn profile(identity: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Profile { identity: identity.into(), reason: err.to_string() }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, MonitorError>;
