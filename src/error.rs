//! Custom error types for the converter.
//!
//! This module defines the primary error type, `DaqError`, for the whole crate.
//! Using the `thiserror` crate, it provides one place to describe the failures
//! that can stop a run, from configuration mistakes to storage I/O.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from `figment`, typically file parsing or type
//!   mismatches while layering configuration sources.
//! - **`Configuration`**: Semantic configuration errors that pass parsing but are
//!   logically invalid, e.g. a channel count outside `[1, max_channels]`. These are
//!   raised before any event is processed and are fatal to the run.
//! - **`Io`**: Wraps `std::io::Error` from reading events or writing records.
//! - **`Storage`**: Failures reported by a record writer backend.
//! - **`Decode`**: A raw event that could not be decoded into measurements. This is a
//!   per-event condition: the event is skipped and the run continues.
//! - **`InvalidState`**: Lifecycle misuse, such as delivering an event while no run
//!   is active.
//! - **`FeatureNotEnabled`**: A storage format that was not compiled in.
//!
//! Absent banks, point-capacity overflow, out-of-range channels and sample
//! truncation are not errors at all; they only move the run counters.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

#[derive(Error, Debug)]
pub enum DaqError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Malformed event: {0}")]
    Decode(String),

    #[error("Invalid run state: {0}")]
    InvalidState(String),

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl DaqError {
    /// Whether this error must terminate the current run.
    ///
    /// Only malformed events are recoverable; the host skips the event and keeps
    /// going. Everything else is reported upward and ends the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DaqError::Decode(_))
    }
}

impl From<figment::Error> for DaqError {
    fn from(value: figment::Error) -> Self {
        DaqError::Config(Box::new(value))
    }
}

impl From<serde_json::Error> for DaqError {
    fn from(value: serde_json::Error) -> Self {
        DaqError::Decode(value.to_string())
    }
}

#[cfg(feature = "storage_csv")]
impl From<csv::Error> for DaqError {
    fn from(value: csv::Error) -> Self {
        DaqError::Storage(value.to_string())
    }
}

#[cfg(feature = "storage_arrow")]
impl From<arrow::error::ArrowError> for DaqError {
    fn from(value: arrow::error::ArrowError) -> Self {
        DaqError::Storage(value.to_string())
    }
}
