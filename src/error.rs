//! Errors surfaced by the reader.

use thiserror::Error;

use crate::convert::Representation;
use crate::feed::FeedError;
use crate::model::ConfigType;
use crate::store::StoreError;

/// Errors that can occur while reading configuration values.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Key absent (or inactive) for the application.
    #[error("Configuration key '{key}' not found for application '{application}'")]
    NotFound { key: String, application: String },

    /// Declared type incompatible with the requested representation, or the
    /// raw value failed to parse.
    #[error("Cannot convert value '{raw_value}' declared as {declared} to {requested}")]
    TypeMismatch {
        raw_value: String,
        declared: ConfigType,
        requested: Representation,
    },

    /// Caller passed an invalid argument.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A refresh attempt could not reach the store.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Subscribing to or consuming the change feed failed.
    #[error("Change listener error: {0}")]
    Listener(#[from] FeedError),

    /// The reader has been shut down.
    #[error("Reader has been disposed")]
    Disposed,
}

impl ReaderError {
    /// True for the expected "key is not there" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReaderError::NotFound { .. })
    }
}

/// Result type for reader operations.
pub type ReaderResult<T> = Result<T, ReaderError>;
