//! Error taxonomy for the loader.
//!
//! Per-path load failures are outcomes, not errors: they travel in
//! [`Settlement::failed_paths`](crate::coordinator::Settlement). Only
//! misuse of the API and broken configuration surface as [`LoaderError`].

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised synchronously by the loader, its config and manifests.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// `load` was called with a bundle id that is already registered.
    #[error("bundle id already registered: {0}")]
    DuplicateBundle(String),

    /// A wait lost its sender before settlement: a `settled` subscription
    /// dropped by `reset`, or a load task that died (a panicking callback or
    /// runtime shutdown).
    #[error("wait cancelled before settlement")]
    Cancelled,

    /// A config file could not be read or parsed.
    #[error("failed to load config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: Box<LoaderError>,
    },

    /// A manifest is structurally invalid (unknown dependency, cycle, ...).
    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid block pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type Result<T, E = LoaderError> = std::result::Result<T, E>;
