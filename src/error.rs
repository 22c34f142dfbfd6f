//! Error types for figsplit-batch
//!
//! Two layers of errors exist:
//! - [`Error`] for operations that can fail a whole run (configuration, ledger I/O)
//! - [`SplitError`] for a single image inside an item; these never escape the
//!   item processor and are classified as systemic or isolated

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for figsplit-batch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for figsplit-batch
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "chunk_size")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An item folder could not be listed
    #[error("cannot list item folder {path}: {source}")]
    ItemUnreadable {
        /// The item folder
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Progress ledger could not be read or written
    #[error("ledger error at {path}: {reason}")]
    Ledger {
        /// Path of the ledger file
        path: PathBuf,
        /// The reason the ledger operation failed
        reason: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Logging could not be initialized
    #[error("logging error: {0}")]
    Logging(String),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a configuration key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The archive could not be opened or parsed
    #[error("failed to read archive {archive}: {reason}")]
    InvalidArchive {
        /// The archive file that failed to open
        archive: PathBuf,
        /// The reason the archive is unreadable
        reason: String,
    },

    /// An entry could not be written to disk
    #[error("failed to extract {entry} from {archive}: {reason}")]
    EntryFailed {
        /// The archive being extracted
        archive: PathBuf,
        /// The entry name inside the archive
        entry: String,
        /// The reason the entry failed
        reason: String,
    },

    /// Panels were extracted but the downloaded archive could not be deleted
    #[error("failed to remove archive {archive}: {source}")]
    ArchiveNotRemoved {
        /// The archive left behind
        archive: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The blocking extraction task did not complete
    #[error("extraction task for {archive} failed: {reason}")]
    TaskFailed {
        /// The archive being extracted
        archive: PathBuf,
        /// Join error description
        reason: String,
    },
}

/// Failure of a single image upload/download/extract cycle
#[derive(Debug, Error)]
pub enum SplitError {
    /// The splitting service answered the upload with a non-200 status
    #[error("upload of {image} returned status {status}")]
    UploadStatus {
        /// The image that was uploaded
        image: PathBuf,
        /// HTTP status code returned by the service
        status: u16,
    },

    /// The request did not complete within the configured timeout
    #[error("request for {image} timed out")]
    Timeout {
        /// The image being processed
        image: PathBuf,
    },

    /// Transport-level failure (connection refused, reset, bad body, ...)
    #[error("request for {image} failed: {source}")]
    Request {
        /// The image being processed
        image: PathBuf,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The upload succeeded but the response carried no archive link
    #[error("no download link in response for {image}")]
    MissingDownloadLink {
        /// The image that was uploaded
        image: PathBuf,
    },

    /// The archive download answered with a non-success status
    #[error("archive download {url} returned status {status}")]
    DownloadStatus {
        /// Archive URL
        url: String,
        /// HTTP status code returned
        status: u16,
    },

    /// Local file I/O failed
    #[error("I/O error for {path}: {source}")]
    Io {
        /// The path being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The downloaded archive could not be extracted
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl SplitError {
    /// Whether this failure indicates that the remote service itself is unhealthy.
    ///
    /// Only a non-200 answer to the upload counts; timeouts, transport errors and
    /// everything after a successful upload are isolated to the one image.
    pub fn is_systemic(&self) -> bool {
        matches!(self, SplitError::UploadStatus { .. })
    }

    /// Classify a reqwest error raised while handling `image`
    pub(crate) fn from_request(image: &std::path::Path, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            SplitError::Timeout {
                image: image.to_path_buf(),
            }
        } else {
            SplitError::Request {
                image: image.to_path_buf(),
                source,
            }
        }
    }
}
