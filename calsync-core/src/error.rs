//! Error types for calsync.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a synchronization pass.
#[derive(Error, Debug)]
pub enum CalSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Sync database not found. Please initialize the database first.\n\n\
        Supported initialization modes are:\n  \
        --init keep-remote  Remove all local calendar items\n  \
        --init keep-local   Remove all remote objects\n  \
        --init two-way      Copy local items to the server and vice versa"
    )]
    Uninitialized,

    #[error(
        "Leftover lock file detected at {path}{holder}. If there is no other synchronization \
        instance running, please remove the lock file manually and try again."
    )]
    Locked { path: PathBuf, holder: String },

    #[error("Corrupt sync database {path} (line {line}): {content:?}")]
    CorruptDatabase {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The server replied with HTTP status code {status} ({reason}) while trying to access {url}.")]
    HttpStatus {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("Malformed server response: {message}\n\nThe error occurred while processing the following XML node:\n{fragment}")]
    MalformedResponse { message: String, fragment: String },

    #[error("Server did not report an ETag for {href} after {attempts} attempts")]
    EtagTimeout { href: String, attempts: u32 },

    #[error("Local store error: {0}")]
    LocalStore(String),

    #[error("Local store binary '{0}' not found in PATH")]
    StoreNotInstalled(String),

    #[error("Incompatible local store: {0}")]
    IncompatibleStore(String),
}

impl CalSyncError {
    pub(crate) fn malformed(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        CalSyncError::MalformedResponse {
            message: message.into(),
            fragment: fragment.into(),
        }
    }
}

/// Result type alias for calsync operations.
pub type CalSyncResult<T> = Result<T, CalSyncError>;
