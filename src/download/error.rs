use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification used when reporting a failed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request or the response stream failed.
    Transfer,
    /// Local directory or file handling failed.
    Io,
}

/// Typed errors for a single file transfer.
///
/// None of these is fatal to a sync pass: the failing file is logged and the
/// pass moves on to the next one.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Request for {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("HTTP error {status} fetching {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Transfer of {url} failed after {bytes_written} bytes: {source}")]
    Stream {
        url: String,
        bytes_written: u64,
        source: std::io::Error,
    },

    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Disk error: {0}")]
    Disk(#[from] std::io::Error),
}

impl DownloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::Request { .. }
            | DownloadError::HttpStatus { .. }
            | DownloadError::Stream { .. } => ErrorKind::Transfer,
            DownloadError::CreateDir { .. } | DownloadError::Disk(_) => ErrorKind::Io,
        }
    }
}
