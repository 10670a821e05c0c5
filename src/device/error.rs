use thiserror::Error;

/// Failures while asking the camera for its media list.
///
/// Any of these aborts the current sync pass; nothing is downloaded from a
/// partial listing.
#[derive(Error, Debug)]
pub enum EnumerationError {
    #[error("Invalid device address '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("Media list request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("Media list request to {endpoint} returned HTTP {status}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("Malformed media list from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
}
