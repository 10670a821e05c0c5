//! Camera access: the media-list contract the sync engine consumes, and the
//! VIRB client that fulfils it over HTTP.

pub mod error;
mod media;
mod virb;

pub use error::EnumerationError;
pub use media::MediaDescriptor;
pub use virb::VirbClient;

/// Source of media descriptors for one device.
///
/// Each call returns a fresh listing; nothing is cached between calls.
#[async_trait::async_trait]
pub trait MediaEnumerator: Send + Sync {
    /// Human-readable device address, used in log lines.
    fn address(&self) -> &str;

    /// List every media item on the device, optionally restricted by a
    /// device-specific filter token.
    async fn media_list(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<MediaDescriptor>, EnumerationError>;
}
