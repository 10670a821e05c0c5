use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};

use super::error::DownloadError;

/// Response body of a remote file, consumed chunk by chunk.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// An opened remote file: the server's advertised size plus its body.
pub struct RemoteBody {
    /// `None` when the server did not advertise a length.
    pub content_length: Option<u64>,
    pub stream: ByteStream,
}

impl std::fmt::Debug for RemoteBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBody")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Minimal transport used by the fetcher: one GET per URL.
#[async_trait::async_trait]
pub trait DownloadSession: Send + Sync {
    /// Issue the request for `url`. Non-success statuses are errors.
    async fn open(&self, url: &str) -> Result<RemoteBody, DownloadError>;
}

#[async_trait::async_trait]
impl DownloadSession for reqwest::Client {
    async fn open(&self, url: &str) -> Result<RemoteBody, DownloadError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_length = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other))
            .boxed();
        Ok(RemoteBody {
            content_length,
            stream,
        })
    }
}
