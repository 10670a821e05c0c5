//! Garmin VIRB media-list client.
//!
//! The camera exposes a single JSON command endpoint at `/virb`. Posting
//! `{"command":"mediaList"}` returns every file on the SD card together with
//! the URLs of its companion files.

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::error::EnumerationError;
use super::media::MediaDescriptor;
use super::MediaEnumerator;

const COMMAND_PATH: &str = "/virb";
const MEDIA_LIST_COMMAND: &str = "mediaList";

#[derive(Serialize)]
struct MediaListRequest<'a> {
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
}

#[derive(Deserialize)]
struct MediaListResponse {
    #[serde(default)]
    media: Vec<MediaDescriptor>,
}

#[derive(Debug, Clone)]
pub struct VirbClient {
    client: Client,
    host: String,
    endpoint: Url,
}

impl VirbClient {
    /// Build a client for the camera at `host`.
    ///
    /// `host` may be a bare address (`192.168.0.1`, `virb.local:8080`) or a
    /// full base URL; bare addresses are reached over plain HTTP.
    pub fn new(client: Client, host: &str) -> Result<Self, EnumerationError> {
        let endpoint = command_endpoint(host)?;
        Ok(Self {
            client,
            host: host.to_string(),
            endpoint,
        })
    }

    /// Turn a device-relative path (`/DCIM/100VIRB/VID_0001.THM`) into an
    /// absolute URL on the camera. Absolute URLs are returned unchanged.
    fn resolve(&self, url: &str) -> String {
        if Url::parse(url).is_ok() {
            return url.to_string();
        }
        match self.endpoint.join(url) {
            Ok(resolved) => resolved.to_string(),
            Err(e) => {
                tracing::debug!(url, error = %e, "Leaving unresolvable media URL as-is");
                url.to_string()
            }
        }
    }

    fn parse_media_list(&self, body: &[u8]) -> Result<Vec<MediaDescriptor>, EnumerationError> {
        let response: MediaListResponse =
            serde_json::from_slice(body).map_err(|source| EnumerationError::Decode {
                endpoint: self.endpoint.to_string(),
                source,
            })?;
        let mut media = response.media;
        for item in &mut media {
            item.rewrite_urls(|u| self.resolve(u));
        }
        Ok(media)
    }
}

fn command_endpoint(host: &str) -> Result<Url, EnumerationError> {
    let host = host.trim();
    let invalid = |reason: String| EnumerationError::InvalidHost {
        host: host.to_string(),
        reason,
    };
    if host.is_empty() {
        return Err(invalid("address is empty".to_string()));
    }
    let base = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };
    let base = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
    base.join(COMMAND_PATH).map_err(|e| invalid(e.to_string()))
}

#[async_trait::async_trait]
impl MediaEnumerator for VirbClient {
    fn address(&self) -> &str {
        &self.host
    }

    async fn media_list(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<MediaDescriptor>, EnumerationError> {
        let request = MediaListRequest {
            command: MEDIA_LIST_COMMAND,
            path: filter,
        };
        let endpoint = self.endpoint.to_string();

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|source| EnumerationError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnumerationError::HttpStatus {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| EnumerationError::Request { endpoint, source })?;
        self.parse_media_list(&body)
    }
}
