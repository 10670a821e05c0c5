//! Fakes and a loopback HTTP stub shared by the unit tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::device::{EnumerationError, MediaDescriptor, MediaEnumerator};
use crate::download::error::DownloadError;
use crate::download::session::{DownloadSession, RemoteBody};

/// reqwest client that ignores proxy settings from the environment.
pub(crate) fn test_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub(crate) fn http_response(status: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// Accept a single connection on a loopback port, read the request, and
/// answer with `response`.
pub(crate) async fn serve_once(response: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket.write_all(&response).await.unwrap();
        let _ = socket.shutdown().await;
    });
    addr
}

async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body_len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                return;
            }
        }
    }
}

/// One remote file served by [`FakeSession`].
#[derive(Debug, Clone)]
pub(crate) struct FakeFile {
    body: Vec<u8>,
    advertised: Option<u64>,
    fail_midway: bool,
}

impl FakeFile {
    pub(crate) fn new(body: Vec<u8>) -> Self {
        let advertised = Some(body.len() as u64);
        Self {
            body,
            advertised,
            fail_midway: false,
        }
    }

    pub(crate) fn advertise(mut self, length: Option<u64>) -> Self {
        self.advertised = length;
        self
    }

    /// Deliver the first half of the body, then a connection error.
    pub(crate) fn fail_midway(mut self) -> Self {
        self.fail_midway = true;
        self
    }
}

/// In-memory [`DownloadSession`]. Unknown URLs answer 404. Every opened URL
/// is recorded.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeSession {
    files: HashMap<String, FakeFile>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, url: &str, file: FakeFile) -> Self {
        self.files.insert(url.to_string(), file);
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DownloadSession for FakeSession {
    async fn open(&self, url: &str) -> Result<RemoteBody, DownloadError> {
        self.requests.lock().unwrap().push(url.to_string());
        let file = self
            .files
            .get(url)
            .ok_or_else(|| DownloadError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })?;

        let (head, tail) = file.body.split_at(file.body.len() / 2);
        let second = if file.fail_midway {
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))
        } else {
            Ok(Bytes::copy_from_slice(tail))
        };
        let chunks = vec![Ok(Bytes::copy_from_slice(head)), second];
        Ok(RemoteBody {
            content_length: file.advertised,
            stream: stream::iter(chunks).boxed(),
        })
    }
}

/// In-memory [`MediaEnumerator`] returning a fixed listing, or failing.
#[derive(Debug, Clone)]
pub(crate) struct FakeEnumerator {
    media: Option<Vec<MediaDescriptor>>,
    calls: Arc<AtomicU32>,
    cancel_on_call: Option<(u32, CancellationToken)>,
}

impl FakeEnumerator {
    pub(crate) fn new(media: Vec<MediaDescriptor>) -> Self {
        Self {
            media: Some(media),
            calls: Arc::default(),
            cancel_on_call: None,
        }
    }

    /// Every call fails as if the camera answered with HTTP 500.
    pub(crate) fn failing() -> Self {
        Self {
            media: None,
            calls: Arc::default(),
            cancel_on_call: None,
        }
    }

    /// Cancel `token` when the `call`-th listing is requested.
    pub(crate) fn cancel_on_call(mut self, call: u32, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MediaEnumerator for FakeEnumerator {
    fn address(&self) -> &str {
        "fake-camera"
    }

    async fn media_list(
        &self,
        _filter: Option<&str>,
    ) -> Result<Vec<MediaDescriptor>, EnumerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on_call {
            if call == *at {
                token.cancel();
            }
        }
        self.media.clone().ok_or(EnumerationError::HttpStatus {
            endpoint: "http://fake-camera/virb".to_string(),
            status: 500,
        })
    }
}
