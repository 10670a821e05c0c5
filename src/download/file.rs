use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::DownloadError;
use super::session::{DownloadSession, RemoteBody};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The descriptor did not carry this file.
    NotProvided,
    /// A local file with the advertised size already exists.
    UpToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Skipped(SkipReason),
    Downloaded { bytes: u64 },
    /// Dry run: the file would have been downloaded.
    WouldDownload,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FetchOptions {
    pub dry_run: bool,
    pub no_progress_bar: bool,
}

/// Derive the temp filename next to the destination, so the final rename
/// stays on one filesystem. Hidden so camera tools scanning the mirrored
/// tree ignore it.
fn temp_download_path(download_path: &Path) -> PathBuf {
    let filename = download_path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = download_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!(".{filename}.part"))
}

/// Bring `download_path` up to date with `url`.
///
/// Big files: the body is streamed to disk and never held in memory. The
/// only freshness check is the size the server advertises; a local file of
/// exactly that size is trusted without looking at its contents.
pub async fn fetch_file(
    session: &dyn DownloadSession,
    url: &str,
    download_path: &Path,
    options: &FetchOptions,
) -> Result<FetchOutcome, DownloadError> {
    if url.is_empty() || download_path.as_os_str().is_empty() {
        return Ok(FetchOutcome::Skipped(SkipReason::NotProvided));
    }

    tracing::info!(url, path = %download_path.display(), "Fetching");
    let body = session.open(url).await?;
    tracing::debug!(content_length = ?body.content_length, "Server reported content length");

    if !options.dry_run {
        if let Some(parent) = download_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| DownloadError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
    }

    if is_up_to_date(download_path, body.content_length).await? {
        tracing::info!(path = %download_path.display(), "Skipping download; file exists");
        return Ok(FetchOutcome::Skipped(SkipReason::UpToDate));
    }

    if options.dry_run {
        tracing::info!("[DRY RUN] Would download {}", download_path.display());
        return Ok(FetchOutcome::WouldDownload);
    }

    let started = Instant::now();
    tracing::info!("Downloading {} into {}", url, download_path.display());
    let bytes = download_to_path(url, download_path, body, options.no_progress_bar).await?;

    let elapsed = started.elapsed().as_secs_f64();
    let rate = if elapsed > 0.0 {
        bytes as f64 / elapsed / 1000.0
    } else {
        0.0
    };
    tracing::info!(
        "Copied {} bytes in {:.1} seconds ({:.1} kB/sec)",
        bytes,
        elapsed,
        rate
    );
    Ok(FetchOutcome::Downloaded { bytes })
}

/// Compare the local file against the advertised size. A missing file or an
/// unknown remote size means the file must be fetched.
async fn is_up_to_date(path: &Path, content_length: Option<u64>) -> Result<bool, DownloadError> {
    let metadata = match fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("File missing locally; downloading");
            return Ok(false);
        }
        Err(e) => return Err(DownloadError::Disk(e)),
    };

    match content_length {
        Some(expected) if metadata.is_file() && metadata.len() == expected => Ok(true),
        Some(expected) => {
            tracing::info!(
                local = metadata.len(),
                remote = expected,
                "File size mismatch; re-downloading"
            );
            Ok(false)
        }
        None => {
            tracing::info!("Server did not report a size; re-downloading");
            Ok(false)
        }
    }
}

/// Stream into a `.part` file and rename it over the destination once the
/// body is complete. On failure the destination is left untouched.
async fn download_to_path(
    url: &str,
    download_path: &Path,
    body: RemoteBody,
    no_progress_bar: bool,
) -> Result<u64, DownloadError> {
    let part_path = temp_download_path(download_path);
    let pb = create_progress_bar(no_progress_bar, body.content_length);

    let result = match write_part(url, &part_path, body, &pb).await {
        Ok(bytes) => fs::rename(&part_path, download_path)
            .await
            .map(|()| bytes)
            .map_err(DownloadError::Disk),
        Err(e) => Err(e),
    };
    pb.finish_and_clear();

    if result.is_err() {
        let _ = fs::remove_file(&part_path).await;
    }
    result
}

async fn write_part(
    url: &str,
    part_path: &Path,
    mut body: RemoteBody,
    pb: &ProgressBar,
) -> Result<u64, DownloadError> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part_path)
        .await?;

    let stream_error = |bytes_written: u64, source: std::io::Error| DownloadError::Stream {
        url: url.to_string(),
        bytes_written,
        source,
    };

    let mut bytes_written: u64 = 0;
    while let Some(chunk) = body.stream.next().await {
        let chunk = chunk.map_err(|e| {
            pb.suspend(|| tracing::warn!(url, bytes_written, error = %e, "Copy failed"));
            stream_error(bytes_written, e)
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|e| stream_error(bytes_written, e))?;
        bytes_written += chunk.len() as u64;
        pb.inc(chunk.len() as u64);
    }
    file.flush()
        .await
        .map_err(|e| stream_error(bytes_written, e))?;
    Ok(bytes_written)
}

/// Per-file byte progress bar.
///
/// Returns `ProgressBar::hidden()` when disabled or when stdout is not a
/// TTY (cron, systemd), so log output stays clean.
fn create_progress_bar(no_progress_bar: bool, total: Option<u64>) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    styled_progress_bar(total)
}

/// Byte bar when the size is known, otherwise a spinner counting bytes.
fn styled_progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::with_template(
                    "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}, {eta})",
                )
                .expect("valid template")
                .progress_chars("=> "),
            );
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template(
                    "[{elapsed_precise}] {spinner} {bytes} ({binary_bytes_per_sec})",
                )
                .expect("valid template"),
            );
            pb
        }
    }
}
