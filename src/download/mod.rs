//! Sync engine: turns one media listing into a set of file transfers and
//! runs them one at a time. A failed file is logged and counted; only a
//! failed listing fails the pass.

pub mod error;
pub mod file;
pub mod paths;
pub mod session;

use std::fs::FileTimes;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::device::{EnumerationError, MediaDescriptor, MediaEnumerator};
use file::{FetchOptions, FetchOutcome, SkipReason};
use paths::PathMapper;
use session::DownloadSession;

/// The parts of [`Config`](crate::config::Config) a sync pass reads.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub(crate) directory: PathBuf,
    pub(crate) markers: Vec<String>,
    pub(crate) filter: Option<String>,
    pub(crate) mirror: bool,
    pub(crate) dry_run: bool,
    pub(crate) no_progress_bar: bool,
}

impl From<&crate::config::Config> for DownloadConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            directory: config.directory.clone(),
            markers: config.markers.clone(),
            filter: config.filter.clone(),
            mirror: config.mirror,
            dry_run: config.dry_run,
            no_progress_bar: config.no_progress_bar,
        }
    }
}

/// One remote file and where it lands locally.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TransferTask {
    url: String,
    download_path: PathBuf,
}

/// Counts for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub media: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub would_download: usize,
    pub failed: usize,
    pub bytes: u64,
}

impl SyncSummary {
    /// One-line status, used for the systemd status field.
    pub fn status_line(&self) -> String {
        format!(
            "{} media, {} downloaded, {} up to date, {} failed",
            self.media, self.downloaded, self.skipped, self.failed
        )
    }
}

pub struct SyncEngine {
    enumerator: Box<dyn MediaEnumerator>,
    session: Box<dyn DownloadSession>,
    mapper: PathMapper,
    config: DownloadConfig,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("device", &self.enumerator.address())
            .field("mapper", &self.mapper)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    pub fn new(
        enumerator: Box<dyn MediaEnumerator>,
        session: Box<dyn DownloadSession>,
        config: DownloadConfig,
    ) -> Self {
        let mapper = PathMapper::new(&config.directory, config.markers.clone());
        Self {
            enumerator,
            session,
            mapper,
            config,
        }
    }

    /// Build the transfers for one descriptor.
    ///
    /// The primary file is always included; companions only in mirror mode,
    /// mapped from their URLs. Tasks are unique by destination: when two
    /// URLs map to the same path the later one (primary, FIT, low-res,
    /// thumbnail order) replaces the earlier one's URL in place. A URL that
    /// maps onto the output root itself has no file name and is dropped.
    fn tasks_for(&self, media: &MediaDescriptor) -> Vec<TransferTask> {
        let mirror = self.config.mirror;
        let mut tasks: Vec<TransferTask> = Vec::new();
        self.push_mapped(
            &mut tasks,
            &media.url,
            self.mapper.map(&media.name, &media.url, mirror),
        );
        if mirror {
            for url in media.auxiliary_urls() {
                self.push_mapped(&mut tasks, url, self.mapper.map("", url, true));
            }
        }
        tasks
    }

    fn push_mapped(&self, tasks: &mut Vec<TransferTask>, url: &str, download_path: PathBuf) {
        if download_path.as_path() == self.mapper.root() {
            if !url.is_empty() {
                tracing::warn!(url, "No file name to store this URL under; skipping");
            }
            return;
        }
        push_task(tasks, url, download_path);
    }

    /// Run one complete pass: list the device, then bring every file up to
    /// date in listing order.
    pub async fn run_once(&self) -> Result<SyncSummary, EnumerationError> {
        let started = Instant::now();
        tracing::info!("Fetching media list from {}", self.enumerator.address());
        let media = self
            .enumerator
            .media_list(self.config.filter.as_deref())
            .await?;
        tracing::info!("Media list returned {} items", media.len());

        let options = FetchOptions {
            dry_run: self.config.dry_run,
            no_progress_bar: self.config.no_progress_bar,
        };
        let mut summary = SyncSummary {
            media: media.len(),
            ..SyncSummary::default()
        };

        for item in &media {
            tracing::debug!(
                name = %item.name,
                media_type = ?item.media_type,
                file_size = ?item.file_size,
                "Found media"
            );

            for task in self.tasks_for(item) {
                let result = file::fetch_file(
                    self.session.as_ref(),
                    &task.url,
                    &task.download_path,
                    &options,
                )
                .await;

                match result {
                    Ok(FetchOutcome::Downloaded { bytes }) => {
                        summary.downloaded += 1;
                        summary.bytes += bytes;
                        if let Some(date) = item.date.filter(|d| *d > 0) {
                            stamp_mtime(&task.download_path, date).await;
                        }
                    }
                    Ok(FetchOutcome::Skipped(SkipReason::UpToDate)) => summary.skipped += 1,
                    Ok(FetchOutcome::Skipped(SkipReason::NotProvided)) => {}
                    Ok(FetchOutcome::WouldDownload) => summary.would_download += 1,
                    Err(e) => {
                        summary.failed += 1;
                        tracing::error!(
                            url = %task.url,
                            path = %task.download_path.display(),
                            kind = ?e.kind(),
                            "File mirroring failed: {}",
                            e
                        );
                    }
                }
            }
        }

        self.log_summary(&summary, started.elapsed());
        Ok(summary)
    }

    fn log_summary(&self, summary: &SyncSummary, elapsed: Duration) {
        if self.config.dry_run {
            tracing::info!("── Dry Run Summary ──");
            tracing::info!("  {} files would be downloaded", summary.would_download);
            tracing::info!("  {} files up to date", summary.skipped);
            tracing::info!("  destination: {}", self.mapper.root().display());
            return;
        }
        tracing::info!("── Summary ──");
        tracing::info!(
            "  {} downloaded ({} bytes), {} up to date, {} failed",
            summary.downloaded,
            summary.bytes,
            summary.skipped,
            summary.failed
        );
        tracing::info!("  elapsed: {}", format_duration(elapsed));
    }
}

fn push_task(tasks: &mut Vec<TransferTask>, url: &str, download_path: PathBuf) {
    match tasks.iter_mut().find(|t| t.download_path == download_path) {
        Some(existing) => {
            tracing::debug!(
                path = %download_path.display(),
                replaced = %existing.url,
                url,
                "Two URLs map to the same destination; keeping the later one"
            );
            existing.url = url.to_string();
        }
        None => tasks.push(TransferTask {
            url: url.to_string(),
            download_path,
        }),
    }
}

async fn stamp_mtime(path: &Path, timestamp: i64) {
    let mtime_path = path.to_path_buf();
    match tokio::task::spawn_blocking(move || set_file_mtime(&mtime_path, timestamp)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!("Could not set mtime on {}: {}", path.display(), e),
        Err(e) => tracing::warn!("mtime task panicked: {}", e),
    }
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Set the modification and access times of a file to the given Unix
/// timestamp. Negative timestamps (dates before 1970) are handled by
/// stepping back from the epoch, or clamping to it.
fn set_file_mtime(path: &Path, timestamp: i64) -> std::io::Result<()> {
    let time = if timestamp >= 0 {
        UNIX_EPOCH + Duration::from_secs(timestamp as u64)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(timestamp.unsigned_abs()))
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    let times = FileTimes::new().set_modified(time).set_accessed(time);
    let file = std::fs::File::options().write(true).open(path)?;
    file.set_times(times)?;
    Ok(())
}
