use std::path::PathBuf;
use std::time::Duration;

use crate::download::paths::DEFAULT_MARKERS;

/// Application configuration, fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub directory: PathBuf,
    pub markers: Vec<String>,
    pub filter: Option<String>,

    /// Seconds between passes; 0 means a single pass.
    pub poll_seconds: u64,
    /// Reserved for space management; never acted on.
    pub delete_percent: u8,

    pub mirror: bool,
    pub dry_run: bool,
    pub no_progress_bar: bool,
    pub notify_systemd: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Markers are matched as whole path segments, so make sure each one is
/// wrapped in slashes (`DCIM` becomes `/DCIM/`).
fn normalize_marker(marker: &str) -> anyhow::Result<String> {
    let trimmed = marker.trim().trim_matches('/');
    if trimmed.is_empty() {
        anyhow::bail!("Marker '{}' is empty", marker);
    }
    Ok(format!("/{}/", trimmed))
}

impl Config {
    pub fn from_cli(cli: crate::cli::Cli) -> anyhow::Result<Self> {
        let host = cli.host.trim().to_string();
        if host.is_empty() {
            anyhow::bail!("--host must not be empty");
        }

        if cli.directory.trim().is_empty() {
            anyhow::bail!("--directory must not be empty");
        }
        let directory = expand_tilde(&cli.directory);

        let markers = if cli.markers.is_empty() {
            DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect()
        } else {
            cli.markers
                .iter()
                .map(|m| normalize_marker(m))
                .collect::<anyhow::Result<Vec<_>>>()?
        };

        let poll_seconds = if cli.poll {
            if cli.poll_seconds == 0 {
                tracing::warn!("--poll with --poll-seconds 0; running a single pass");
            }
            cli.poll_seconds
        } else {
            0
        };

        Ok(Self {
            host,
            directory,
            markers,
            filter: cli.filter.filter(|f| !f.is_empty()),
            poll_seconds,
            delete_percent: cli.delete_percent,
            mirror: cli.mirror,
            dry_run: cli.dry_run,
            no_progress_bar: cli.no_progress_bar,
            notify_systemd: cli.notify_systemd,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_seconds)
    }
}
