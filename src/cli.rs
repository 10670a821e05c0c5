use clap::Parser;
use crate::types::LogLevel;

#[derive(Parser, Debug)]
#[command(
    name = "camsync-rs",
    about = "Mirror photos and videos from a network camera onto local storage"
)]
pub struct Cli {
    /// Camera address (host, host:port, or base URL)
    #[arg(long, env = "CAMSYNC_HOST")]
    pub host: String,

    /// Local directory to write downloaded files into
    #[arg(short = 'd', long, env = "CAMSYNC_DIRECTORY", default_value = ".")]
    pub directory: String,

    /// Copy every file the camera references (thumbnails, FIT tracks,
    /// low-res previews) and keep the camera's folder layout. Without this,
    /// only the primary file is copied, flat, under its media name.
    #[arg(long)]
    pub mirror: bool,

    /// Keep running, syncing every --poll-seconds
    #[arg(long)]
    pub poll: bool,

    /// Seconds to wait between syncs when --poll is set
    #[arg(long, default_value_t = 60)]
    pub poll_seconds: u64,

    /// Free-space threshold for deleting synced files from the camera.
    /// Reserved: accepted but not acted on yet.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub delete_percent: u8,

    /// URL segment where the mirrored layout begins (repeatable, searched
    /// in order). Defaults to /DCIM/ then /GMetrix/
    #[arg(long = "marker")]
    pub markers: Vec<String>,

    /// Filter token passed to the camera's media-list command
    #[arg(long)]
    pub filter: Option<String>,

    /// Report what would be downloaded without touching the local disk
    #[arg(long)]
    pub dry_run: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress_bar: bool,

    /// Send readiness and status notifications to systemd
    #[arg(long)]
    pub notify_systemd: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}
