//! camsync-rs: mirror photos and videos off a network camera.
//!
//! Polls the camera's media list, maps every file to a local path (flat, or
//! mirroring the camera's folder layout), and downloads whatever is missing
//! or differs in size. Runs once, or forever on a fixed interval.

#![warn(clippy::all)]

mod cli;
mod config;
mod device;
mod download;
mod scheduler;
mod shutdown;
mod systemd;
#[cfg(test)]
mod test_support;
mod types;

use clap::Parser;
use tracing_subscriber::EnvFilter;

// Transfers run one at a time, so a single-threaded runtime is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::info!(
        host = %config.host,
        directory = %config.directory.display(),
        mirror = config.mirror,
        poll_seconds = config.poll_seconds,
        "Starting camsync-rs"
    );
    if config.delete_percent > 0 {
        tracing::warn!(
            "--delete-percent {} is reserved for future use; no files will be deleted",
            config.delete_percent
        );
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("camsync-rs/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let enumerator = device::VirbClient::new(client.clone(), &config.host)?;
    let engine = download::SyncEngine::new(
        Box::new(enumerator),
        Box::new(client),
        download::DownloadConfig::from(&config),
    );

    let shutdown_token = shutdown::install_signal_handler()?;
    let notifier = systemd::SystemdNotifier::new(config.notify_systemd);

    scheduler::run(&engine, config.poll_interval(), shutdown_token, notifier).await
}
