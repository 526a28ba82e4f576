//! sharepoint-dl: download shared SharePoint / OneDrive folders.
//!
//! Each task is a share link. The link is opened with a fresh cookie
//! session (submitting the share password when one is needed), the WebDAV
//! endpoint behind the folder is discovered, and rclone is pointed at it
//! through a generated connection profile to copy the folder in batches.

#![warn(clippy::all)]

mod auth;
mod cli;
mod config;
mod download;
pub mod retry;
mod runner;
mod shutdown;
mod tasks;
mod transfer;
mod types;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use transfer::profile::ProfileLock;

/// Exit status for `--strict` runs where at least one task was skipped.
const SKIPPED_EXIT_CODE: i32 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let mut config = config::Config::from_cli(cli)?;
    tracing::debug!(?config, "Loaded configuration");

    let tasks = tasks::prepare_tasks(std::mem::take(&mut config.tasks))?;
    tracing::info!(
        tasks = tasks.len(),
        rclone = %config.rclone_path.display(),
        "Starting sharepoint-dl"
    );

    let lock = ProfileLock::acquire(&config.profile_path)?;
    tracing::debug!("Holding profile lock {}", lock.path().display());
    let shutdown_token = shutdown::install_signal_handler();

    let runner = runner::TaskRunner::new(
        config.transfer(),
        config.auth_options(),
        config.retry_config(),
        config.download_config(),
        shutdown_token,
    );
    let summary = runner.run(&tasks).await;

    tracing::info!(
        "Finished: {} completed, {} skipped, {} total",
        summary.completed,
        summary.skipped,
        summary.total
    );
    if summary.remaining() > 0 {
        tracing::warn!(
            "Interrupted with {} task(s) not run",
            summary.remaining()
        );
    }

    if config.strict && summary.skipped > 0 {
        std::process::exit(SKIPPED_EXIT_CODE);
    }
    Ok(())
}
