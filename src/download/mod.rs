//! Per-task download pipeline: list the remote folder, plan batches, and hand
//! each batch to the transfer tool.
//!
//! A batch that the tool reports as failed is logged, followed by the retry
//! wait, and then the next batch runs. Failed batches are not re-attempted.
//! Shutdown is checked before every batch; a running copy is left to finish.

pub mod batch;
pub mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use self::batch::{BATCH_SIZE, ResumePoint};
use self::error::TaskError;
use crate::retry::sleep_or_cancel;
use crate::transfer::{BatchStatus, CopyOptions, ListOptions, Transfer};

const FILES_LIST_NAME: &str = "files_list.txt";
const BATCH_LIST_NAME: &str = "batch_files.txt";

/// Subset of application config consumed by the download pipeline.
/// Decoupled from CLI parsing so the pipeline can be tested independently.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub(crate) profile_path: PathBuf,
    pub(crate) initial_file: Option<String>,
    pub(crate) file_limit: Option<usize>,
    pub(crate) batch_size: usize,
    pub(crate) transfers: u16,
    pub(crate) recursive: bool,
    pub(crate) progress: bool,
    pub(crate) batch_failure_wait: Duration,
}

impl DownloadConfig {
    pub fn new(profile_path: PathBuf) -> Self {
        Self {
            profile_path,
            initial_file: None,
            file_limit: None,
            batch_size: BATCH_SIZE,
            transfers: 4,
            recursive: false,
            progress: true,
            batch_failure_wait: Duration::from_secs(60),
        }
    }
}

/// What one task's pipeline did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub files_listed: usize,
    pub files_scheduled: usize,
    pub batches: usize,
    pub failed_batches: usize,
}

/// Read the listing the tool wrote, one name per line, blank lines dropped.
async fn read_listing(path: &Path) -> Result<Vec<String>, TaskError> {
    let contents = tokio::fs::read_to_string(path).await?;
    Ok(contents
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

async fn write_batch(path: &Path, names: &[String]) -> Result<(), TaskError> {
    let mut contents = names.join("\n");
    contents.push('\n');
    tokio::fs::write(path, contents).await?;
    Ok(())
}

/// Remove the scratch directory, logging instead of failing.
fn cleanup_scratch(scratch: tempfile::TempDir) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        tracing::debug!("Could not remove temporary files in {}: {}", path.display(), e);
    }
}

/// Download everything the connection profile currently points at into
/// `destination`.
///
/// An empty listing completes immediately with nothing transferred.
pub async fn download_task(
    transfer: &dyn Transfer,
    destination: &Path,
    config: &DownloadConfig,
    shutdown: &CancellationToken,
) -> Result<TaskReport, TaskError> {
    let scratch = tempfile::Builder::new().prefix("sharepoint-dl-").tempdir()?;
    let result = run_pipeline(transfer, destination, config, shutdown, scratch.path()).await;
    cleanup_scratch(scratch);
    result
}

async fn run_pipeline(
    transfer: &dyn Transfer,
    destination: &Path,
    config: &DownloadConfig,
    shutdown: &CancellationToken,
    scratch: &Path,
) -> Result<TaskReport, TaskError> {
    let files_list_path = scratch.join(FILES_LIST_NAME);
    let batch_list_path = scratch.join(BATCH_LIST_NAME);

    tracing::info!("Listing all available files...");
    transfer
        .list_files(
            &config.profile_path,
            &files_list_path,
            ListOptions {
                recursive: config.recursive,
            },
        )
        .await?;

    let files = read_listing(&files_list_path).await?;
    if files.is_empty() {
        tracing::info!("No files found for download");
        return Ok(TaskReport::default());
    }
    tracing::info!("Total files found: {}", files.len());

    if let Some(initial) = &config.initial_file {
        tracing::info!("Looking for initial file: {}", initial);
    }
    let plan = batch::plan_batches(
        &files,
        config.initial_file.as_deref(),
        config.file_limit,
        config.batch_size,
    );
    match &plan.resume {
        ResumePoint::Found { index } => {
            tracing::info!("Starting from file at index {}: {}", index, files[*index]);
        }
        ResumePoint::NotFound => {
            tracing::warn!(
                "Initial file '{}' not found, starting from the beginning",
                config.initial_file.as_deref().unwrap_or_default()
            );
        }
        ResumePoint::Start => {}
    }

    let files_to_download = plan.file_count();
    let copy_options = CopyOptions {
        transfers: config.transfers,
        progress: config.progress,
    };
    let mut report = TaskReport {
        files_listed: files.len(),
        files_scheduled: files_to_download,
        ..TaskReport::default()
    };

    let mut downloaded = 0usize;
    for names in &plan.batches {
        if shutdown.is_cancelled() {
            tracing::info!(
                "Shutdown requested, stopping with {}/{} files downloaded",
                downloaded,
                files_to_download
            );
            return Err(TaskError::Cancelled);
        }
        write_batch(&batch_list_path, names).await?;
        tracing::info!(
            "Downloading batch of {} files ({}-{} of {})",
            names.len(),
            downloaded + 1,
            downloaded + names.len(),
            files_to_download
        );

        let status = transfer
            .copy_batch(
                &config.profile_path,
                &batch_list_path,
                destination,
                copy_options,
            )
            .await?;
        report.batches += 1;

        if let BatchStatus::Failed { code } = status {
            report.failed_batches += 1;
            tracing::warn!(
                "rclone exited with status code {:?} which indicates an error, sleep for {} seconds",
                code,
                config.batch_failure_wait.as_secs()
            );
            sleep_or_cancel(config.batch_failure_wait, shutdown).await;
        }

        downloaded += names.len();
        tracing::info!("Progress: {}/{} files downloaded", downloaded, files_to_download);
    }

    Ok(report)
}
