//! The task loop: one task at a time, in list order.
//!
//! Each attempt runs the handshake, rewrites the connection profile, and
//! drives the download pipeline. Failures are sorted by
//! [`TaskError::retry_action`]: retried tasks restart from the handshake
//! after the retry wait, skipped tasks are counted and left behind.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::{self, AuthOptions};
use crate::download::error::TaskError;
use crate::download::{self, DownloadConfig, TaskReport};
use crate::retry::{self, RetryAction, RetryConfig, RetryError};
use crate::tasks::Task;
use crate::transfer::Transfer;
use crate::transfer::profile;

/// Counters for a finished (or interrupted) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub skipped: usize,
}

impl RunSummary {
    /// Tasks never reached because the run was interrupted.
    pub fn remaining(&self) -> usize {
        self.total - self.completed - self.skipped
    }
}

/// Everything the runner needs besides the task list.
pub struct TaskRunner {
    transfer: Arc<dyn Transfer>,
    auth: AuthOptions,
    retry: RetryConfig,
    download: DownloadConfig,
    shutdown: CancellationToken,
}

impl TaskRunner {
    pub fn new(
        transfer: Arc<dyn Transfer>,
        auth: AuthOptions,
        retry: RetryConfig,
        download: DownloadConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transfer,
            auth,
            retry,
            download,
            shutdown,
        }
    }

    /// One attempt at a task, from a fresh session to the last batch.
    async fn attempt(&self, task: &Task) -> Result<TaskReport, TaskError> {
        let auth_result = auth::authenticate(&task.link, task.password.as_deref(), &self.auth).await?;
        profile::write_profile(&self.download.profile_path, &auth_result).await?;
        download::download_task(
            self.transfer.as_ref(),
            &task.download_to,
            &self.download,
            &self.shutdown,
        )
        .await
    }

    /// Log why an attempt failed and decide whether to go again.
    fn classify(&self, err: &TaskError) -> RetryAction {
        let action = err.retry_action();
        match (action, err) {
            (RetryAction::Retry, e) if e.is_rate_limit() => {
                tracing::info!("Link given is currently rate limited.")
            }
            (RetryAction::Retry, e) => {
                tracing::info!("Encountered an unknown error while running task: {}", e)
            }
            (RetryAction::Abort, _) => {}
        }
        action
    }

    /// Run every task in order and return the counters.
    pub async fn run(&self, tasks: &[Task]) -> RunSummary {
        let mut summary = RunSummary {
            total: tasks.len(),
            ..RunSummary::default()
        };

        for (index, task) in tasks.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                tracing::info!("Shutdown requested, not starting task {}", index + 1);
                break;
            }
            tracing::info!("Running task {}/{}", index + 1, tasks.len());

            let outcome = retry::retry_with_wait(
                &self.retry,
                &self.shutdown,
                |e| self.classify(e),
                || self.attempt(task),
            )
            .await;

            match outcome {
                Ok(report) => {
                    if report.failed_batches > 0 {
                        tracing::warn!(
                            "{} of {} batches failed for task {}",
                            report.failed_batches,
                            report.batches,
                            index + 1
                        );
                    }
                    tracing::info!(
                        "Download completed for task {}: {} of {} listed files scheduled",
                        index + 1,
                        report.files_scheduled,
                        report.files_listed
                    );
                    summary.completed += 1;
                }
                Err(RetryError::Aborted(e)) if e.is_cancelled() => {
                    tracing::info!("Shutdown requested during task {}", index + 1);
                    break;
                }
                Err(RetryError::Aborted(e)) => {
                    log_skip(&e);
                    summary.skipped += 1;
                }
                Err(RetryError::Exhausted { attempts, last }) => {
                    tracing::warn!(
                        "Giving up on task {} after {} attempts: {}",
                        index + 1,
                        attempts,
                        last
                    );
                    summary.skipped += 1;
                }
                Err(RetryError::Cancelled(e)) => {
                    tracing::info!("Shutdown requested while retrying task {}: {}", index + 1, e);
                    break;
                }
            }
        }

        summary
    }
}

fn log_skip(err: &TaskError) {
    use crate::auth::error::AuthError;
    match err {
        TaskError::Auth(AuthError::PasswordRequired) => {
            tracing::info!("Password is required but no password is given, skip to next task.")
        }
        TaskError::Auth(AuthError::InvalidPassword) => tracing::info!(
            "Password is required and the password given is invalid, skip to next task."
        ),
        other => {
            tracing::info!("Downloader encountered a problem that can't be solved: {}", other);
            tracing::info!("Skip to next task.");
        }
    }
}
