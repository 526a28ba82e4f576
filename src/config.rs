use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use reqwest::header::HeaderValue;

use crate::auth::AuthOptions;
use crate::cli::Cli;
use crate::download::DownloadConfig;
use crate::retry::RetryConfig;
use crate::tasks::Task;
use crate::transfer::{RcloneTransfer, Transfer};

/// Application configuration, resolved from the command line and the tasks
/// file.
pub struct Config {
    pub tasks: Vec<Task>,
    pub user_agent: String,
    pub profile_path: PathBuf,
    pub rclone_path: PathBuf,
    pub initial_file: Option<String>,

    pub file_limit: Option<usize>,
    pub retry_wait_secs: u64,
    pub max_attempts: Option<u32>,
    pub transfers: u16,

    pub recursive: bool,
    pub progress: bool,
    pub strict: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("tasks", &self.tasks)
            .field("profile_path", &self.profile_path)
            .field("rclone_path", &self.rclone_path)
            .field("retry_wait_secs", &self.retry_wait_secs)
            .field("max_attempts", &self.max_attempts)
            .field("transfers", &self.transfers)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Read and decode the tasks file. Each `downloadTo` gets tilde expansion.
pub(crate) fn load_tasks(path: &Path) -> anyhow::Result<Vec<Task>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tasks file {}", path.display()))?;
    let mut tasks: Vec<Task> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse tasks file {}", path.display()))?;
    for task in &mut tasks {
        if let Some(dest) = task.download_to.to_str() {
            task.download_to = expand_tilde(dest);
        }
    }
    Ok(tasks)
}

fn resolve_rclone(explicit: Option<&str>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => {
            let path = expand_tilde(path);
            anyhow::ensure!(
                path.is_file(),
                "rclone binary not found at {}",
                path.display()
            );
            Ok(path)
        }
        None => RcloneTransfer::from_path()
            .map(|t| t.binary_path().to_path_buf())
            .context("rclone not found on PATH; install it or pass --rclone"),
    }
}

impl Config {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        HeaderValue::from_str(&cli.user_agent).context("Invalid --user-agent value")?;

        let tasks = load_tasks(&expand_tilde(&cli.tasks))?;
        let rclone_path = resolve_rclone(cli.rclone.as_deref())?;

        Ok(Self {
            tasks,
            user_agent: cli.user_agent,
            profile_path: expand_tilde(&cli.profile),
            rclone_path,
            initial_file: cli.initial_file,
            file_limit: cli.file_limit,
            retry_wait_secs: cli.retry_wait,
            max_attempts: cli.max_attempts,
            transfers: cli.transfers,
            recursive: cli.recursive,
            progress: !cli.no_progress,
            strict: cli.strict,
        })
    }

    pub fn auth_options(&self) -> AuthOptions {
        AuthOptions {
            user_agent: self.user_agent.clone(),
            ..AuthOptions::default()
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            wait_secs: self.retry_wait_secs,
            max_attempts: self.max_attempts,
        }
    }

    pub fn download_config(&self) -> DownloadConfig {
        let mut config = DownloadConfig::new(self.profile_path.clone());
        config.initial_file = self.initial_file.clone();
        config.file_limit = self.file_limit;
        config.transfers = self.transfers;
        config.recursive = self.recursive;
        config.progress = self.progress;
        config.batch_failure_wait = self.retry_config().wait();
        config
    }

    pub fn transfer(&self) -> Arc<dyn Transfer> {
        Arc::new(RcloneTransfer::new(self.rclone_path.clone()))
    }
}
