//! Driving rclone as the WebDAV transfer engine.
//!
//! rclone is run as a blocking subprocess: the only thing read back is its
//! exit status (and, for listings, its stdout). Nothing here applies a
//! timeout to the tool.

pub mod error;
pub mod profile;

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use self::error::TransferError;
use self::profile::REMOTE_NAME;

/// Outcome of one copy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Succeeded,
    Failed { code: Option<i32> },
}

/// How a remote folder is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOptions {
    pub recursive: bool,
}

/// Options for one copy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    pub transfers: u16,
    pub progress: bool,
}

/// The external tool's contract, so the task pipeline can be driven by a
/// scripted double in tests.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Write remote file names, one per line, into `output`.
    async fn list_files(
        &self,
        profile: &Path,
        output: &Path,
        options: ListOptions,
    ) -> Result<(), TransferError>;

    /// Copy the files named in `batch_file` into `destination`.
    async fn copy_batch(
        &self,
        profile: &Path,
        batch_file: &Path,
        destination: &Path,
        options: CopyOptions,
    ) -> Result<BatchStatus, TransferError>;
}

/// [`Transfer`] backed by the `rclone` binary.
#[derive(Debug, Clone)]
pub struct RcloneTransfer {
    binary_path: PathBuf,
}

impl RcloneTransfer {
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Look for `rclone` on `PATH`.
    pub fn from_path() -> Option<Self> {
        which::which("rclone").ok().map(Self::new)
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn command(&self, profile: &Path) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--config").arg(profile);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> TransferError {
        TransferError::Spawn {
            tool: self.binary_path.display().to_string(),
            source,
        }
    }
}

fn remote_root() -> String {
    format!("{REMOTE_NAME}:")
}

#[async_trait]
impl Transfer for RcloneTransfer {
    async fn list_files(
        &self,
        profile: &Path,
        output: &Path,
        options: ListOptions,
    ) -> Result<(), TransferError> {
        let file = tokio::fs::File::create(output)
            .await
            .map_err(|source| TransferError::Write {
                path: output.to_path_buf(),
                source,
            })?
            .into_std()
            .await;

        let mut cmd = self.command(profile);
        cmd.arg("lsf").arg("--files-only");
        if options.recursive {
            cmd.arg("--recursive");
        }
        cmd.arg(remote_root()).stdout(Stdio::from(file));

        let status = cmd.status().await.map_err(|e| self.spawn_error(e))?;
        if !status.success() {
            return Err(TransferError::ListFailed {
                code: status.code(),
            });
        }
        Ok(())
    }

    async fn copy_batch(
        &self,
        profile: &Path,
        batch_file: &Path,
        destination: &Path,
        options: CopyOptions,
    ) -> Result<BatchStatus, TransferError> {
        let mut cmd = self.command(profile);
        cmd.arg("copy");
        if options.progress {
            cmd.arg("--progress");
        }
        cmd.arg("--transfers")
            .arg(options.transfers.to_string())
            .arg("--files-from-raw")
            .arg(batch_file)
            .arg(remote_root())
            .arg(destination);

        let status = cmd.status().await.map_err(|e| self.spawn_error(e))?;
        if status.success() {
            Ok(BatchStatus::Succeeded)
        } else {
            Ok(BatchStatus::Failed {
                code: status.code(),
            })
        }
    }
}
