use std::path::PathBuf;

use thiserror::Error;

/// Errors from driving the external transfer tool.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        source: std::io::Error,
    },

    #[error("Listing remote files failed with exit code {code:?}")]
    ListFailed { code: Option<i32> },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Connection profile {path} is in use by another sharepoint-dl process")]
    ProfileLocked { path: PathBuf },
}
