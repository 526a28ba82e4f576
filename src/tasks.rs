//! Task list validation.
//!
//! Every task is checked once, before any network traffic, and its
//! destination directory is created. A single bad entry aborts startup for
//! the whole list.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Links of this shape open the file browser instead of redirecting to it,
/// so they never carry the `id` query parameter the endpoint is built from.
const DIRECT_BROWSER_FRAGMENT: &str = "onedrive.aspx";

const SHAREPOINT_DOMAIN: &str = "sharepoint.com";

/// One shared folder to mirror into a local directory.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub link: String,
    #[serde(default)]
    pub password: Option<String>,
    pub download_to: PathBuf,
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("link", &self.link)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_to", &self.download_to)
            .finish()
    }
}

/// Startup errors for the task list. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum TaskListError {
    #[error("Task list is empty")]
    Empty,

    #[error("'{link}' is not a valid URL: {source}")]
    InvalidUrl {
        link: String,
        source: url::ParseError,
    },

    #[error("'{link}' is not a sharepoint.com link")]
    NotSharePoint { link: String },

    #[error(
        "'{link}' contains 'onedrive.aspx', this link is not usable; \
         use the sharing link that redirects to it instead"
    )]
    DirectFileLink { link: String },

    #[error("Failed to create download directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn is_sharepoint_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == SHAREPOINT_DOMAIN || host.ends_with(&format!(".{SHAREPOINT_DOMAIN}"))
}

/// Check a single link without touching the filesystem.
pub fn validate_link(link: &str) -> Result<(), TaskListError> {
    let url = url::Url::parse(link).map_err(|source| TaskListError::InvalidUrl {
        link: link.to_string(),
        source,
    })?;
    if !url.host_str().is_some_and(is_sharepoint_host) {
        return Err(TaskListError::NotSharePoint {
            link: link.to_string(),
        });
    }
    if link.contains(DIRECT_BROWSER_FRAGMENT) {
        return Err(TaskListError::DirectFileLink {
            link: link.to_string(),
        });
    }
    Ok(())
}

/// Validate every task and create its destination directory.
///
/// An empty password is treated as no password at all.
pub fn prepare_tasks(tasks: Vec<Task>) -> Result<Vec<Task>, TaskListError> {
    if tasks.is_empty() {
        return Err(TaskListError::Empty);
    }

    // Links first, so a typo late in the list doesn't leave half the
    // directories created.
    for task in &tasks {
        validate_link(&task.link)?;
    }

    let mut prepared = Vec::with_capacity(tasks.len());
    for mut task in tasks {
        std::fs::create_dir_all(&task.download_to).map_err(|source| {
            TaskListError::CreateDirectory {
                path: task.download_to.clone(),
                source,
            }
        })?;
        if task.password.as_deref().is_some_and(str::is_empty) {
            task.password = None;
        }
        prepared.push(task);
    }

    tracing::debug!(count = prepared.len(), "Task list validated");
    Ok(prepared)
}
