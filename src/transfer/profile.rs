//! The rclone connection profile carrying one task's credentials.
//!
//! The file is rewritten from scratch for every task: only the task being
//! processed has a valid cookie at any time.

use std::fs::File;
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;

use super::error::TransferError;
use crate::auth::AuthResult;

pub const DEFAULT_PROFILE_PATH: &str = "sharepoint_rclone.conf";

/// Section name in the profile; the tool addresses it as `webdav:`.
pub const REMOTE_NAME: &str = "webdav";

/// rclone's `headers` option is a CSV list of alternating keys and values.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render the profile for a freshly authenticated task.
pub fn render(auth: &AuthResult) -> String {
    let cookie = format!("{}={}", auth.cookie_name(), auth.cookie_value);
    format!(
        "[{REMOTE_NAME}]\n\
         type = webdav\n\
         url = {}\n\
         vendor = other\n\
         headers = Cookie,{}\n",
        auth.webdav_endpoint,
        csv_field(&cookie),
    )
}

/// Overwrite the profile at `path` with the credentials in `auth`.
pub async fn write_profile(path: &Path, auth: &AuthResult) -> Result<(), TransferError> {
    let write_err = |source| TransferError::Write {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(path, render(auth)).await.map_err(write_err)?;
    #[cfg(unix)]
    {
        // The profile holds a live session cookie
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(path, perms)
            .await
            .map_err(write_err)?;
    }
    tracing::debug!("Wrote connection profile {}", path.display());
    Ok(())
}

/// Exclusive advisory lock on `<profile>.lock`, held for the whole run.
/// Released when dropped.
#[derive(Debug)]
pub struct ProfileLock {
    _file: File,
    path: PathBuf,
}

impl ProfileLock {
    pub fn acquire(profile: &Path) -> Result<Self, TransferError> {
        let mut lock_name = profile.as_os_str().to_owned();
        lock_name.push(".lock");
        let path = PathBuf::from(lock_name);

        let file = File::create(&path).map_err(|source| TransferError::Write {
            path: path.clone(),
            source,
        })?;
        file.try_lock_exclusive()
            .map_err(|_| TransferError::ProfileLocked {
                path: profile.to_path_buf(),
            })?;
        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(cookie: &str) -> AuthResult {
        AuthResult {
            cookie_value: cookie.to_string(),
            webdav_endpoint: "https://contoso-my.sharepoint.com/personal/alice/Documents/Shared"
                .to_string(),
        }
    }

    #[test]
    fn test_render_profile() {
        assert_eq!(
            render(&auth("77u/PD94bWw=")),
            "[webdav]\n\
             type = webdav\n\
             url = https://contoso-my.sharepoint.com/personal/alice/Documents/Shared\n\
             vendor = other\n\
             headers = Cookie,FedAuth=77u/PD94bWw=\n"
        );
    }

    #[test]
    fn test_cookie_with_comma_is_quoted() {
        let rendered = render(&auth("a,b"));
        assert!(rendered.contains("headers = Cookie,\"FedAuth=a,b\"\n"));
    }

    #[tokio::test]
    async fn test_write_overwrites_previous_task() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_PROFILE_PATH);

        write_profile(&path, &auth("first-cookie-that-is-longer"))
            .await
            .unwrap();
        write_profile(&path, &auth("second")).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("FedAuth=second\n"));
        assert!(!contents.contains("first-cookie"));
        assert_eq!(contents.matches("[webdav]").count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_profile_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.conf");
        write_profile(&path, &auth("c")).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_lock_prevents_second_holder() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join("p.conf");
        let first = ProfileLock::acquire(&profile).unwrap();
        assert!(first.path().ends_with("p.conf.lock"));
        assert!(matches!(
            ProfileLock::acquire(&profile),
            Err(TransferError::ProfileLocked { .. })
        ));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join("p.conf");
        {
            let _lock = ProfileLock::acquire(&profile).unwrap();
        }
        let _again = ProfileLock::acquire(&profile).expect("lock should be released after drop");
    }
}
