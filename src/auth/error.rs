use thiserror::Error;

/// Failure modes of the share-link handshake.
///
/// `RateLimited` and `Http` are transient and the whole handshake is retried.
/// Every other variant means this link cannot be used and the task is skipped.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("SharePoint rate limited the request (HTTP 429)")]
    RateLimited,

    #[error("Link requires a password but none was given")]
    PasswordRequired,

    #[error("Link requires a password and the given password was rejected")]
    InvalidPassword,

    #[error("Unexpected HTTP status {status} while {stage}")]
    UnexpectedStatus { status: u16, stage: &'static str },

    #[error("Link requires a password, but the password submit URL could not be found")]
    MissingSubmitUrl,

    #[error("Failed to get the FedAuth cookie from SharePoint")]
    MissingCookie,

    #[error("Can't determine WebDAV endpoint: no 'id' parameter in {url}")]
    MissingEndpointId { url: String },

    #[error("Can't determine WebDAV endpoint: no webAbsoluteUrl in the page")]
    MissingWebAbsoluteUrl,

    #[error("Invalid User-Agent header: {0}")]
    InvalidUserAgent(#[from] reqwest::header::InvalidHeaderValue),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl AuthError {
    /// Whether the handshake may succeed if started again from scratch.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::RateLimited | AuthError::Http(_) => true,
            AuthError::PasswordRequired
            | AuthError::InvalidPassword
            | AuthError::UnexpectedStatus { .. }
            | AuthError::MissingSubmitUrl
            | AuthError::MissingCookie
            | AuthError::MissingEndpointId { .. }
            | AuthError::MissingWebAbsoluteUrl
            | AuthError::InvalidUserAgent(_) => false,
        }
    }
}
