//! SharePoint share-link handshake.
//!
//! The flow is: open the link → answer the password gate if there is one →
//! read the FedAuth cookie → derive the WebDAV endpoint. Each call uses a fresh
//! [`Session`], so a retried attempt never reuses cookies from a failed one.

pub mod discovery;
pub mod error;
pub mod markers;
pub mod session;

use std::time::Duration;

use self::error::AuthError;
use self::session::{Page, Session};

pub const AUTH_COOKIE: &str = "FedAuth";

const EVENT_TARGET_FIELD: &str = "__EVENTTARGET";
const EVENT_ARGUMENT_FIELD: &str = "__EVENTARGUMENT";
const PASSWORD_FIELD: &str = "txtPassword";
const PASSWORD_SUBMIT_CONTROL: &str = "btnSubmitPassword";

/// Everything the transfer tool needs to reach the shared folder.
#[derive(Clone)]
pub struct AuthResult {
    pub cookie_value: String,
    pub webdav_endpoint: String,
}

impl AuthResult {
    pub fn cookie_name(&self) -> &'static str {
        AUTH_COOKIE
    }
}

impl std::fmt::Debug for AuthResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResult")
            .field("cookie_value", &"<redacted>")
            .field("webdav_endpoint", &self.webdav_endpoint)
            .finish()
    }
}

/// HTTP settings shared by every handshake in a run.
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            user_agent: session::DEFAULT_USER_AGENT.to_string(),
            timeout: session::REQUEST_TIMEOUT,
        }
    }
}

fn check_status(page: &Page, stage: &'static str) -> Result<(), AuthError> {
    match page.status {
        429 => Err(AuthError::RateLimited),
        status if status > 299 => Err(AuthError::UnexpectedStatus { status, stage }),
        _ => Ok(()),
    }
}

/// Resolve where the password form posts to.
///
/// The action is resolved against the gate page's own URL, so both
/// origin-relative (`/:f:/g/...`) and page-relative (`./guestaccess.aspx`)
/// forms work.
fn password_submit_url(page: &Page) -> Result<String, AuthError> {
    let action = markers::form_action(&page.body).ok_or(AuthError::MissingSubmitUrl)?;
    if action.is_empty() || !page.url.has_host() {
        return Err(AuthError::MissingSubmitUrl);
    }
    page.url
        .join(&action)
        .map(String::from)
        .map_err(|_| AuthError::MissingSubmitUrl)
}

/// Answer the password gate and return the page behind it.
async fn submit_password(session: &Session, gate: &Page, password: &str) -> Result<Page, AuthError> {
    let submit_url = password_submit_url(gate)?;
    tracing::debug!("Password submit url: {}", submit_url);

    let mut fields = markers::hidden_fields(&gate.body);
    markers::set_field(&mut fields, EVENT_TARGET_FIELD, PASSWORD_SUBMIT_CONTROL);
    markers::set_field(&mut fields, EVENT_ARGUMENT_FIELD, "");
    markers::set_field(&mut fields, PASSWORD_FIELD, password);

    let page = session.post_form(&submit_url, &fields).await?;
    check_status(&page, "submitting the password")?;
    if markers::has_password_challenge(&page.body) {
        return Err(AuthError::InvalidPassword);
    }
    Ok(page)
}

/// Run the full handshake for one share link.
pub async fn authenticate(
    link: &str,
    password: Option<&str>,
    options: &AuthOptions,
) -> Result<AuthResult, AuthError> {
    let session = Session::new(&options.user_agent, options.timeout)?;

    let mut page = session.get(link).await?;
    check_status(&page, "opening the share link")?;

    if markers::has_password_challenge(&page.body) {
        let password = password.ok_or(AuthError::PasswordRequired)?;
        tracing::debug!("Share link is password protected, submitting password");
        page = submit_password(&session, &page, password).await?;
    }

    let cookie_value = session
        .cookie(&page.url, AUTH_COOKIE)
        .ok_or(AuthError::MissingCookie)?;

    let webdav_endpoint = discovery::webdav_endpoint(&page.url, &page.body)?;
    tracing::debug!("WebDAV endpoint: {}", webdav_endpoint);

    Ok(AuthResult {
        cookie_value,
        webdav_endpoint,
    })
}
