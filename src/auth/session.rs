use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::CookieStore;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use url::Url;

use super::error::AuthError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

/// SharePoint answers every share-page request within a few seconds; a
/// longer wait means the request is stuck.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// A page fetched by the session: where the redirects ended and what it said.
#[derive(Debug)]
pub struct Page {
    pub status: u16,
    pub url: Url,
    pub body: String,
}

impl Page {
    async fn read(response: Response) -> reqwest::Result<Self> {
        let status = response.status().as_u16();
        let url = response.url().clone();
        let body = response.text().await?;
        Ok(Self { status, url, body })
    }
}

/// HTTP session for one share-link handshake.
///
/// Cookies live only in memory and die with the session, so every attempt
/// starts from a clean jar.
pub struct Session {
    client: Client,
    cookie_jar: Arc<reqwest::cookie::Jar>,
}

impl Session {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, AuthError> {
        let cookie_jar = Arc::new(reqwest::cookie::Jar::default());

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);

        let client = Client::builder()
            .cookie_provider(cookie_jar.clone())
            .default_headers(default_headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, cookie_jar })
    }

    /// Send a GET request, following redirects.
    pub async fn get(&self, url: &str) -> reqwest::Result<Page> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Page::read(response).await
    }

    /// Send a form-encoded POST request, following redirects.
    pub async fn post_form(&self, url: &str, fields: &[(String, String)]) -> reqwest::Result<Page> {
        tracing::debug!("POST {}", url);
        let response = self.client.post(url).form(fields).send().await?;
        Page::read(response).await
    }

    /// Look up a cookie the jar would send to `url`.
    pub fn cookie(&self, url: &Url, name: &str) -> Option<String> {
        let header = self.cookie_jar.cookies(url)?;
        let header = header.to_str().ok()?;
        header.split(';').find_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k == name).then(|| v.to_string())
        })
    }
}
