use url::Url;

use super::error::AuthError;
use super::markers;

/// Build the WebDAV endpoint from the redirected folder URL and its page.
///
/// The `id` query parameter is a server-relative folder path such as
/// `/personal/alice_contoso_com/Documents/Shared`. Its first two segments
/// name the site, which `webAbsoluteUrl` already covers, so only the rest is
/// appended.
pub fn webdav_endpoint(final_url: &Url, body: &str) -> Result<String, AuthError> {
    let id = final_url
        .query_pairs()
        .find(|(k, _)| k == "id")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| AuthError::MissingEndpointId {
            url: final_url.to_string(),
        })?;

    let web_root = markers::web_absolute_url(body).ok_or(AuthError::MissingWebAbsoluteUrl)?;

    let folder: Vec<&str> = id.split('/').skip(3).collect();
    Ok(format!("{}/{}", web_root, folder.join("/")))
}
