//! Pattern matching against the markers SharePoint embeds in its share pages.
//!
//! The pages aren't parsed as HTML. Behaviour depends on the exact marker
//! text, so each extractor looks for one fixed shape.

use std::sync::LazyLock;

use regex::Regex;

const PASSWORD_MARKERS: &[&str] = &[
    "You've received a link to a folder that requires a password",
    r#"input id="txtPassword""#,
    r#"input name="txtPassword""#,
];

// The `regex` crate has no backreferences, so `id` is captured separately and
// compared to `name` by the caller.
static HIDDEN_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<input type="hidden" name="([^"]*)" id="([^"]*)" value="([^"]*)" />"#)
        .expect("valid hidden input regex")
});

static FORM_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"action="([^"]*)""#).expect("valid form action regex"));

static WEB_ABSOLUTE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""webAbsoluteUrl":"([^"]+)""#).expect("valid webAbsoluteUrl regex")
});

/// Whether the page is the password gate rather than the folder itself.
pub fn has_password_challenge(body: &str) -> bool {
    PASSWORD_MARKERS.iter().any(|marker| body.contains(marker))
}

/// Collect hidden form fields whose `name` and `id` agree, in page order.
/// A later field with the same name overwrites the earlier value in place.
pub fn hidden_fields(body: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for caps in HIDDEN_INPUT.captures_iter(body) {
        let (name, id, value) = (&caps[1], &caps[2], &caps[3]);
        if name != id {
            continue;
        }
        set_field(&mut fields, name, value);
    }
    fields
}

/// Insert or overwrite a form field, keeping the position of the first insert.
pub fn set_field(fields: &mut Vec<(String, String)>, name: &str, value: &str) {
    match fields.iter_mut().find(|(n, _)| n == name) {
        Some(existing) => existing.1 = value.to_string(),
        None => fields.push((name.to_string(), value.to_string())),
    }
}

/// First `action="..."` attribute, with `&amp;` decoded.
pub fn form_action(body: &str) -> Option<String> {
    FORM_ACTION
        .captures(body)
        .map(|caps| caps[1].replace("&amp;", "&"))
}

/// The site root SharePoint embeds in its page context JSON.
pub fn web_absolute_url(body: &str) -> Option<&str> {
    WEB_ABSOLUTE_URL
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
