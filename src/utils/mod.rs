//! Utility functions and helpers.

pub mod http;

use std::sync::LazyLock;

use regex::{Captures, Regex};
use unicode_segmentation::UnicodeSegmentation;

/// Matches the numeric status segment of a post link.
static STATUS_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/status/(\d+)\b").expect("status pattern is valid"));

/// A single named or numeric character reference.
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);")
        .expect("entity pattern is valid")
});

/// Extract the numeric status identifier from a post link.
///
/// Returns `None` when the link has no `/status/<digits>` segment or the
/// number does not fit in a `u64`.
pub fn extract_status_id(link: &str) -> Option<u64> {
    STATUS_ID
        .captures(link)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Fill `{account}` and `{id}` in a link template.
pub fn canonical_link(template: &str, account: &str, id: u64) -> String {
    template
        .replace("{account}", account)
        .replace("{id}", &id.to_string())
}

/// Decode entities left over in a title.
///
/// Titles arrive already unescaped once by the XML reader, so anything that
/// looks like markup is literal text and is kept. Unknown entities and bare
/// ampersands are left as they are.
pub fn clean_title(raw: &str) -> String {
    let raw = raw.trim();
    if !raw.contains('&') {
        return raw.to_string();
    }
    ENTITY
        .replace_all(raw, |caps: &Captures| {
            quick_xml::escape::unescape(&caps[0])
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| caps[0].to_string())
        })
        .trim()
        .to_string()
}

/// Cut text to at most `max` user-perceived characters.
pub fn truncate_graphemes(text: &str, max: usize) -> String {
    text.graphemes(true).take(max).collect()
}
