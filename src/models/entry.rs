//! Feed entry data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::extract_status_id;

/// One `<item>` as it appears in the feed, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub description: String,
}

/// A normalized feed entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    /// Status identifier taken from the link, if the link carries one
    pub id: Option<u64>,

    /// Cleaned title text
    pub title: String,

    /// Link as served by the mirror
    pub link: String,

    /// Publication date as served by the mirror
    pub published_at: String,

    /// Parsed publication date
    #[serde(skip)]
    pub published: Option<DateTime<Utc>>,
}

impl Entry {
    /// Build an entry from a raw item, deriving its identifier and timestamp.
    pub fn from_item(item: FeedItem, title: String) -> Self {
        let published = parse_pub_date(&item.pub_date);
        Self {
            id: extract_status_id(&item.link),
            title,
            link: item.link,
            published_at: item.pub_date,
            published,
        }
    }
}

/// An entry known to carry an identifier newer than the account's watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub id: u64,
    pub entry: Entry,
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub id: u64,
    pub delivered: bool,
}

/// Parse an RSS `pubDate` (RFC 2822), accepting RFC 3339 as well.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
