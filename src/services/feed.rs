// src/services/feed.rs

//! RSS feed parsing and entry normalization.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{AppError, Result};
use crate::models::{Entry, FeedItem};
use crate::utils::clean_title;

/// Item child elements we keep.
#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    PubDate,
    Description,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"pubDate" => Some(Self::PubDate),
            b"description" => Some(Self::Description),
            _ => None,
        }
    }

    fn slot(self, item: &mut FeedItem) -> &mut String {
        match self {
            Self::Title => &mut item.title,
            Self::Link => &mut item.link,
            Self::PubDate => &mut item.pub_date,
            Self::Description => &mut item.description,
        }
    }
}

/// Parse an RSS 2.0 document into raw items, in source order.
///
/// Only `<item>` elements under a `<channel>` are read. A well-formed
/// document without a channel yields no items.
pub fn parse_items(document: &str) -> Result<Vec<FeedItem>> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut channel_depth: Option<usize> = None;
    let mut item_depth: Option<usize> = None;
    let mut current: Option<FeedItem> = None;
    let mut field: Option<Field> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let local = e.local_name();
                let name = local.as_ref();

                match (channel_depth, item_depth) {
                    (None, _) if name == b"channel" => channel_depth = Some(depth),
                    (Some(_), None) if name == b"item" => {
                        item_depth = Some(depth);
                        current = Some(FeedItem::default());
                    }
                    (Some(_), Some(at)) if depth == at + 1 => field = Field::from_name(name),
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let in_channel = channel_depth.is_some() && item_depth.is_none();
                if in_channel && e.local_name().as_ref() == b"item" {
                    items.push(FeedItem::default());
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some(f), Some(item)) = (field, current.as_mut()) {
                    let text = e.unescape().map_err(AppError::feed)?;
                    f.slot(item).push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(f), Some(item)) = (field, current.as_mut()) {
                    f.slot(item).push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if item_depth == Some(depth) {
                    if let Some(item) = current.take() {
                        items.push(item);
                    }
                    item_depth = None;
                    field = None;
                } else if item_depth.is_some_and(|at| depth == at + 1) {
                    field = None;
                } else if channel_depth == Some(depth) {
                    channel_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(AppError::feed(e)),
            _ => {}
        }
    }

    for item in &mut items {
        item.title = item.title.trim().to_string();
        item.link = item.link.trim().to_string();
        item.pub_date = item.pub_date.trim().to_string();
        item.description = item.description.trim().to_string();
    }

    Ok(items)
}

/// Turn a fetched document into entries, oldest first.
///
/// Unparseable documents produce no entries, the same as an unreachable feed.
pub fn normalize(document: &str) -> Vec<Entry> {
    let items = match parse_items(document) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("Discarding unparseable feed document: {}", e);
            return Vec::new();
        }
    };

    let mut entries: Vec<Entry> = items
        .into_iter()
        .map(|item| {
            let title = clean_title(&item.title);
            Entry::from_item(item, title)
        })
        .collect();

    // Mirrors usually serve newest first; never rely on it.
    entries.sort_by(|a, b| a.published.cmp(&b.published).then(a.id.cmp(&b.id)));
    entries
}
