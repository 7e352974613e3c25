//! Watermark filtering.
//!
//! Decides which normalized entries have not been delivered yet.

use std::collections::HashSet;

use crate::models::{Entry, NewEntry};

/// Entries strictly newer than `watermark`, oldest first.
///
/// With no watermark every identified entry is new. Entries without an
/// identifier cannot be deduplicated and are dropped, as are repeats of an
/// identifier already seen. The result is ordered by identifier, which is
/// chronological for the sources this relays.
pub fn filter_new(entries: Vec<Entry>, watermark: Option<u64>) -> Vec<NewEntry> {
    let mut seen = HashSet::new();
    let mut fresh: Vec<NewEntry> = entries
        .into_iter()
        .filter_map(|entry| {
            let Some(id) = entry.id else {
                log::debug!("Dropping entry without status id: {}", entry.link);
                return None;
            };
            let newer = watermark.is_none_or(|last| id > last);
            (newer && seen.insert(id)).then_some(NewEntry { id, entry })
        })
        .collect();

    fresh.sort_by_key(|e| e.id);
    fresh
}
