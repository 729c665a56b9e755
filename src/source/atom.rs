//! Atom entries.
//!
//! Fetching is shared with [`RssSource`](super::RssSource), which tries
//! Atom before RSS; this module only turns a parsed
//! [`atom_syndication::Feed`] into candidate items.

use atom_syndication::{Entry, Feed, Link};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::store::NewItem;

/// Candidate items for every entry that has a link and a date.
pub fn parse_feed(feed: &Feed) -> Vec<NewItem> {
    feed.entries()
        .iter()
        .filter_map(|entry| {
            let title = match entry.title().value.trim() {
                "" => "(untitled)",
                t => t,
            };
            let Some(link) = entry_link(entry) else {
                debug!(title, "skipping entry without a link");
                return None;
            };
            let Some(added) = entry_date(entry) else {
                debug!(title, link, "skipping entry without a date");
                return None;
            };
            Some(NewItem::new(title, link, added))
        })
        .collect()
}

/// The `alternate` link, else the first link with an address.
fn entry_link(entry: &Entry) -> Option<&str> {
    let links = entry.links();
    links
        .iter()
        .find(|l| l.rel() == "alternate" && !l.href().is_empty())
        .or_else(|| links.iter().find(|l| !l.href().is_empty()))
        .map(Link::href)
}

/// `updated`, falling back to `published`.
///
/// A missing `<updated>` reads back as the Unix epoch.
fn entry_date(entry: &Entry) -> Option<DateTime<Utc>> {
    let updated = entry.updated().with_timezone(&Utc);
    if updated.timestamp() != 0 {
        return Some(updated);
    }
    entry.published().map(|p| p.with_timezone(&Utc))
}
