//! Record types held by the store.
//!
//! [`Feed`] and [`Item`] are what gets persisted; [`NewItem`] is what a
//! data source hands to [`Store::add_items`](super::Store::add_items) and
//! [`ItemWithHost`] is the joined row returned by
//! [`Store::newest`](super::Store::newest).
//!
//! ## Ordering
//!
//! Both collections are kept **reverse-chronological**: feeds by
//! `last_updated`, items by `added`.  A feed that never received items has
//! no `last_updated` and sorts after every dated feed.  The sorts are
//! stable, so equal timestamps keep their previous relative order.

use chrono::{DateTime, Utc};

/// Feed identifier handed out by the counter.
pub type FeedId = u64;

/// A subscribed feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: FeedId,
    /// Human-readable label, shown next to every item of this feed.
    pub host: String,
    /// Address the feed is fetched from.  Unique across the store.
    pub feed_url: String,
    /// Last time the poller ingested this feed, new items or not.
    pub last_checked: Option<DateTime<Utc>>,
    /// Last time at least one new item was stored for this feed.
    pub last_updated: Option<DateTime<Utc>>,
}

/// A stored feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub feed_id: FeedId,
    pub title: String,
    /// Link to the full content.  Unique across the whole store.
    pub link: String,
    pub added: DateTime<Utc>,
}

/// A candidate item, before it is assigned to a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub link: String,
    pub added: DateTime<Utc>,
}

impl NewItem {
    pub fn new(title: impl Into<String>, link: impl Into<String>, added: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            added,
        }
    }

    pub(crate) fn into_item(self, feed_id: FeedId) -> Item {
        Item {
            feed_id,
            title: self.title,
            link: self.link,
            added: self.added,
        }
    }
}

/// An item joined with the host label of its feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemWithHost {
    pub item: Item,
    pub host: String,
}

/// Sort feeds newest-updated first; feeds without `last_updated` go last.
pub fn sort_feeds(feeds: &mut [Feed]) {
    // `None < Some(_)`, so comparing `b` against `a` sinks undated feeds.
    feeds.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
}

/// Sort items newest-added first.
pub fn sort_items(items: &mut [Item]) {
    items.sort_by(|a, b| b.added.cmp(&a.added));
}
