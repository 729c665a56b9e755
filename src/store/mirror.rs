//! The in-memory working set of the store.
//!
//! Both collections stay sorted (see [`sort_feeds`] / [`sort_items`]).
//! Changes that end in a file snapshot are staged: a method returns the new
//! list, the caller writes it, and only then installs it with
//! [`Mirror::set_feeds`] / [`Mirror::set_items`].  Nothing here touches the
//! disk.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::model::{sort_feeds, sort_items, Feed, FeedId, Item, ItemWithHost, NewItem};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct Mirror {
    feeds: Vec<Feed>,
    items: Vec<Item>,
}

impl Mirror {
    /// Build a mirror from loaded records, establishing both orderings.
    pub fn new(mut feeds: Vec<Feed>, mut items: Vec<Item>) -> Self {
        sort_feeds(&mut feeds);
        sort_items(&mut items);
        Self { feeds, items }
    }

    pub fn feeds(&self) -> &[Feed] {
        &self.feeds
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn feed(&self, id: FeedId) -> Option<&Feed> {
        self.feeds.iter().find(|f| f.id == id)
    }

    pub fn has_feed_url(&self, feed_url: &str) -> bool {
        self.feeds.iter().any(|f| f.feed_url == feed_url)
    }

    pub fn max_feed_id(&self) -> Option<FeedId> {
        self.feeds.iter().map(|f| f.id).max()
    }

    pub fn push_feed(&mut self, feed: Feed) {
        self.feeds.push(feed);
        sort_feeds(&mut self.feeds);
    }

    /// Candidates whose link is not yet stored, assigned to `feed_id`.
    ///
    /// Links are unique store-wide, so a link seen under any feed (or
    /// earlier in the same batch) is dropped.
    pub fn fresh_items(&self, feed_id: FeedId, candidates: Vec<NewItem>) -> Vec<Item> {
        let stored: HashSet<&str> = self.items.iter().map(|i| i.link.as_str()).collect();
        let mut batch: HashSet<String> = HashSet::new();
        candidates
            .into_iter()
            .filter(|c| !stored.contains(c.link.as_str()) && batch.insert(c.link.clone()))
            .map(|c| c.into_item(feed_id))
            .collect()
    }

    pub fn push_items(&mut self, items: Vec<Item>) {
        if items.is_empty() {
            return;
        }
        self.items.extend(items);
        sort_items(&mut self.items);
    }

    /// The feed list after a poll of `id`: `last_checked` moves to `now`,
    /// `last_updated` only when new items were stored.  `None` if `id` is
    /// unknown.  The mirror itself is left untouched.
    pub fn touched_feeds(&self, id: FeedId, now: DateTime<Utc>, updated: bool) -> Option<Vec<Feed>> {
        let mut feeds = self.feeds.clone();
        let feed = feeds.iter_mut().find(|f| f.id == id)?;
        feed.last_checked = Some(now);
        if updated {
            feed.last_updated = Some(now);
        }
        sort_feeds(&mut feeds);
        Some(feeds)
    }

    /// The feed list with `id` relabelled, or `None` if `id` is unknown.
    pub fn relabelled_feeds(&self, id: FeedId, host: &str) -> Option<Vec<Feed>> {
        let mut feeds = self.feeds.clone();
        feeds.iter_mut().find(|f| f.id == id)?.host = host.to_string();
        Some(feeds)
    }

    /// The feed list without `id`, or `None` if `id` is unknown.
    pub fn feeds_without(&self, id: FeedId) -> Option<Vec<Feed>> {
        let idx = self.feeds.iter().position(|f| f.id == id)?;
        let mut feeds = self.feeds.clone();
        feeds.remove(idx);
        Some(feeds)
    }

    /// The item list without anything owned by `feed_id`.
    pub fn items_without(&self, feed_id: FeedId) -> Vec<Item> {
        self.items
            .iter()
            .filter(|i| i.feed_id != feed_id)
            .cloned()
            .collect()
    }

    /// Install a feed list built by one of the methods above, once it is
    /// on disk.
    pub fn set_feeds(&mut self, feeds: Vec<Feed>) {
        self.feeds = feeds;
    }

    /// Install an item list, returning how many items went away.
    pub fn set_items(&mut self, items: Vec<Item>) -> usize {
        let before = self.items.len();
        self.items = items;
        before.saturating_sub(self.items.len())
    }

    /// Up to `limit` items starting at `offset`, joined with their host.
    pub fn newest(&self, offset: usize, limit: usize) -> Result<Vec<ItemWithHost>> {
        let count = self.items.len();
        if offset >= count {
            return Err(Error::NotFound(format!(
                "offset {offset} is past the last item ({count} stored)"
            )));
        }
        let end = offset.saturating_add(limit).min(count);

        let hosts: HashMap<FeedId, &str> =
            self.feeds.iter().map(|f| (f.id, f.host.as_str())).collect();

        self.items[offset..end]
            .iter()
            .map(|item| {
                let host = hosts.get(&item.feed_id).ok_or_else(|| {
                    Error::Inconsistent(format!(
                        "item {:?} references unknown feed id {}",
                        item.link, item.feed_id
                    ))
                })?;
                Ok(ItemWithHost {
                    item: item.clone(),
                    host: host.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap()
    }

    fn feed(id: FeedId) -> Feed {
        Feed {
            id,
            host: format!("host{id}"),
            feed_url: format!("url{id}"),
            last_checked: None,
            last_updated: None,
        }
    }

    fn item(feed_id: FeedId, link: &str, day: u32) -> Item {
        NewItem::new(link, link, ts(day)).into_item(feed_id)
    }

    #[test]
    fn fresh_items_drop_links_stored_under_any_feed() {
        let m = Mirror::new(vec![feed(1), feed(2)], vec![item(2, "shared", 1)]);
        let fresh = m.fresh_items(
            1,
            vec![NewItem::new("a", "shared", ts(2)), NewItem::new("b", "own", ts(3))],
        );
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].link, "own");
        assert_eq!(fresh[0].feed_id, 1);
    }

    #[test]
    fn fresh_items_drop_duplicates_within_the_batch() {
        let m = Mirror::new(vec![feed(1)], vec![]);
        let fresh = m.fresh_items(
            1,
            vec![NewItem::new("a", "l", ts(1)), NewItem::new("b", "l", ts(2))],
        );
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].title, "a");
    }

    #[test]
    fn touched_feeds_reorder_without_mutating() {
        let mut m = Mirror::new(vec![feed(1), feed(2)], vec![]);
        let feeds = m.touched_feeds(2, ts(5), true).unwrap();
        assert_eq!(feeds[0].id, 2);
        assert_eq!(m.feeds()[0].id, 1, "mirror unchanged until installed");
        m.set_feeds(feeds);

        let feeds = m.touched_feeds(1, ts(6), false).unwrap();
        assert_eq!(feeds[0].id, 2, "checked-only feed does not move up");
        m.set_feeds(feeds);
        assert_eq!(m.feed(1).unwrap().last_checked, Some(ts(6)));
        assert!(m.touched_feeds(9, ts(6), true).is_none());
    }

    #[test]
    fn relabelled_feeds_change_only_the_host() {
        let m = Mirror::new(vec![feed(1), feed(2)], vec![]);
        let feeds = m.relabelled_feeds(2, "new").unwrap();
        assert_eq!(feeds[1].host, "new");
        assert_eq!(m.feed(2).unwrap().host, "host2");
        assert!(m.relabelled_feeds(3, "x").is_none());
    }

    #[test]
    fn removal_keeps_order_of_the_rest() {
        let mut m = Mirror::new(
            vec![feed(1), feed(2), feed(3), feed(4)],
            vec![item(3, "a", 1), item(1, "b", 2), item(3, "c", 3)],
        );
        let feeds = m.feeds_without(2).unwrap();
        let ids: Vec<_> = feeds.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert!(m.feeds_without(9).is_none());

        let items = m.items_without(3);
        assert_eq!(m.set_items(items), 2);
        assert_eq!(m.items().len(), 1);
        assert_eq!(m.items()[0].link, "b");
    }

    #[test]
    fn newest_joins_hosts_and_clamps() {
        let m = Mirror::new(
            vec![feed(1), feed(2)],
            vec![item(1, "a", 1), item(2, "b", 2), item(1, "c", 3)],
        );
        let page = m.newest(1, 10).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].item.link, "b");
        assert_eq!(page[0].host, "host2");
        assert_eq!(page[1].host, "host1");

        assert!(m.newest(3, 1).unwrap_err().is_not_found());
        assert_eq!(m.newest(0, usize::MAX).unwrap().len(), 3);
        assert!(m.newest(0, 0).unwrap().is_empty());
    }

    #[test]
    fn newest_reports_dangling_feed_reference() {
        let m = Mirror::new(vec![feed(1)], vec![item(7, "orphan", 1)]);
        assert!(matches!(m.newest(0, 1), Err(Error::Inconsistent(_))));
    }
}
