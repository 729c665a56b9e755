//! Flat-file feed/item store.
//!
//! Three files back a [`Store`]:
//!
//! ```text
//! ctr.csv    next feed id, plain decimal
//! feeds.csv  id,host,feed_url,last_checked,last_updated   (snapshot on change)
//! items.csv  feed_id,title,link,added                     (append, snapshot on cascade)
//! ```
//!
//! The files are loaded once into a [`Mirror`] which answers every read.
//! Writes first append the new rows or snapshot the whole file and only
//! then update the mirror, so a failed write leaves the mirror matching
//! what is on disk.  One [`RwLock`] guards the mirror and all file
//! I/O: mutating calls hold it exclusively, reads share it.
//!
//! Every call takes a [`Cancel`].  Cancellation is honoured only until the
//! lock is acquired.

mod cancel;
mod codec;
mod counter;
mod file;
mod mirror;
mod model;

pub use cancel::Cancel;
pub use model::{Feed, FeedId, Item, ItemWithHost, NewItem};

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use csv::StringRecord;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use codec::{decode_feed, decode_item, encode_feed, encode_item};
use counter::Counter;
use file::RecordFile;
use mirror::Mirror;

/// Locations of the three store files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub counter: PathBuf,
    pub feeds: PathBuf,
    pub items: PathBuf,
}

impl StorePaths {
    /// The default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            counter: dir.join("ctr.csv"),
            feeds: dir.join("feeds.csv"),
            items: dir.join("items.csv"),
        }
    }
}

/// Source of "now" for `last_checked` / `last_updated`.
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct Disk {
    counter: Counter,
    feeds: RecordFile,
    items: RecordFile,
}

impl Disk {
    fn snapshot_feeds(&mut self, feeds: &[Feed]) -> Result<()> {
        let records: Vec<StringRecord> = feeds.iter().map(encode_feed).collect();
        self.feeds.snapshot(&records)
    }

    fn snapshot_items(&mut self, items: &[Item]) -> Result<()> {
        let records: Vec<StringRecord> = items.iter().map(encode_item).collect();
        self.items.snapshot(&records)
    }
}

struct Inner {
    /// `None` once the store is closed.
    disk: Option<Disk>,
    mirror: Mirror,
}

impl Inner {
    fn open_mut(&mut self) -> Result<(&mut Disk, &mut Mirror)> {
        match self.disk.as_mut() {
            Some(disk) => Ok((disk, &mut self.mirror)),
            None => Err(Error::Closed),
        }
    }

    fn mirror(&self) -> Result<&Mirror> {
        if self.disk.is_none() {
            return Err(Error::Closed);
        }
        Ok(&self.mirror)
    }
}

pub struct Store {
    inner: RwLock<Inner>,
    clock: Clock,
}

impl Store {
    /// Open (or create) the store files and load them into memory.
    ///
    /// Any malformed row fails the whole open; files opened so far are
    /// released on the way out.
    pub fn open(paths: &StorePaths) -> Result<Self> {
        let mut counter = Counter::open(&paths.counter)?;
        let mut feeds_file = RecordFile::open(&paths.feeds)?;
        let mut items_file = RecordFile::open(&paths.items)?;

        let feeds = feeds_file
            .read_records()?
            .iter()
            .map(|r| decode_feed(feeds_file.path(), r))
            .collect::<Result<Vec<_>>>()?;
        let items = items_file
            .read_records()?
            .iter()
            .map(|r| decode_item(items_file.path(), r))
            .collect::<Result<Vec<_>>>()?;

        let mirror = Mirror::new(feeds, items);

        if let Some(max) = mirror.max_feed_id() {
            let next = max.saturating_add(1);
            if counter.raise_to(next)? {
                warn!(
                    counter = %counter.path().display(),
                    next,
                    "counter was behind the stored feed ids, raised"
                );
            }
        }
        let orphans = mirror
            .items()
            .iter()
            .filter(|i| mirror.feed(i.feed_id).is_none())
            .count();
        if orphans > 0 {
            warn!(orphans, "items reference feeds that are not stored");
        }

        info!(
            feeds = mirror.feeds().len(),
            items = mirror.items().len(),
            "opened store"
        );

        Ok(Self {
            inner: RwLock::new(Inner {
                disk: Some(Disk {
                    counter,
                    feeds: feeds_file,
                    items: items_file,
                }),
                mirror,
            }),
            clock: Box::new(Utc::now),
        })
    }

    /// Replace the clock used to stamp feeds on ingest.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Sync and release the three files.
    ///
    /// Every file is closed even if an earlier one fails; the first failure
    /// is returned.  All later calls fail with [`Error::Closed`].
    pub fn close(&self) -> Result<()> {
        let disk = self.inner.write().disk.take().ok_or(Error::Closed)?;
        let results = [
            disk.counter.close(),
            disk.feeds.close(),
            disk.items.close(),
        ];
        info!("closed store");
        results.into_iter().find_map(|r| r.err()).map_or(Ok(()), Err)
    }

    /// Subscribe to a feed.  Fails with [`Error::Conflict`] if `feed_url` is
    /// already stored.
    pub fn add_feed(&self, cancel: &Cancel, host: &str, feed_url: &str) -> Result<FeedId> {
        let mut inner = cancel.write(&self.inner)?;
        let (disk, mirror) = inner.open_mut()?;

        if mirror.has_feed_url(feed_url) {
            return Err(Error::Conflict(format!(
                "feed {feed_url} already exists in the store"
            )));
        }

        let id = disk.counter.allocate()?;
        let feed = Feed {
            id,
            host: host.to_string(),
            feed_url: feed_url.to_string(),
            last_checked: None,
            last_updated: None,
        };
        disk.feeds.append(&[encode_feed(&feed)])?;
        mirror.push_feed(feed);

        info!(id, host, feed_url, "added feed");
        Ok(id)
    }

    /// Ingest a batch of candidate items for `feed_id`.
    ///
    /// Candidates whose link is already stored (under any feed) are dropped.
    /// The feed's `last_checked` is set to now in every case, its
    /// `last_updated` only when something was stored.  Returns the items
    /// that were actually stored.
    pub fn add_items(
        &self,
        cancel: &Cancel,
        feed_id: FeedId,
        candidates: Vec<NewItem>,
    ) -> Result<Vec<Item>> {
        let mut inner = cancel.write(&self.inner)?;
        let (disk, mirror) = inner.open_mut()?;

        if mirror.feed(feed_id).is_none() {
            return Err(Error::NotFound(format!("unknown feed id {feed_id}")));
        }

        let now = (self.clock)();
        let offered = candidates.len();
        let fresh = mirror.fresh_items(feed_id, candidates);

        if !fresh.is_empty() {
            let records: Vec<StringRecord> = fresh.iter().map(encode_item).collect();
            disk.items.append(&records)?;
            mirror.push_items(fresh.clone());
        }
        // New rows are already appended, so the mirror keeps them even if
        // the feed snapshot below fails.
        let feeds = mirror
            .touched_feeds(feed_id, now, !fresh.is_empty())
            .ok_or_else(|| Error::NotFound(format!("unknown feed id {feed_id}")))?;
        disk.snapshot_feeds(&feeds)?;
        mirror.set_feeds(feeds);

        debug!(feed_id, offered, added = fresh.len(), "ingested items");
        Ok(fresh)
    }

    /// All feeds, most recently updated first.
    pub fn all_feeds(&self, cancel: &Cancel) -> Result<Vec<Feed>> {
        let inner = cancel.read(&self.inner)?;
        Ok(inner.mirror()?.feeds().to_vec())
    }

    pub fn feed(&self, cancel: &Cancel, id: FeedId) -> Result<Feed> {
        let inner = cancel.read(&self.inner)?;
        inner
            .mirror()?
            .feed(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("unknown feed id {id}")))
    }

    /// Relabel a feed.
    pub fn edit_feed_host(&self, cancel: &Cancel, id: FeedId, host: &str) -> Result<()> {
        let mut inner = cancel.write(&self.inner)?;
        let (disk, mirror) = inner.open_mut()?;

        let feeds = mirror
            .relabelled_feeds(id, host)
            .ok_or_else(|| Error::NotFound(format!("unknown feed id {id}")))?;
        disk.snapshot_feeds(&feeds)?;
        mirror.set_feeds(feeds);

        info!(id, host, "renamed feed");
        Ok(())
    }

    pub fn item_count(&self, cancel: &Cancel) -> Result<usize> {
        let inner = cancel.read(&self.inner)?;
        Ok(inner.mirror()?.items().len())
    }

    /// A page of the newest items, each with its feed's host.
    ///
    /// Fails with [`Error::NotFound`] when `offset` is at or past the end.
    pub fn newest(&self, cancel: &Cancel, offset: usize, limit: usize) -> Result<Vec<ItemWithHost>> {
        let inner = cancel.read(&self.inner)?;
        inner.mirror()?.newest(offset, limit)
    }

    /// Unsubscribe from a feed and delete all of its items.
    pub fn remove_feed(&self, cancel: &Cancel, id: FeedId) -> Result<()> {
        let mut inner = cancel.write(&self.inner)?;
        let (disk, mirror) = inner.open_mut()?;

        let feeds = mirror
            .feeds_without(id)
            .ok_or_else(|| Error::NotFound(format!("unknown feed id {id}")))?;

        // Items go first so that a failed write never leaves items on disk
        // whose feed is already gone.
        let items = mirror.items_without(id);
        disk.snapshot_items(&items)?;
        let removed = mirror.set_items(items);
        disk.snapshot_feeds(&feeds)?;
        mirror.set_feeds(feeds);

        info!(id, removed_items = removed, "removed feed");
        Ok(())
    }
}
