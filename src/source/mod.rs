//! Feed fetching.
//!
//! This module defines the [`DataSource`] trait through which the poller
//! and the `add` command turn a feed address into candidate
//! [`NewItem`]s.  The store never does network or XML work itself.
//!
//! ## Adding a new source
//!
//! 1. Create a new file in this directory (e.g. `jsonfeed.rs`).
//! 2. Define a struct (e.g. `JsonFeedSource`) and implement [`DataSource`] for it.
//! 3. Add the module below and re-export your struct in the `pub use` block.
//! 4. Construct it in `main.rs` in place of (or alongside) [`RssSource`].

mod atom;
mod rss;

pub use self::rss::RssSource;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;

use crate::store::NewItem;

/// Something that can fetch and parse a feed.
///
/// The poller calls [`fetch()`](DataSource::fetch) from a background
/// thread, so implementations must be [`Send`] and [`Sync`].
pub trait DataSource: Send + Sync {
    /// Short label used in logs and status messages.
    fn name(&self) -> &str;

    /// Download the feed at `url` and return its entries.
    ///
    /// Entries that cannot be stored (no link, no usable date) are left
    /// out rather than failing the whole fetch.
    fn fetch(&self, url: &str) -> Result<Vec<NewItem>>;
}

/// Default host label for a feed: `scheme://host[:port]`.
pub fn host_label(feed_url: &str) -> Result<String> {
    let url = Url::parse(feed_url).with_context(|| format!("invalid feed URL {feed_url:?}"))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("feed URL {feed_url:?} has no host"))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}
