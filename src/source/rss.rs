//! HTTP feed source.
//!
//! Downloads a feed with [`reqwest`] and reads it as Atom
//! ([`super::atom`]) or, failing that, as RSS 2.0 with the [`rss`] crate.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{atom, DataSource};
use crate::store::NewItem;

/// Per-request HTTP timeout.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A data source for RSS 2.0 and Atom feeds.
pub struct RssSource {
    client: reqwest::blocking::Client,
}

impl RssSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("feeder/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }

    /// Parse a downloaded document: Atom first, then RSS.  The RSS error
    /// is reported when neither fits.
    pub fn parse_document(body: &[u8]) -> Result<Vec<NewItem>> {
        if let Ok(feed) = atom_syndication::Feed::read_from(body) {
            return Ok(atom::parse_feed(&feed));
        }
        let channel = rss::Channel::read_from(body)?;
        Ok(Self::parse_channel(&channel))
    }

    /// Parse an already-fetched [`rss::Channel`] into candidate items.
    ///
    /// This is a pure function (no I/O) so that tests can exercise the
    /// parsing logic without hitting the network.
    pub fn parse_channel(channel: &rss::Channel) -> Vec<NewItem> {
        channel
            .items()
            .iter()
            .filter_map(|item| {
                // Prefer <link>, fall back to a permalink <guid>.
                let link = item.link().map(String::from).or_else(|| {
                    item.guid()
                        .filter(|g| g.is_permalink())
                        .map(|g| g.value().to_string())
                });
                let title = item.title().unwrap_or("(untitled)");

                let Some(link) = link else {
                    debug!(title, "skipping item without a link");
                    return None;
                };
                let Some(added) = item.pub_date().and_then(parse_date) else {
                    debug!(title, link = %link, "skipping item without a valid date");
                    return None;
                };

                Some(NewItem::new(title, link, added))
            })
            .collect()
    }
}

/// Parse an RSS date: RFC 2822 as the format demands, RFC 3339 as found in
/// the wild.
fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s.trim())
        .or_else(|_| DateTime::parse_from_rfc3339(s.trim()))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl DataSource for RssSource {
    fn name(&self) -> &str {
        "rss"
    }

    fn fetch(&self, url: &str) -> Result<Vec<NewItem>> {
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|res| res.error_for_status())
            .with_context(|| format!("fetching {url}"))?
            .bytes()?;
        Self::parse_document(&body).with_context(|| format!("parsing {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn channel(xml: &str) -> rss::Channel {
        rss::Channel::read_from(xml.as_bytes()).unwrap()
    }

    #[test]
    fn parse_channel_extracts_items() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <item>
      <title>First Post</title>
      <link>https://example.com/1</link>
      <guid>guid-1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 +0000</pubDate>
      <description>First description</description>
    </item>
    <item>
      <title>Second Post</title>
      <link>https://example.com/2</link>
      <pubDate>Tue, 02 Jan 2024 12:00:00 +0200</pubDate>
    </item>
  </channel>
</rss>"#;

        let items = RssSource::parse_channel(&channel(xml));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "First Post");
        assert_eq!(items[0].link, "https://example.com/1");
        assert_eq!(items[0].added, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(items[1].added, Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap());
    }

    #[test]
    fn falls_back_to_permalink_guid() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>No link</title>
      <guid isPermaLink="true">https://example.com/perma</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Opaque guid</title>
      <guid isPermaLink="false">tag:example.com,2024:1</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

        let items = RssSource::parse_channel(&channel(xml));

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.com/perma");
    }

    #[test]
    fn handles_missing_title() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <link>https://example.com/x</link>
      <pubDate>2024-03-01T10:00:00Z</pubDate>
    </item>
  </channel>
</rss>"#;

        let items = RssSource::parse_channel(&channel(xml));

        assert_eq!(items[0].title, "(untitled)");
        assert_eq!(items[0].added, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn skips_items_with_invalid_or_missing_date() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>Bad Date</title>
      <link>https://example.com/bad</link>
      <pubDate>not-a-real-date</pubDate>
    </item>
    <item>
      <title>No Date</title>
      <link>https://example.com/none</link>
    </item>
  </channel>
</rss>"#;

        assert!(RssSource::parse_channel(&channel(xml)).is_empty());
    }

    #[test]
    fn documents_are_read_as_atom_or_rss() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example</title>
  <id>urn:example</id>
  <updated>2024-03-01T00:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <id>urn:1</id>
    <link href="https://example.com/atom/1"/>
    <updated>2024-03-01T00:00:00Z</updated>
  </entry>
</feed>"#;
        let items = RssSource::parse_document(atom.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.com/atom/1");

        let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test</title>
    <item>
      <title>RSS item</title>
      <link>https://example.com/rss/1</link>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;
        let items = RssSource::parse_document(rss.as_bytes()).unwrap();
        assert_eq!(items[0].link, "https://example.com/rss/1");

        assert!(RssSource::parse_document(b"<html><body>nope</body></html>").is_err());
    }

    #[test]
    fn name_is_rss() {
        let src = RssSource::new().unwrap();
        assert_eq!(src.name(), "rss");
    }
}
