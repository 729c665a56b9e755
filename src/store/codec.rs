//! Row codec for the feed and item files.
//!
//! Feed rows are `[id, host, feed_url, last_checked, last_updated]`, item
//! rows are `[feed_id, title, link, added]`.  Timestamps are RFC 3339 in
//! UTC; an absent optional timestamp is an empty field.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use csv::StringRecord;

use super::model::{Feed, Item};
use crate::error::{Error, Result};

pub const FEED_FIELDS: usize = 5;
pub const ITEM_FIELDS: usize = 4;

const F_ID: usize = 0;
const F_HOST: usize = 1;
const F_URL: usize = 2;
const F_LAST_CHECKED: usize = 3;
const F_LAST_UPDATED: usize = 4;

const I_FEED_ID: usize = 0;
const I_TITLE: usize = 1;
const I_LINK: usize = 2;
const I_ADDED: usize = 3;

pub fn encode_time(t: &DateTime<Utc>) -> String {
    // AutoSi keeps sub-second digits only when present, so values read back
    // compare equal to what was written.
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn encode_opt_time(t: &Option<DateTime<Utc>>) -> String {
    t.as_ref().map(encode_time).unwrap_or_default()
}

pub fn encode_feed(feed: &Feed) -> StringRecord {
    StringRecord::from(vec![
        feed.id.to_string(),
        feed.host.clone(),
        feed.feed_url.clone(),
        encode_opt_time(&feed.last_checked),
        encode_opt_time(&feed.last_updated),
    ])
}

pub fn encode_item(item: &Item) -> StringRecord {
    StringRecord::from(vec![
        item.feed_id.to_string(),
        item.title.clone(),
        item.link.clone(),
        encode_time(&item.added),
    ])
}

/// Decoding context: which file a record came from.
struct Row<'a> {
    path: &'a Path,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    fn new(path: &'a Path, record: &'a StringRecord, fields: usize) -> Result<Self> {
        let row = Self { path, record };
        if record.len() != fields {
            return Err(row.error(format!(
                "unexpected row length: expected {fields} fields, got {}",
                record.len()
            )));
        }
        Ok(row)
    }

    fn line(&self) -> u64 {
        self.record.position().map(|p| p.line()).unwrap_or(0)
    }

    fn error(&self, reason: String) -> Error {
        Error::malformed(self.path, self.line(), reason)
    }

    fn text(&self, idx: usize) -> String {
        self.record[idx].to_string()
    }

    fn id(&self, idx: usize) -> Result<u64> {
        let s = &self.record[idx];
        s.parse()
            .map_err(|e| self.error(format!("invalid id {s:?}: {e}")))
    }

    fn time(&self, idx: usize) -> Result<DateTime<Utc>> {
        let s = &self.record[idx];
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| self.error(format!("invalid timestamp {s:?}: {e}")))
    }

    fn opt_time(&self, idx: usize) -> Result<Option<DateTime<Utc>>> {
        if self.record[idx].is_empty() {
            return Ok(None);
        }
        self.time(idx).map(Some)
    }
}

pub fn decode_feed(path: &Path, record: &StringRecord) -> Result<Feed> {
    let row = Row::new(path, record, FEED_FIELDS)?;
    Ok(Feed {
        id: row.id(F_ID)?,
        host: row.text(F_HOST),
        feed_url: row.text(F_URL),
        last_checked: row.opt_time(F_LAST_CHECKED)?,
        last_updated: row.opt_time(F_LAST_UPDATED)?,
    })
}

pub fn decode_item(path: &Path, record: &StringRecord) -> Result<Item> {
    let row = Row::new(path, record, ITEM_FIELDS)?;
    Ok(Item {
        feed_id: row.id(I_FEED_ID)?,
        title: row.text(I_TITLE),
        link: row.text(I_LINK),
        added: row.time(I_ADDED)?,
    })
}
