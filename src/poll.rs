//! Background feed polling.
//!
//! Runs on a dedicated thread that, once per interval (or when woken with
//! [`Poller::refresh`]), fetches every stored feed and ingests its items
//! into the [`Store`].  Progress is reported to the UI thread over an
//! [`mpsc`] channel.
//!
//! Feeds are fetched sequentially.  A feed that fails to fetch or ingest
//! is reported and skipped; the round carries on with the next one.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::source::DataSource;
use crate::store::{Cancel, Store};

/// Default time between two polling rounds.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Deadline for each store call made by the poller.
const STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages sent from the poller thread to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollMsg {
    /// New items were stored for the feed labelled `host`.
    Added { host: String, count: usize },
    /// A fetch or store call failed with this description.
    Error(String),
    /// A round over `feeds` feeds finished, storing `added` items in total.
    RoundDone { feeds: usize, added: usize },
}

/// Fetch every stored feed once and ingest the results.
pub fn poll_round(store: &Store, source: &dyn DataSource) -> Vec<PollMsg> {
    let feeds = match store.all_feeds(&Cancel::with_timeout(STORE_TIMEOUT)) {
        Ok(feeds) => feeds,
        Err(e) => {
            warn!(error = %e, "listing feeds failed");
            return vec![PollMsg::Error(format!("listing feeds: {e}"))];
        }
    };

    let mut msgs = Vec::new();
    let mut total = 0;
    for feed in &feeds {
        let candidates = match source.fetch(&feed.feed_url) {
            Ok(items) => items,
            Err(e) => {
                warn!(feed = %feed.feed_url, error = %format!("{e:#}"), "fetch failed");
                msgs.push(PollMsg::Error(format!("{}: {e:#}", feed.host)));
                continue;
            }
        };

        match store.add_items(&Cancel::with_timeout(STORE_TIMEOUT), feed.id, candidates) {
            Ok(added) => {
                for item in &added {
                    info!(feed = %feed.feed_url, id = feed.id, title = %item.title, added = %item.added, "added item");
                }
                if !added.is_empty() {
                    total += added.len();
                    msgs.push(PollMsg::Added {
                        host: feed.host.clone(),
                        count: added.len(),
                    });
                }
            }
            // Removed while we were fetching it.
            Err(e) if e.is_not_found() => debug!(id = feed.id, "feed vanished during poll"),
            Err(e) => {
                warn!(feed = %feed.feed_url, error = %e, "storing items failed");
                msgs.push(PollMsg::Error(format!("{}: {e}", feed.host)));
            }
        }
    }

    debug!(source = source.name(), feeds = feeds.len(), added = total, "poll round done");
    msgs.push(PollMsg::RoundDone {
        feeds: feeds.len(),
        added: total,
    });
    msgs
}

/// Handle to the running poller thread.
pub struct Poller {
    /// Progress messages; drain on every UI tick.
    pub rx: mpsc::Receiver<PollMsg>,
    wake: mpsc::Sender<()>,
}

impl Poller {
    /// Start the next round now instead of waiting for the interval.
    pub fn refresh(&self) {
        let _ = self.wake.send(());
    }
}

/// Spawn the background polling thread.
///
/// The first round starts immediately.  The thread exits once the
/// [`Poller`] is dropped.
pub fn spawn(store: Arc<Store>, source: Box<dyn DataSource>, interval: Duration) -> Poller {
    let (tx, rx) = mpsc::channel();
    let (wake, wake_rx) = mpsc::channel::<()>();

    thread::spawn(move || loop {
        for msg in poll_round(&store, source.as_ref()) {
            // If the receiver is gone the main thread has exited;
            // silently stop polling.
            if tx.send(msg).is_err() {
                return;
            }
        }
        match wake_rx.recv_timeout(interval) {
            Ok(()) => while wake_rx.try_recv().is_ok() {},
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    });

    Poller { rx, wake }
}
