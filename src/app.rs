//! Terminal reader state.
//!
//! The reader shows one page of [`Store::newest`] at a time.  It never
//! holds items beyond the current page: whenever the page changes or the
//! poller stores something, the page is marked dirty and re-read.

use feeder::poll::PollMsg;
use feeder::{Cancel, ItemWithHost, Store};
use ratatui::widgets::ListState;

/// Items per page.
pub const PAGE_SIZE: usize = 30;

pub struct App {
    /// The current page, newest first.
    pub items: Vec<ItemWithHost>,
    /// Index of the first item of the page in the whole collection.
    pub offset: usize,
    /// Number of items in the store at the last reload.
    pub total: usize,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Whether the user asked for an immediate poll.
    pub refresh_requested: bool,
    /// Whether the page must be re-read from the store.
    pub dirty: bool,
    /// Last poll status message.
    pub status: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            offset: 0,
            total: 0,
            list_state: ListState::default(),
            quit: false,
            refresh_requested: false,
            dirty: true,
            status: "Starting…".into(),
        }
    }

    /// Re-read the current page from the store.
    ///
    /// If items disappeared (a feed was removed) and the offset is now past
    /// the end, the last page is shown instead.
    pub fn reload(&mut self, store: &Store) -> feeder::Result<()> {
        let cancel = Cancel::none();
        self.total = store.item_count(&cancel)?;
        if self.offset >= self.total {
            self.offset = self.total.saturating_sub(1) / PAGE_SIZE * PAGE_SIZE;
        }
        self.items = match store.newest(&cancel, self.offset, PAGE_SIZE) {
            Ok(items) => items,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        self.dirty = false;

        match self.list_state.selected() {
            _ if self.items.is_empty() => self.list_state.select(None),
            Some(i) if i >= self.items.len() => self.list_state.select(Some(self.items.len() - 1)),
            _ => {}
        }
        Ok(())
    }

    /// Fold a poller message into the status line.
    pub fn apply(&mut self, msg: PollMsg) {
        match msg {
            PollMsg::Added { host, count } => {
                self.status = format!("{host}: {count} new");
                self.dirty = true;
            }
            PollMsg::Error(e) => self.status = format!("Error: {e}"),
            PollMsg::RoundDone { feeds, added } => {
                self.status = format!("Checked {feeds} feeds, {added} new items");
                self.dirty = true;
            }
        }
    }

    /// 1-based page number and page count, for the status bar.
    pub fn page(&self) -> (usize, usize) {
        let pages = self.total.div_ceil(PAGE_SIZE).max(1);
        (self.offset / PAGE_SIZE + 1, pages)
    }

    // -- paging --------------------------------------------------------------

    pub fn next_page(&mut self) {
        if self.offset + PAGE_SIZE < self.total {
            self.offset += PAGE_SIZE;
            self.list_state.select(None);
            self.dirty = true;
        }
    }

    pub fn previous_page(&mut self) {
        if self.offset > 0 {
            self.offset = self.offset.saturating_sub(PAGE_SIZE);
            self.list_state.select(None);
            self.dirty = true;
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.items.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(self.items.len() - 1));
        }
    }
}
