//! feeder: a feed reader backed by a flat-file record store.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ fetch(url) ┌───────────┐ add_items ┌───────────┐ newest ┌──────────┐
//! │ source/   │ ◄───────── │  poll.rs  │ ────────► │  store/   │ ◄───── │ terminal │
//! │ (RSS/HTTP)│ ─────────► │ (thread)  │           │ (CSV + RW │        │  reader  │
//! └───────────┘  NewItem   └───────────┘           │   lock)   │        └──────────┘
//!                                                  └───────────┘
//! ```
//!
//! * **`store`**: the [`Store`], with feeds and items mirrored in memory and
//!   persisted to three CSV files, guarded by one reader/writer lock.
//! * **`source`**: the [`DataSource`] trait and the RSS implementation.
//! * **`poll`**: a background thread that refreshes every feed on a timer.
//! * **`error`**: the typed [`Error`] returned by store operations.
//!
//! The binary (`src/main.rs`) adds the command line and the terminal UI.

pub mod error;
pub mod poll;
pub mod source;
pub mod store;

pub use error::{Error, Result};
pub use source::{DataSource, RssSource};
pub use store::{Cancel, Feed, FeedId, Item, ItemWithHost, NewItem, Store, StorePaths};
