//! Command-line arguments and the settings derived from them.
//!
//! Commands:
//! - feeder add <URL> [--host LABEL]
//! - feeder remove <ID>
//! - feeder edit <ID> <HOST>
//! - feeder feeds
//! - feeder items [--offset N] [--limit N]
//! - feeder watch [--interval SECS]   (default)

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use feeder::poll::POLL_INTERVAL;
use feeder::{FeedId, StorePaths};

/// feeder: a feed reader backed by a flat-file store
#[derive(Parser, Debug)]
#[command(name = "feeder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding ctr.csv, feeds.csv and items.csv
    #[arg(long, short = 'd', env = "FEEDER_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Subscribe to a feed and store its current items
    Add {
        /// Feed address
        url: String,
        /// Label shown next to the feed's items (default: scheme://host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Unsubscribe from a feed and delete its items
    Remove { id: FeedId },

    /// Change a feed's label
    Edit { id: FeedId, host: String },

    /// List feeds, most recently updated first
    Feeds,

    /// Print the newest items
    Items {
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 30)]
        limit: usize,
    },

    /// Poll feeds in the background and browse items in the terminal
    Watch {
        /// Seconds between polling rounds
        #[arg(long, env = "FEEDER_POLL_INTERVAL", default_value_t = POLL_INTERVAL.as_secs())]
        interval: u64,
    },
}

impl Cli {
    /// The command to run; `watch` with default settings when none is given.
    pub fn action(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch {
            interval: POLL_INTERVAL.as_secs(),
        })
    }

    pub fn store_paths(&self) -> StorePaths {
        StorePaths::in_dir(&self.data_dir)
    }

    /// Log file used while the terminal UI owns the screen.
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("feeder.log")
    }
}

/// Poll interval for `watch`; zero is bumped to one second.
pub fn poll_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_watch() {
        let cli = Cli::try_parse_from(["feeder", "--data-dir", "/tmp/f"]).unwrap();
        assert_eq!(
            cli.action(),
            Command::Watch {
                interval: POLL_INTERVAL.as_secs()
            }
        );
        assert_eq!(cli.store_paths().feeds, PathBuf::from("/tmp/f/feeds.csv"));
        assert_eq!(cli.log_path(), PathBuf::from("/tmp/f/feeder.log"));
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["feeder", "add", "https://x.org/rss", "--host", "X"]).unwrap();
        assert_eq!(
            cli.action(),
            Command::Add {
                url: "https://x.org/rss".into(),
                host: Some("X".into())
            }
        );

        let cli = Cli::try_parse_from(["feeder", "edit", "3", "new label"]).unwrap();
        assert_eq!(
            cli.action(),
            Command::Edit {
                id: 3,
                host: "new label".into()
            }
        );

        let cli = Cli::try_parse_from(["feeder", "items", "--limit", "5"]).unwrap();
        assert_eq!(cli.action(), Command::Items { offset: 0, limit: 5 });
    }

    #[test]
    fn rejects_non_numeric_id() {
        assert!(Cli::try_parse_from(["feeder", "remove", "abc"]).is_err());
    }

    #[test]
    fn zero_interval_is_bumped() {
        assert_eq!(poll_interval(0), Duration::from_secs(1));
        assert_eq!(poll_interval(60), Duration::from_secs(60));
    }
}
