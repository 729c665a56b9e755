//! feeder: command line and terminal front-end.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────┐  PollMsg   ┌──────────┐  draw()  ┌──────────┐
//! │  poll.rs │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//! │ (thread) │  (channel) │ (state)  │          │ (render) │
//! └──────────┘            └──────────┘          └──────────┘
//!      │ add_items             │ newest()            ▲
//!      ▼                       ▼                     │ handle_key_event()
//! ┌──────────────────────────────────┐          ┌──────────┐
//! │          feeder::Store           │          │ input.rs │
//! └──────────────────────────────────┘          └──────────┘
//! ```
//!
//! * **`config`**: `clap` arguments and derived paths.
//! * **`app`**: reader state (current page, selection, status line).
//! * **`ui`**: pure rendering of `App`.
//! * **`input`**: maps key events to `App` mutations.
//! * **`main`**: logging setup, one-shot commands, and the `watch` loop.

mod app;
mod config;
mod input;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use config::{Cli, Command};
use feeder::source::host_label;
use feeder::{poll, Cancel, DataSource, RssSource, Store};

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
///
/// Constructing this struct enters raw mode + alternate screen.  When the
/// value is dropped (normally or during stack unwinding) it restores the
/// terminal.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log to `file` when given (the TUI owns the terminal), else to stderr.
/// `RUST_LOG` overrides `default_level`.
fn init_logging(file: Option<&Path>, default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let action = cli.action();

    fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("creating data directory {}", cli.data_dir.display()))?;

    match &action {
        Command::Watch { .. } => init_logging(Some(&cli.log_path()), "info")?,
        _ => init_logging(None, "warn")?,
    }

    let paths = cli.store_paths();
    let store = Store::open(&paths)
        .with_context(|| format!("opening store in {}", cli.data_dir.display()))?;
    let store = Arc::new(store);

    let result = run(&store, action);
    let closed = store.close().context("closing store");
    result.and(closed)
}

fn run(store: &Arc<Store>, action: Command) -> Result<()> {
    let cancel = Cancel::none();
    match action {
        Command::Add { url, host } => {
            let host = match host {
                Some(h) => h,
                None => host_label(&url)?,
            };
            // Fetch first so an unreachable feed is never stored.
            let source = RssSource::new()?;
            let items = source
                .fetch(&url)
                .with_context(|| format!("failed parsing feed {url}"))?;
            let id = store.add_feed(&cancel, &host, &url)?;
            let added = store.add_items(&cancel, id, items)?;
            println!("added feed {id} ({host}) with {} items", added.len());
        }
        Command::Remove { id } => {
            store.remove_feed(&cancel, id)?;
            println!("removed feed {id}");
        }
        Command::Edit { id, host } => {
            store.edit_feed_host(&cancel, id, &host)?;
            println!("feed {id} is now labelled {host}");
        }
        Command::Feeds => {
            let fmt = |t: Option<chrono::DateTime<chrono::Utc>>| {
                t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".into())
            };
            for f in store.all_feeds(&cancel)? {
                println!(
                    "{:>4}  {:<32}  updated {:<16}  checked {:<16}  {}",
                    f.id,
                    f.host,
                    fmt(f.last_updated),
                    fmt(f.last_checked),
                    f.feed_url
                );
            }
        }
        Command::Items { offset, limit } => {
            let page = match store.newest(&cancel, offset, limit) {
                Ok(page) => page,
                Err(e) if e.is_not_found() => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            for row in page {
                println!(
                    "{}  {}  [{}]\n    {}",
                    row.item.added.format("%Y-%m-%d %H:%M"),
                    row.item.title,
                    row.host,
                    row.item.link
                );
            }
        }
        Command::Watch { interval } => watch(store, config::poll_interval(interval))?,
    }
    Ok(())
}

/// Poll in the background and run the terminal reader until the user quits.
fn watch(store: &Arc<Store>, interval: Duration) -> Result<()> {
    install_panic_hook();

    // -- start background polling --------------------------------------------
    let source: Box<dyn DataSource> = Box::new(RssSource::new()?);
    let poller = poll::spawn(Arc::clone(store), source, interval);
    info!(interval_secs = interval.as_secs(), "watching feeds");

    // -- terminal setup (RAII, Drop restores on exit or panic) ---------------
    let mut guard = TerminalGuard::new()?;
    let mut app = App::new();

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Drain any messages from the poller.
    //   2. Re-read the page if something changed.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Process poll messages
        while let Ok(msg) = poller.rx.try_recv() {
            app.apply(msg);
        }

        // 2. Reload
        if app.dirty {
            if let Err(e) = app.reload(store) {
                app.status = format!("Error: {e}");
                app.dirty = false;
            }
        }

        // 3. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // 4. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.refresh_requested {
            app.refresh_requested = false;
            app.status = "Refreshing…".into();
            poller.refresh();
        }

        if app.quit {
            break;
        }
    }

    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
