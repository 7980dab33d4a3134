//! liveline — a borderless strip that scrolls headlines from a rotating set
//! of RSS/Atom feeds.
//!
//! ## Architecture overview
//!
//! ```text
//!  ┌──────────┐ Msg::Snapshot ┌──────────┐  draw()  ┌──────────┐
//!  │ poll.rs  │ ────────────► │  app.rs  │ ───────► │  ui.rs   │
//!  │ (blocking│   (channel)   │ (state)  │          │ (render) │
//!  │   pool)  │ ◄──────────── └──────────┘          └──────────┘
//!  └──────────┘ Action::Refresh  ▲     ▲
//!                                │     │ Msg::Tick
//!           Msg::Key/Pointer     │  ┌─────────────┐
//!                         ┌──────────┐ schedule.rs │
//!                         │ input.rs │ (timers)    │
//!                         └──────────┘─────────────┘
//! ```
//!
//! * **`source/`** — feed fetching and RSS/Atom normalisation.
//! * **`poll`** — round-robin feed cycle; fetches run on the tokio blocking
//!   pool and report back over a channel.
//! * **`schedule`** — recurring scroll / colour / refresh timers with a
//!   cancellation token.
//! * **`marquee`** — scroll position and colour state machine.
//! * **`input`** — key mapping and drag-versus-click disambiguation.
//! * **`app`** — the single owner of ticker state; turns messages into
//!   state changes and side effects.
//! * **`popup`** / **`thumbnail`** — the detail popup and its best-effort
//!   OpenGraph thumbnails.
//! * **`ui`** — pure rendering.
//! * **`main`** — wires everything together: load config, set up the
//!   terminal, and run the event loop.

mod app;
mod config;
mod error;
mod input;
mod marquee;
mod poll;
mod popup;
mod schedule;
mod source;
mod thumbnail;
mod ui;

use std::io;
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Instant;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::{Handle, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use app::{Action, App, Msg};
use config::{Config, DEFAULT_FEED};
use poll::{FeedCycle, Refresher};
use schedule::{Scheduler, Task};
use source::{HeadlineSource, HttpSource};
use thumbnail::Enricher;

const DEFAULT_CONFIG: &str = "liveline.toml";
const DEFAULT_LOG: &str = "liveline.log";

// ---------------------------------------------------------------------------
// RAII terminal guard — idiomatic cleanup even on panic
// ---------------------------------------------------------------------------

/// Manages raw mode, the alternate screen, and mouse capture via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.hide_cursor()?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before printing a panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// `liveline [CONFIG] [FEED_URL...]`
///
/// The first argument names a TOML config (default `liveline.toml`).  When
/// that file does not exist, the arguments are taken as feed URLs instead,
/// falling back to a built-in feed.
fn load_config() -> Result<Config> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let path = args.first().map(String::as_str).unwrap_or(DEFAULT_CONFIG);

    if Path::new(path).is_file() {
        return Config::load(path).with_context(|| format!("loading {path}"));
    }

    let feeds: Vec<&str> = if args.is_empty() {
        vec![DEFAULT_FEED]
    } else {
        args.iter().map(String::as_str).collect()
    };
    let config = Config::with_feeds(feeds);
    config.validate()?;
    Ok(config)
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let log_path = std::env::var("LIVELINE_LOG").unwrap_or_else(|_| DEFAULT_LOG.to_string());
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("opening log file {log_path}"))?;

    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,hyper_util=warn,reqwest=warn,hyper=warn,html5ever=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    install_panic_hook();

    let config = load_config()?;
    init_logging()?;
    info!(feeds = ?config.feeds, "liveline starting");

    // Blocking clients must be built outside the runtime.
    let source: Arc<dyn HeadlineSource> =
        Arc::new(HttpSource::new(config.fetch_timeout(), config.max_headlines)?);
    let enricher = Arc::new(Enricher::new(config.thumbnail_timeout())?);
    let runtime = Runtime::new()?;

    let (tx, rx) = mpsc::channel();
    let cycle = FeedCycle::new(config.feeds.clone()).context("no feeds configured")?;
    let refresher = Refresher::new(cycle, source, runtime.handle().clone(), tx.clone());

    let mut scheduler = Scheduler::new(CancellationToken::new());
    let now = Instant::now();
    scheduler
        .every_from(Task::Refresh, config.refresh_interval(), now)
        .every(Task::Scroll, config.scroll_interval(), now);
    if let Some(period) = config.color_interval() {
        scheduler.every(Task::Color, period, now);
    }

    let mut guard = TerminalGuard::new()?;
    let mut event_loop = EventLoop {
        app: App::new(&config),
        scheduler,
        refresher,
        enricher,
        runtime: runtime.handle().clone(),
        tx,
        rx,
    };
    let result = event_loop.run(&mut guard.terminal);

    drop(guard);
    // In-flight fetches are abandoned, not awaited.
    runtime.shutdown_background();
    info!("liveline stopped");
    result
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

struct EventLoop {
    app: App,
    scheduler: Scheduler,
    refresher: Refresher,
    enricher: Arc<Enricher>,
    runtime: Handle,
    tx: mpsc::Sender<Msg>,
    rx: mpsc::Receiver<Msg>,
}

impl EventLoop {
    /// Each iteration:
    ///   1. Apply finished fetches and due timers.
    ///   2. Render.
    ///   3. Wait for input until the next timer deadline.
    fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        while !self.scheduler.is_cancelled() {
            let mut inbox: Vec<Msg> = self.rx.try_iter().collect();
            inbox.extend(self.scheduler.due(Instant::now()).into_iter().map(Msg::Tick));
            for msg in inbox {
                self.dispatch(msg);
            }

            terminal.draw(|f| ui::draw(&mut self.app, f))?;

            let timeout = self.scheduler.time_until_next(Instant::now());
            if event::poll(timeout)? {
                let msg = match event::read()? {
                    Event::Key(key) => input::key_command(key, self.app.popup().is_some()).map(Msg::Key),
                    Event::Mouse(mouse) => input::pointer_event(mouse).map(|event| Msg::Pointer {
                        event,
                        at: Instant::now(),
                    }),
                    _ => None,
                };
                if let Some(msg) = msg {
                    self.dispatch(msg);
                }
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, msg: Msg) {
        for action in self.app.apply(msg) {
            self.perform(action);
        }
    }

    fn perform(&mut self, action: Action) {
        match action {
            Action::Refresh => {
                self.refresher.tick();
                self.scheduler.reset(Task::Refresh, Instant::now());
            }
            Action::Enrich(jobs) => {
                for job in jobs {
                    let enricher = Arc::clone(&self.enricher);
                    let tx = self.tx.clone();
                    self.runtime.spawn_blocking(move || {
                        let thumb = enricher.enrich(&job.link);
                        let _ = tx.send(Msg::Thumbnail {
                            generation: job.generation,
                            row: job.row,
                            thumb,
                        });
                    });
                }
            }
            Action::OpenLink(url) => {
                if let Err(e) = webbrowser::open(&url) {
                    warn!(%url, error = %e, "could not open link");
                }
            }
            Action::Quit => self.scheduler.cancel(),
        }
    }
}
