use std::sync::Arc;
use std::time::Instant;

use ratatui::layout::Rect;
use tracing::{debug, info};

use crate::config::Config;
use crate::input::{Command, DragTracker, Gesture, PointerEvent};
use crate::marquee::Marquee;
use crate::popup::{EnrichJob, Popup};
use crate::schedule::Task;
use crate::source::FeedSnapshot;
use crate::thumbnail::Thumbnail;

/// Rows the strip occupies; text sits on the middle one.
pub const STRIP_HEIGHT: u16 = 3;

/// Shown until the first refresh lands.
const LOADING: &str = "Loading feeds...";

/// Everything that can change app state.  Each producer (fetch workers,
/// timers, the terminal) sends one of these to the event loop, and
/// [`App::apply`] is the only code that writes [`TickerState`].
#[derive(Debug)]
pub enum Msg {
    /// A refresh finished.  `seq` orders refreshes by issue time.
    Snapshot { seq: u64, snapshot: FeedSnapshot },
    Tick(Task),
    Pointer { event: PointerEvent, at: Instant },
    Key(Command),
    /// A popup thumbnail fetch finished (successfully or not).
    Thumbnail {
        generation: u64,
        row: usize,
        thumb: Option<Thumbnail>,
    },
}

/// Side effects the event loop performs on the app's behalf.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Action {
    /// Fetch the next feed in the cycle.
    Refresh,
    /// Start thumbnail fetches for a freshly opened popup.
    Enrich(Vec<EnrichJob>),
    OpenLink(String),
    Quit,
}

/// The ticker's long-lived state.
pub struct TickerState {
    /// Replaced wholesale on each accepted refresh.
    pub snapshot: Arc<FeedSnapshot>,
    /// Sequence number of `snapshot`.
    applied_seq: u64,
    pub marquee: Marquee,
    pub drag: DragTracker,
    /// Strip's top-left corner in terminal cells.
    pub window: (i32, i32),
}

/// Geometry of the last drawn frame, for pointer hit-testing.
#[derive(Debug, Clone, Default)]
pub struct FrameLayout {
    pub screen: Rect,
    pub strip: Rect,
    pub popup: Option<Rect>,
    pub popup_rows: Vec<Rect>,
}

pub struct App {
    ticker: TickerState,
    popup: Option<Popup>,
    /// Bumped each time a popup opens.
    generation: u64,
    /// Colour advances with every scroll tick instead of its own timer.
    color_on_scroll: bool,
    px_per_cell: u16,
    strip_width: u16,
    /// Written by the renderer, read for hit-testing.
    pub layout: FrameLayout,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let px_per_cell = config.px_per_cell.max(1);
        let strip_width = (config.track_width / f64::from(px_per_cell)).ceil().max(1.0) as u16;
        let source = config.feeds.first().cloned().unwrap_or_default();

        Self {
            ticker: TickerState {
                snapshot: Arc::new(FeedSnapshot::placeholder(source, LOADING)),
                applied_seq: 0,
                marquee: Marquee::from_config(config),
                drag: DragTracker::new(
                    config.drag_threshold,
                    config.click_mode,
                    config.double_click_window(),
                ),
                window: (0, 0),
            },
            popup: None,
            generation: 0,
            color_on_scroll: config.color_interval().is_none(),
            px_per_cell,
            strip_width,
            layout: FrameLayout::default(),
        }
    }

    pub fn ticker(&self) -> &TickerState {
        &self.ticker
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn px_per_cell(&self) -> u16 {
        self.px_per_cell
    }

    /// Where the strip lands on a screen of the given size.
    pub fn strip_rect(&self, screen: Rect) -> Rect {
        let width = self.strip_width.min(screen.width);
        let height = STRIP_HEIGHT.min(screen.height);
        let max_x = i32::from(screen.width - width);
        let max_y = i32::from(screen.height - height);
        let (x, y) = self.ticker.window;
        Rect {
            x: screen.x + x.clamp(0, max_x) as u16,
            y: screen.y + y.clamp(0, max_y) as u16,
            width,
            height,
        }
    }

    /// Apply one message and report the side effects it calls for.
    pub fn apply(&mut self, msg: Msg) -> Vec<Action> {
        match msg {
            Msg::Snapshot { seq, snapshot } => {
                self.replace_snapshot(seq, snapshot);
                Vec::new()
            }
            Msg::Tick(task) => self.on_tick(task),
            Msg::Pointer { event, at } => self.on_pointer(event, at),
            Msg::Key(cmd) => self.on_command(cmd),
            Msg::Thumbnail {
                generation,
                row,
                thumb,
            } => {
                if let Some(popup) = self.popup.as_mut() {
                    popup.set_thumbnail(generation, row, thumb);
                }
                Vec::new()
            }
        }
    }

    fn replace_snapshot(&mut self, seq: u64, snapshot: FeedSnapshot) {
        if seq < self.ticker.applied_seq {
            debug!(seq, newest = self.ticker.applied_seq, url = %snapshot.source, "stale snapshot dropped");
            return;
        }
        info!(url = %snapshot.source, headlines = ?snapshot.texts(), "feed loaded");
        self.ticker.applied_seq = seq;
        self.ticker.snapshot = Arc::new(snapshot);
    }

    fn on_tick(&mut self, task: Task) -> Vec<Action> {
        match task {
            Task::Scroll => {
                self.ticker.marquee.scroll_tick();
                if self.color_on_scroll {
                    self.ticker.marquee.color_tick();
                }
            }
            Task::Color => self.ticker.marquee.color_tick(),
            Task::Refresh => return vec![Action::Refresh],
        }
        Vec::new()
    }

    fn on_pointer(&mut self, event: PointerEvent, at: Instant) -> Vec<Action> {
        match event {
            PointerEvent::Down { x, y } => {
                if let Some(popup_area) = self.layout.popup {
                    if hit(popup_area, x, y) {
                        self.ticker.drag.cancel();
                        return self.click_popup_row(x, y);
                    }
                }
                if hit(self.layout.strip, x, y) {
                    self.ticker.drag.pointer_down(x, y);
                } else {
                    // A release may have been lost outside the terminal.
                    self.ticker.drag.cancel();
                }
                Vec::new()
            }
            PointerEvent::Move { x, y } => {
                if let Some(Gesture::MoveBy { dx, dy }) = self.ticker.drag.pointer_move(x, y) {
                    self.move_window(dx, dy);
                }
                Vec::new()
            }
            PointerEvent::Up { .. } => match self.ticker.drag.pointer_up(at) {
                Some(Gesture::Activate) => self.open_popup(),
                _ => Vec::new(),
            },
        }
    }

    fn click_popup_row(&mut self, x: i32, y: i32) -> Vec<Action> {
        let Some(row) = self.layout.popup_rows.iter().position(|r| hit(*r, x, y)) else {
            return Vec::new();
        };
        let Some(popup) = self.popup.as_mut() else {
            return Vec::new();
        };
        popup.select(row);
        popup
            .link_at(row)
            .map(|link| vec![Action::OpenLink(link.to_string())])
            .unwrap_or_default()
    }

    fn on_command(&mut self, cmd: Command) -> Vec<Action> {
        match cmd {
            Command::Quit => return vec![Action::Quit],
            Command::Back => {
                if self.popup.take().is_none() {
                    return vec![Action::Quit];
                }
            }
            Command::TogglePopup => {
                if self.popup.take().is_none() {
                    return self.open_popup();
                }
            }
            Command::SelectNext => {
                if let Some(p) = self.popup.as_mut() {
                    p.select_next();
                }
            }
            Command::SelectPrevious => {
                if let Some(p) = self.popup.as_mut() {
                    p.select_previous();
                }
            }
            Command::OpenSelected => {
                if let Some(link) = self.popup.as_ref().and_then(Popup::selected_link) {
                    return vec![Action::OpenLink(link.to_string())];
                }
            }
            Command::Refresh => return vec![Action::Refresh],
            Command::Nudge { dx, dy } => self.move_window(dx, dy),
        }
        Vec::new()
    }

    fn open_popup(&mut self) -> Vec<Action> {
        self.generation += 1;
        let popup = Popup::open(&self.ticker.snapshot, self.generation);
        let jobs = popup.enrich_jobs();
        debug!(rows = popup.rows.len(), thumbnails = jobs.len(), "popup opened");
        self.popup = Some(popup);
        if jobs.is_empty() {
            Vec::new()
        } else {
            vec![Action::Enrich(jobs)]
        }
    }

    fn move_window(&mut self, dx: i32, dy: i32) {
        let (x, y) = self.ticker.window;
        let (mut x, mut y) = (x + dx, y + dy);

        // Keep the strip reachable once we know the screen size.
        let screen = self.layout.screen;
        if screen.width > 0 && screen.height > 0 {
            let strip = self.strip_rect(screen);
            x = x.clamp(0, i32::from(screen.width - strip.width));
            y = y.clamp(0, i32::from(screen.height - strip.height));
        }
        self.ticker.window = (x, y);
    }
}

fn hit(r: Rect, x: i32, y: i32) -> bool {
    r.width > 0
        && r.height > 0
        && x >= i32::from(r.x)
        && x < i32::from(r.x) + i32::from(r.width)
        && y >= i32::from(r.y)
        && y < i32::from(r.y) + i32::from(r.height)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
