//! Ticker configuration, read from a TOML file.
//!
//! Only `feeds` is required; every timing and geometry knob has a default
//! matching the classic 800-pixel strip that scrolls four pixels every 50 ms.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::input::ClickMode;
use crate::marquee::Direction;

/// Feed used when neither a config file nor arguments name one.
pub const DEFAULT_FEED: &str = "https://feeds.bbci.co.uk/news/rss.xml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Feed URLs, visited round-robin.
    pub feeds: Vec<String>,
    pub refresh_interval_ms: u64,
    pub scroll_interval_ms: u64,
    /// Colour rotation period; `0` advances the colour on every scroll tick.
    pub color_interval_ms: u64,
    /// Pixels moved per scroll tick.  The sign comes from `direction`.
    pub scroll_step: f64,
    pub direction: Direction,
    /// Where a left-scrolling strip restarts, and its width.
    pub track_width: f64,
    /// Distance past which the strip wraps.
    pub wrap_limit: f64,
    /// Virtual pixels per terminal column.
    pub px_per_cell: u16,
    pub fetch_timeout_ms: u64,
    pub thumbnail_timeout_ms: u64,
    pub click_mode: ClickMode,
    pub double_click_ms: u64,
    /// Cells the pointer may wander before a press counts as a drag.
    pub drag_threshold: u16,
    pub max_headlines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            refresh_interval_ms: 60_000,
            scroll_interval_ms: 50,
            color_interval_ms: 1_000,
            scroll_step: 4.0,
            direction: Direction::Left,
            track_width: 800.0,
            wrap_limit: 2000.0,
            px_per_cell: 8,
            fetch_timeout_ms: 10_000,
            thumbnail_timeout_ms: 5_000,
            click_mode: ClickMode::Single,
            double_click_ms: 400,
            drag_threshold: 2,
            max_headlines: 5,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with the given feeds.
    pub fn with_feeds<I, S>(feeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feeds: feeds.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.feeds.iter().all(|f| f.trim().is_empty()) {
            bail!("config must list at least one feed");
        }
        if self.scroll_step == 0.0 || !self.scroll_step.is_finite() {
            bail!("scroll_step must be a non-zero number");
        }
        if self.scroll_interval_ms == 0 || self.refresh_interval_ms == 0 {
            bail!("scroll and refresh intervals must be positive");
        }
        if self.px_per_cell == 0 {
            bail!("px_per_cell must be positive");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn scroll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_interval_ms)
    }

    /// `None` when colour is coupled to the scroll tick.
    pub fn color_interval(&self) -> Option<Duration> {
        (self.color_interval_ms > 0).then(|| Duration::from_millis(self.color_interval_ms))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn thumbnail_timeout(&self) -> Duration {
        Duration::from_millis(self.thumbnail_timeout_ms)
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}
