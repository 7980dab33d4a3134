//! Scroll and colour animation for the headline strip.
//!
//! The marquee is a tiny state machine over `(position, direction,
//! color_index)`.  Each scroll tick moves the text by a fixed step; once it
//! travels past a fixed limit it jumps back to its start.  The limit is a
//! constant, not the measured text width, so long runs of text may sit
//! entirely off-screen for a while before wrapping.

use ratatui::style::Color;
use serde::Deserialize;

use crate::config::Config;

/// The seven hues the text cycles through, one per colour tick.
pub const PALETTE: [Color; 7] = [
    Color::Rgb(255, 0, 0),     // red
    Color::Rgb(255, 165, 0),   // orange
    Color::Rgb(255, 255, 0),   // yellow
    Color::Rgb(0, 128, 0),     // green
    Color::Rgb(0, 0, 255),     // blue
    Color::Rgb(75, 0, 130),    // indigo
    Color::Rgb(238, 130, 238), // violet
];

#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Text enters on the right and moves left.
    Left,
    /// Text enters on the left and moves right.
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marquee {
    /// Current x of the text anchor, in virtual pixels.
    position: f64,
    direction: Direction,
    /// Step magnitude per tick.
    step: f64,
    /// Restart position for left-scrolling text.
    anchor: f64,
    wrap_limit: f64,
    color_index: usize,
}

impl Marquee {
    pub fn new(direction: Direction, step: f64, anchor: f64, wrap_limit: f64) -> Self {
        let mut marquee = Self {
            position: 0.0,
            direction,
            step: step.abs(),
            anchor,
            wrap_limit: wrap_limit.abs(),
            color_index: 0,
        };
        marquee.position = marquee.start();
        marquee
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.direction,
            config.scroll_step,
            config.track_width,
            config.wrap_limit,
        )
    }

    /// Where the text sits at startup and after each wrap.
    pub fn start(&self) -> f64 {
        match self.direction {
            Direction::Left => self.anchor,
            Direction::Right => 0.0,
        }
    }

    #[cfg(test)]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[cfg(test)]
    pub fn color_index(&self) -> usize {
        self.color_index
    }

    pub fn color(&self) -> Color {
        PALETTE[self.color_index]
    }

    /// Signed movement per tick.
    pub fn velocity(&self) -> f64 {
        match self.direction {
            Direction::Left => -self.step,
            Direction::Right => self.step,
        }
    }

    /// Advance one scroll tick.  Returns `true` if the text wrapped.
    pub fn scroll_tick(&mut self) -> bool {
        self.position += self.velocity();

        let past_limit = match self.direction {
            Direction::Left => self.position < -self.wrap_limit,
            Direction::Right => self.position > self.wrap_limit,
        };
        if past_limit {
            self.position = self.start();
        }
        past_limit
    }

    pub fn color_tick(&mut self) {
        self.color_index = (self.color_index + 1) % PALETTE.len();
    }

    /// Left edge of a run of text `width` pixels wide.  Right-scrolling text
    /// is anchored by its trailing edge.
    pub fn text_left(&self, width: f64) -> f64 {
        match self.direction {
            Direction::Left => self.position,
            Direction::Right => self.position - width,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
