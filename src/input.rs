//! Keyboard and pointer input.
//!
//! Key events map to a [`Command`]; pointer events are normalised into
//! [`PointerEvent`]s and fed to a [`DragTracker`], which decides whether a
//! press was a drag (move the strip) or a click (open the popup).
//!
//! A press that wanders more than the threshold never activates, and a
//! press that stays inside it never moves anything.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use serde::Deserialize;

/// How many clicks open the popup.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickMode {
    Single,
    Double,
}

/// Keyboard-level intent, interpreted by the app.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Command {
    Quit,
    /// Esc: close the popup if open, otherwise quit.
    Back,
    TogglePopup,
    SelectNext,
    SelectPrevious,
    /// Open the selected popup row's link.
    OpenSelected,
    Refresh,
    Nudge { dx: i32, dy: i32 },
}

/// Left-button pointer activity, in terminal cells.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PointerEvent {
    Down { x: i32, y: i32 },
    Move { x: i32, y: i32 },
    Up { x: i32, y: i32 },
}

/// What a pointer gesture amounts to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Gesture {
    /// Move the strip by a relative offset.
    MoveBy { dx: i32, dy: i32 },
    /// The press was a click (or the second click of a double-click).
    Activate,
}

/// Map a key press to a command.  Release and repeat events are ignored so
/// each physical press acts once.
pub fn key_command(key: KeyEvent, popup_open: bool) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }

    let cmd = match key.code {
        KeyCode::Char('q') => Command::Quit,
        KeyCode::Esc => Command::Back,
        KeyCode::Char('r') => Command::Refresh,
        KeyCode::Char(' ') => Command::TogglePopup,
        KeyCode::Enter if popup_open => Command::OpenSelected,
        KeyCode::Enter => Command::TogglePopup,
        KeyCode::Down | KeyCode::Char('j') if popup_open => Command::SelectNext,
        KeyCode::Up | KeyCode::Char('k') if popup_open => Command::SelectPrevious,
        KeyCode::Left => Command::Nudge { dx: -1, dy: 0 },
        KeyCode::Right => Command::Nudge { dx: 1, dy: 0 },
        KeyCode::Up => Command::Nudge { dx: 0, dy: -1 },
        KeyCode::Down => Command::Nudge { dx: 0, dy: 1 },
        _ => return None,
    };
    Some(cmd)
}

/// Keep only left-button press, drag, and release.
pub fn pointer_event(event: MouseEvent) -> Option<PointerEvent> {
    let x = i32::from(event.column);
    let y = i32::from(event.row);
    match event.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(PointerEvent::Down { x, y }),
        MouseEventKind::Drag(MouseButton::Left) => Some(PointerEvent::Move { x, y }),
        MouseEventKind::Up(MouseButton::Left) => Some(PointerEvent::Up { x, y }),
        _ => None,
    }
}

/// Drag-versus-click disambiguation for one pointer.
#[derive(Debug, Clone)]
pub struct DragTracker {
    pressed: bool,
    /// Where the current press started.
    press_origin: (i32, i32),
    /// Reference point for the next incremental move.
    drag_origin: (i32, i32),
    dragging: bool,
    threshold: i32,
    mode: ClickMode,
    double_click: Duration,
    last_click: Option<Instant>,
}

impl DragTracker {
    pub fn new(threshold: u16, mode: ClickMode, double_click: Duration) -> Self {
        Self {
            pressed: false,
            press_origin: (0, 0),
            drag_origin: (0, 0),
            dragging: false,
            threshold: i32::from(threshold),
            mode,
            double_click,
            last_click: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pointer_down(&mut self, x: i32, y: i32) {
        self.pressed = true;
        self.press_origin = (x, y);
        self.drag_origin = (x, y);
        self.dragging = false;
    }

    /// Forget any press in progress, e.g. one whose release was never seen
    /// or a press that landed outside the strip.  Also breaks a pending
    /// double click.
    pub fn cancel(&mut self) {
        self.pressed = false;
        self.dragging = false;
        self.last_click = None;
    }

    /// Track movement while pressed.  Returns the incremental offset once the
    /// pointer has left the threshold box.
    pub fn pointer_move(&mut self, x: i32, y: i32) -> Option<Gesture> {
        if !self.pressed {
            return None;
        }
        if !self.dragging {
            let (ox, oy) = self.press_origin;
            let distance = (x - ox).abs().max((y - oy).abs());
            if distance <= self.threshold {
                return None;
            }
            self.dragging = true;
        }

        let (rx, ry) = self.drag_origin;
        self.drag_origin = (x, y);
        let (dx, dy) = (x - rx, y - ry);
        if dx == 0 && dy == 0 {
            return None;
        }
        Some(Gesture::MoveBy { dx, dy })
    }

    /// Finish the press.  Returns [`Gesture::Activate`] for a click that
    /// satisfies the click mode; drags never activate.
    pub fn pointer_up(&mut self, now: Instant) -> Option<Gesture> {
        if !self.pressed {
            return None;
        }
        self.pressed = false;
        if self.dragging {
            self.last_click = None;
            return None;
        }

        match self.mode {
            ClickMode::Single => Some(Gesture::Activate),
            ClickMode::Double => match self.last_click.take() {
                Some(prev) if now.duration_since(prev) <= self.double_click => Some(Gesture::Activate),
                _ => {
                    self.last_click = Some(now);
                    None
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
