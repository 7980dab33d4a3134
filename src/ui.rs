//! Terminal rendering.
//!
//! All drawing lives here, separated from state ([`App`]) and input
//! ([`crate::input`]).  The frame has three layers, back to front:
//!
//! * a one-line status bar on the bottom row,
//! * the borderless headline strip, wherever it has been dragged,
//! * the detail popup, when open.
//!
//! After drawing, the geometry of each layer is recorded in
//! [`App::layout`] so pointer events can be hit-tested against what the
//! user actually sees.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, FrameLayout};
use crate::popup::{Popup, ThumbState};

/// Columns a popup thumbnail occupies.
const THUMB_COLS: u16 = 4;
/// Lines per popup row: headline, then link.
const ROW_HEIGHT: u16 = 2;
const POPUP_MAX_WIDTH: u16 = 96;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let screen = frame.area();

    draw_status_bar(app, frame, screen);
    let strip = app.strip_rect(screen);
    draw_strip(app, frame, strip);

    let (popup, popup_rows) = match app.popup() {
        Some(popup) => {
            let (area, rows) = draw_popup(popup, frame, screen);
            (Some(area), rows)
        }
        None => (None, Vec::new()),
    };

    app.layout = FrameLayout {
        screen,
        strip,
        popup,
        popup_rows,
    };
}

/// Render the scrolling headline text inside the strip.
fn draw_strip(app: &App, frame: &mut Frame, strip: Rect) {
    if strip.width == 0 || strip.height == 0 {
        return;
    }
    let ticker = app.ticker();
    // Lighten the strip while it is being dragged.
    let bg = if ticker.drag.is_dragging() {
        Color::DarkGray
    } else {
        Color::Black
    };
    frame.render_widget(Clear, strip);
    frame.render_widget(Block::default().style(Style::default().bg(bg)), strip);

    let text = ticker.snapshot.joined();
    let px = f64::from(app.px_per_cell());
    let text_px = text.width() as f64 * px;
    let left_col = (ticker.marquee.text_left(text_px) / px).floor() as i64;

    let (offset, visible) = clip_to_window(&text, left_col, strip.width);
    if visible.is_empty() {
        return;
    }

    let area = Rect {
        x: strip.x + offset,
        y: strip.y + strip.height / 2,
        width: strip.width - offset,
        height: 1,
    };
    let style = Style::default()
        .fg(ticker.marquee.color())
        .bg(bg)
        .add_modifier(Modifier::BOLD);
    frame.render_widget(Paragraph::new(Span::styled(visible, style)), area);
}

/// Cut `text`, whose first column sits at `left_col` (possibly negative or
/// past the edge), down to the part visible in `0..width`.
///
/// Returns the column the visible part starts at and the visible text.  A
/// wide character straddling either edge is dropped rather than split.
pub fn clip_to_window(text: &str, left_col: i64, width: u16) -> (u16, String) {
    let width = i64::from(width);
    let mut col = left_col;
    let mut start = None;
    let mut visible = String::new();

    for ch in text.chars() {
        if col >= width {
            break;
        }
        let w = ch.width().unwrap_or(0) as i64;
        if col >= 0 && col + w <= width {
            start.get_or_insert(col);
            visible.push(ch);
        }
        col += w;
    }
    (start.unwrap_or(0) as u16, visible)
}

/// Render the bottom status bar: current source, fetch time, key help.
fn draw_status_bar(app: &App, frame: &mut Frame, screen: Rect) {
    if screen.height == 0 {
        return;
    }
    let area = Rect {
        y: screen.y + screen.height - 1,
        height: 1,
        ..screen
    };
    let snapshot = &app.ticker().snapshot;
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(snapshot.source.as_str(), Style::default().fg(Color::Cyan)),
        Span::raw("  "),
        Span::styled(
            snapshot.fetched_at.format("%H:%M:%S").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  q: quit  click/Enter: headlines  drag/arrows: move  r: refresh"),
    ]));
    frame.render_widget(status, area);
}

/// Centered popup area for `rows` entries, clamped to the screen.
pub fn popup_area(screen: Rect, rows: usize) -> Rect {
    let width = screen.width.saturating_sub(4).min(POPUP_MAX_WIDTH);
    let wanted = (rows as u16).saturating_mul(ROW_HEIGHT).saturating_add(2);
    let height = wanted.min(screen.height);
    Rect {
        x: screen.x + (screen.width - width) / 2,
        y: screen.y + (screen.height - height) / 2,
        width,
        height,
    }
}

/// Render the popup; returns its area and the area of each visible row.
fn draw_popup(popup: &Popup, frame: &mut Frame, screen: Rect) -> (Rect, Vec<Rect>) {
    let area = popup_area(screen, popup.rows.len());
    let block = Block::default()
        .title(format!(" {} ", popup.source))
        .title_bottom(" ↑/↓ select  Enter open  Esc close ")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black).fg(Color::White));
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let mut row_areas = Vec::new();
    for (i, row) in popup.rows.iter().enumerate() {
        let y = inner.y + i as u16 * ROW_HEIGHT;
        if y + ROW_HEIGHT > inner.y + inner.height {
            break;
        }
        let row_area = Rect {
            x: inner.x,
            y,
            width: inner.width,
            height: ROW_HEIGHT,
        };
        row_areas.push(row_area);

        let thumb_area = Rect {
            width: THUMB_COLS.min(row_area.width),
            ..row_area
        };
        frame.render_widget(Paragraph::new(thumbnail_lines(&row.thumb)), thumb_area);

        let text_x = row_area.x + (THUMB_COLS + 1).min(row_area.width);
        let text_area = Rect {
            x: text_x,
            width: row_area.width - (text_x - row_area.x),
            ..row_area
        };

        let selected = i == popup.selected();
        let headline_style = if selected {
            Style::default()
                .fg(Color::Yellow)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let link_line = match row.item.link.as_deref() {
            Some(link) => Span::styled(
                link,
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::UNDERLINED),
            ),
            None => Span::styled("(no link)", Style::default().fg(Color::DarkGray)),
        };
        let lines = vec![
            Line::from(Span::styled(row.item.text.as_str(), headline_style)),
            Line::from(link_line),
        ];
        frame.render_widget(Paragraph::new(lines), text_area);
    }

    (area, row_areas)
}

/// Half-block rendering of a row's thumbnail, or a placeholder.
fn thumbnail_lines(thumb: &ThumbState) -> Vec<Line<'static>> {
    match thumb {
        ThumbState::Ready(t) => t
            .half_blocks(THUMB_COLS, ROW_HEIGHT)
            .into_iter()
            .map(|cells| {
                Line::from(
                    cells
                        .into_iter()
                        .map(|(top, bottom)| Span::styled("▀", Style::default().fg(top).bg(bottom)))
                        .collect::<Vec<_>>(),
                )
            })
            .collect(),
        ThumbState::Pending => vec![Line::from(Span::styled(
            " ··",
            Style::default().fg(Color::DarkGray),
        ))],
        ThumbState::None => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
