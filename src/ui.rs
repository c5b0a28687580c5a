//! Layout and drawing: board, next pair, score, controls, chain banner, overlays.

use crate::board::{COLS, Puyo, ROWS};
use crate::game::{GameState, Status};
use crate::piece::Pair;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each puyo is two terminal columns wide so cells look square.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;
const PUYO_GLYPH: &str = "██";

const BOARD_OUTER_WIDTH: u16 = COLS as u16 * CELL_WIDTH + 2;
const BOARD_OUTER_HEIGHT: u16 = ROWS as u16 * CELL_HEIGHT + 2;
const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the pop fade (TachyonFX) in ms; shorter than the pop settle delay.
const POP_FADE_MS: u32 = 400;

/// Banner text and colour for a chain of `chain` steps.
pub fn chain_banner(chain: u32, theme: &Theme) -> (String, Color) {
    let marks = "!".repeat(chain.clamp(1, 5) as usize);
    let color = match chain {
        0 | 1 => theme.puyo_color(Puyo::Blue),
        2 => theme.puyo_color(Puyo::Green),
        3 => theme.puyo_color(Puyo::Yellow),
        4 => theme.puyo_color(Puyo::Red),
        _ => Color::Magenta,
    };
    (format!(" {chain} chain{marks} "), color)
}

/// Draw the whole screen. While popped cells are present (and animation is on)
/// the fade effect is created or advanced through `pop_effect` / `pop_process_time`.
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    pop_effect: &mut Option<Effect>,
    pop_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) {
    let (board_area, sidebar_area) = split_screen(area);
    draw_board(frame, state, theme, board_area);
    draw_sidebar(frame, state, theme, sidebar_area);

    if !no_animation && !state.popped().is_empty() {
        apply_pop_effect(frame, state, theme, board_area, pop_effect, pop_process_time, now);
    }

    if state.show_chain_banner() && state.chain() > 0 {
        draw_chain_banner(frame, state, theme, board_area);
    }
    match state.status() {
        Status::Idle => draw_overlay(
            frame,
            theme,
            board_area,
            Line::from(Span::styled(
                " puyotui ",
                Style::default().fg(theme.title).bold(),
            )),
            vec![Line::from(Span::styled(
                "Space to start",
                Style::default().fg(theme.main_fg),
            ))],
        ),
        Status::GameOver => draw_overlay(
            frame,
            theme,
            board_area,
            Line::from(Span::styled(
                " Game Over ",
                Style::default().fg(Color::White).bg(Color::Red),
            )),
            vec![
                Line::from(Span::styled(
                    format!("Score: {}", state.score()),
                    Style::default().fg(theme.main_fg),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Space to restart",
                    Style::default().fg(theme.inactive_fg),
                )),
            ],
        ),
        Status::Playing | Status::Falling | Status::Clearing => {}
    }
}

/// Board + sidebar centred in `area`.
fn split_screen(area: Rect) -> (Rect, Rect) {
    let total_w = BOARD_OUTER_WIDTH + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(BOARD_OUTER_HEIGHT),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_OUTER_WIDTH),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(vert[1]);
    (inner[0], inner[1])
}

/// Terminal rect of board cell (x, y) inside the board's inner area.
fn cell_rect(inner: Rect, x: usize, y: usize) -> Option<Rect> {
    let rect = Rect {
        x: inner.x + x as u16 * CELL_WIDTH,
        y: inner.y + y as u16 * CELL_HEIGHT,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    };
    (rect.right() <= inner.right() && rect.bottom() <= inner.bottom()).then_some(rect)
}

fn board_block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
}

fn draw_board(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let block = board_block(theme);
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    let bg = Style::default().bg(theme.bg);
    for y in 0..ROWS {
        for x in 0..COLS {
            let Some(r) = cell_rect(inner, x, y) else {
                continue;
            };
            match state.board().get(x, y) {
                Some(puyo) => {
                    let color = theme.puyo_color(puyo);
                    buf.set_string(r.x, r.y, PUYO_GLYPH, Style::default().fg(color).bg(theme.bg));
                }
                None => {
                    buf.set_string(r.x, r.y, "  ", bg);
                }
            }
        }
    }

    // Falling pair; the sub puyo is hidden while it is above the board.
    if let Some(piece) = state.piece() {
        let halves = [
            (piece.main_position(), piece.pair.main),
            (piece.sub_position(), piece.pair.sub),
        ];
        for ((x, y), puyo) in halves {
            if x < 0 || y < 0 {
                continue;
            }
            if let Some(r) = cell_rect(inner, x as usize, y as usize) {
                let color = theme.puyo_color(puyo);
                buf.set_string(r.x, r.y, PUYO_GLYPH, Style::default().fg(color).bg(theme.bg));
            }
        }
    }
}

/// Buffer positions covered by popped cells.
fn popped_buffer_positions(inner: Rect, popped: &[(usize, usize)]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &(x, y) in popped {
        if let Some(r) = cell_rect(inner, x, y) {
            for bx in r.left()..r.right() {
                for by in r.top()..r.bottom() {
                    set.insert((bx, by));
                }
            }
        }
    }
    set
}

/// Paint popped cells white, then fade them into the background (TachyonFX).
fn apply_pop_effect(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    board_area: Rect,
    pop_effect: &mut Option<Effect>,
    pop_process_time: &mut Option<Instant>,
    now: Instant,
) {
    if pop_effect.as_ref().is_some_and(Effect::done) {
        return;
    }
    let inner = board_block(theme).inner(board_area);
    let delta = pop_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *pop_process_time = Some(now);

    let positions = popped_buffer_positions(inner, state.popped());
    {
        let buf = frame.buffer_mut();
        for &(x, y) in &positions {
            buf[(x, y)]
                .set_symbol("█")
                .set_style(Style::default().fg(Color::White).bg(theme.bg));
        }
    }

    if pop_effect.is_none() {
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            positions.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (POP_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(inner);
        *pop_effect = Some(effect);
    }

    if let Some(effect) = pop_effect {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_chain_banner(frame: &mut Frame, state: &GameState, theme: &Theme, board_area: Rect) {
    let (text, color) = chain_banner(state.chain(), theme);
    let rect = centered(board_area, text.chars().count() as u16, 1);
    Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(color).bg(Color::Black).bold(),
    )))
    .alignment(Alignment::Center)
    .render(rect, frame.buffer_mut());
}

fn draw_overlay(
    frame: &mut Frame,
    theme: &Theme,
    board_area: Rect,
    title: Line<'static>,
    body: Vec<Line<'static>>,
) {
    let height = body.len() as u16 + 4;
    let rect = centered(board_area, board_area.width, height);
    let mut lines = vec![Line::from(""), title, Line::from("")];
    lines.extend(body);
    Clear.render(rect, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .render(rect, frame.buffer_mut());
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Next (border + title + two cells)
            Constraint::Length(4), // Score + chain
            Constraint::Length(9), // Controls
        ])
        .split(area);

    // --- Next ---
    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("Next", title_style));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    draw_next_pair(frame, theme, next_inner, state.next_pair());

    // --- Score ---
    let score_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let score_inner = score_block.inner(chunks[1]);
    score_block.render(chunks[1], frame.buffer_mut());
    let score_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Chain: ", title_style),
            Span::styled(state.chain().to_string(), fg_style),
        ]),
    ];
    Paragraph::new(score_lines).render(score_inner, frame.buffer_mut());

    // --- Controls ---
    let controls_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled("Controls", title_style));
    let controls_inner = controls_block.inner(chunks[2]);
    controls_block.render(chunks[2], frame.buffer_mut());
    let key_style = Style::default().fg(theme.puyo_color(Puyo::Blue));
    let controls = [
        ("←/→", "move"),
        ("↑ x", "rotate right"),
        ("z", "rotate left"),
        ("↓", "drop"),
        ("Space", "start"),
        ("R", "reset"),
        ("Q", "quit"),
    ];
    let lines: Vec<Line> = controls
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:<6}"), key_style),
                Span::styled(*what, fg_style),
            ])
        })
        .collect();
    Paragraph::new(lines).render(controls_inner, frame.buffer_mut());
}

/// Next pair drawn upright, as it will spawn: sub on top of main.
fn draw_next_pair(frame: &mut Frame, theme: &Theme, area: Rect, pair: Pair) {
    let x = area.x + area.width.saturating_sub(CELL_WIDTH) / 2;
    let buf = frame.buffer_mut();
    for (dy, puyo) in [(0u16, pair.sub), (1, pair.main)] {
        if dy < area.height {
            let color = theme.puyo_color(puyo);
            buf.set_string(x, area.y + dy, PUYO_GLYPH, Style::default().fg(color).bg(theme.bg));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_marks_grow_then_cap() {
        let theme = Theme::default();
        assert_eq!(chain_banner(1, &theme).0, " 1 chain! ");
        assert_eq!(chain_banner(3, &theme).0, " 3 chain!!! ");
        assert_eq!(chain_banner(7, &theme).0, " 7 chain!!!!! ");
        assert_eq!(chain_banner(7, &theme).1, Color::Magenta);
        assert_eq!(chain_banner(2, &theme).1, theme.puyo_color(Puyo::Green));
    }

    #[test]
    fn cells_stay_inside_the_board() {
        let inner = Rect::new(1, 1, COLS as u16 * CELL_WIDTH, ROWS as u16);
        assert_eq!(cell_rect(inner, 0, 0), Some(Rect::new(1, 1, 2, 1)));
        assert!(cell_rect(inner, COLS - 1, ROWS - 1).is_some());
        assert!(cell_rect(inner, COLS, 0).is_none());
    }

    #[test]
    fn popped_cells_cover_both_columns() {
        let inner = Rect::new(0, 0, 12, 12);
        let set = popped_buffer_positions(inner, &[(1, 3)]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&(2, 3)) && set.contains(&(3, 3)));
    }
}
