//! Terminal heatmap of the correlation matrix.
//!
//! One annotated cell per asset pair, coloured on a diverging blue-white-red
//! scale centred on zero. Shown full-screen until [q]/[Esc]; matrices larger
//! than the terminal scroll with the arrow keys.

use std::io::{self, stdout};
use std::time::Duration;

use crossterm::{
    cursor::Show,
    event::{self, Event as CEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph};

use crate::types::CorrelationMatrix;

pub const TITLE: &str = "Correlation Matrix of Log Returns";

const CELL_WIDTH: u16 = 7;

// ─── Colour scale ───

const COOL: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

fn lerp(a: (f64, f64, f64), b: (f64, f64, f64), t: f64) -> Color {
    let ch = |x: f64, y: f64| (x + (y - x) * t).round().clamp(0.0, 255.0) as u8;
    Color::Rgb(ch(a.0, b.0), ch(a.1, b.1), ch(a.2, b.2))
}

/// Diverging colour for a value in [-1, 1]; NaN is grey.
pub fn coolwarm(v: f64) -> Color {
    if !v.is_finite() {
        return Color::DarkGray;
    }
    let v = v.clamp(-1.0, 1.0);
    if v < 0.0 {
        lerp(NEUTRAL, COOL, -v)
    } else {
        lerp(NEUTRAL, WARM, v)
    }
}

fn cell_style(v: f64) -> Style {
    let fg = if v.abs() > 0.6 { Color::White } else { Color::Black };
    Style::default().fg(fg).bg(coolwarm(v))
}

// ─── Widget ───

/// Top-left cell of the visible window, in asset indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewport {
    pub row: usize,
    pub col: usize,
}

impl Viewport {
    /// Keep the window inside the matrix once `rows` x `cols` cells fit on screen.
    pub fn clamp(&mut self, n: usize, (rows, cols): (usize, usize)) {
        self.row = self.row.min(n.saturating_sub(rows));
        self.col = self.col.min(n.saturating_sub(cols));
    }
}

pub struct Heatmap<'a> {
    corr: &'a CorrelationMatrix,
    view: Viewport,
}

impl<'a> Heatmap<'a> {
    pub fn new(corr: &'a CorrelationMatrix) -> Self {
        Self {
            corr,
            view: Viewport::default(),
        }
    }

    pub fn viewport(mut self, view: Viewport) -> Self {
        self.view = view;
        self
    }
}

fn fit(s: &str, width: usize) -> String {
    let mut out: String = s.chars().take(width).collect();
    while out.chars().count() < width {
        out.push(' ');
    }
    out
}

fn label_width(corr: &CorrelationMatrix) -> u16 {
    corr.assets
        .iter()
        .map(|a| a.chars().count())
        .max()
        .unwrap_or(0)
        .min(12) as u16
        + 1
}

/// Whole (rows, cols) of cells that fit in `area`, border and labels excluded.
pub fn capacity(corr: &CorrelationMatrix, area: Rect) -> (usize, usize) {
    let inner = Block::bordered().inner(area);
    let rows = inner.height.saturating_sub(1) as usize;
    let cols = (inner.width.saturating_sub(label_width(corr)) / CELL_WIDTH) as usize;
    (rows, cols)
}

impl Widget for Heatmap<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::bordered()
            .title(TITLE)
            .border_style(Style::new().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 {
            return;
        }

        let n = self.corr.n_assets();
        let (rows, cols) = capacity(self.corr, area);
        let mut view = self.view;
        view.clamp(n, (rows, cols));
        let row_end = (view.row + rows).min(n);
        let col_end = (view.col + cols).min(n);

        let label_w = label_width(self.corr);
        let cw = CELL_WIDTH as usize;
        let cell_x = |j: usize| inner.x + label_w + (j - view.col) as u16 * CELL_WIDTH;

        // column labels
        for j in view.col..col_end {
            let label = format!("{:^cw$}", fit(&self.corr.assets[j], cw - 1));
            buf.set_string(cell_x(j), inner.y, label, Style::new().bold());
        }

        for i in view.row..row_end {
            let y = inner.y + 1 + (i - view.row) as u16;
            buf.set_string(
                inner.x,
                y,
                fit(&self.corr.assets[i], label_w as usize),
                Style::new().bold(),
            );
            for j in view.col..col_end {
                let v = self.corr.get(i, j);
                buf.set_string(cell_x(j), y, format!("{:^cw$.2}", v), cell_style(v));
            }
        }
    }
}

// ─── Interactive display ───

fn span(start: usize, shown: usize, n: usize) -> String {
    if shown == 0 || n == 0 {
        return format!("none of {}", n);
    }
    format!("{}-{} of {}", start + 1, (start + shown).min(n), n)
}

fn draw(corr: &CorrelationMatrix, view: &mut Viewport, frame: &mut Frame) {
    let [body, footer] =
        Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());
    let n = corr.n_assets();
    let (rows, cols) = capacity(corr, body);
    view.clamp(n, (rows, cols));
    frame.render_widget(Heatmap::new(corr).viewport(*view), body);

    let text = format!(
        " [q] Quit  [arrows/PgUp/PgDn/Home] Scroll   rows {}  cols {}   blue -1 .. 0 white .. +1 red",
        span(view.row, rows, n),
        span(view.col, cols, n),
    );
    Paragraph::new(text)
        .style(Style::default().fg(Color::Black).bg(Color::DarkGray))
        .render(footer, frame.buffer_mut());
}

const PAGE: usize = 10;

/// Apply one key to the viewport. Returns true to quit.
fn handle_key(code: KeyCode, view: &mut Viewport) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Down | KeyCode::Char('j') => view.row += 1,
        KeyCode::Up | KeyCode::Char('k') => view.row = view.row.saturating_sub(1),
        KeyCode::Right | KeyCode::Char('l') => view.col += 1,
        KeyCode::Left | KeyCode::Char('h') => view.col = view.col.saturating_sub(1),
        KeyCode::PageDown => view.row += PAGE,
        KeyCode::PageUp => view.row = view.row.saturating_sub(PAGE),
        KeyCode::Home => *view = Viewport::default(),
        _ => {}
    }
    false
}

/// Fold results in order, keeping the first error.
fn first_error(results: impl IntoIterator<Item = io::Result<()>>) -> io::Result<()> {
    results.into_iter().fold(Ok(()), |acc, r| acc.and(r))
}

fn event_loop(corr: &CorrelationMatrix) -> io::Result<()> {
    execute!(stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let mut view = Viewport::default();
    loop {
        terminal.draw(|frame| draw(corr, &mut view, frame))?;
        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(key.code, &mut view) {
                    return Ok(());
                }
            }
        }
    }
}

/// Block on a full-screen heatmap until the user quits.
pub fn show(corr: &CorrelationMatrix) -> io::Result<()> {
    enable_raw_mode()?;
    let result = event_loop(corr);

    // every restore step runs even if an earlier one failed
    let restore = [
        disable_raw_mode(),
        execute!(stdout(), LeaveAlternateScreen),
        execute!(stdout(), Show),
    ];
    first_error(std::iter::once(result).chain(restore))
}
