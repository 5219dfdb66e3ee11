//! Drawing the active outline buffer and the status bar.

use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::surface::TextSurface;
use crate::tree::render::{CLOSED_MARKER, OPENED_MARKER, UP_LINE};

pub fn render(app: &mut App, frame: &mut Frame) {
    let [main, status] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

    if let Some(surface) = app.window.active_surface_mut() {
        surface.set_viewport_height(main.height as usize);
    }

    let Some(surface) = app.window.active_surface() else {
        frame.render_widget(Paragraph::new("no outline open"), main);
        return;
    };

    let scroll = surface.scroll();
    let cursor = surface.cursor_line();
    let lines: Vec<Line> = surface
        .text()
        .lines()
        .enumerate()
        .skip(scroll)
        .take(main.height as usize)
        .map(|(number, raw)| {
            let mut style = if number == 0 {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else if raw == UP_LINE {
                Style::default().fg(Color::DarkGray)
            } else if raw.ends_with(OPENED_MARKER) || raw.ends_with(CLOSED_MARKER) {
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            if surface.marks().contains(&number) {
                style = style.fg(Color::Black).bg(Color::Yellow);
            }
            if number == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Line::styled(raw.to_string(), style)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), main);

    let left = format!(
        " {} [{}/{}]",
        surface.title(),
        app.window
            .active_surface_id()
            .map(|id| id.0)
            .unwrap_or_default(),
        app.window.surface_count()
    );
    let text = match app.status() {
        Some(message) => format!("{left} | {message}"),
        None => format!("{left} | Enter open · Space mark · p parent · u up · r refresh · q quit"),
    };
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Black).bg(Color::Gray)),
        status,
    );
}
