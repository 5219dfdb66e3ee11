//! Key bindings: translate terminal input into engine commands.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::commands::{self, Activation};

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('j') | KeyCode::Down => move_cursor(app, 1),
        KeyCode::Char('k') | KeyCode::Up => move_cursor(app, -1),
        KeyCode::PageDown => move_cursor(app, 20),
        KeyCode::PageUp => move_cursor(app, -20),
        KeyCode::Char('g') | KeyCode::Home => cursor_to_edge(app, true),
        KeyCode::Char('G') | KeyCode::End => cursor_to_edge(app, false),

        KeyCode::Enter | KeyCode::Char('o') => activate(app),
        KeyCode::Char(' ') => {
            if let Some(surface) = app.window.active_surface_mut() {
                surface.toggle_mark();
            }
        }
        KeyCode::Esc => {
            if let Some(surface) = app.window.active_surface_mut() {
                surface.clear_marks();
            }
        }

        KeyCode::Char('p') | KeyCode::Backspace => jump_to_parent(app),
        KeyCode::Char('u') => ascend(app),
        KeyCode::Char('r') => refresh(app),
        KeyCode::Tab => app.window.cycle_surface(),
        KeyCode::Char('x') => close_active(app),

        _ => {}
    }
}

fn move_cursor(app: &mut App, delta: isize) {
    if let Some(surface) = app.window.active_surface_mut() {
        surface.move_cursor(delta);
    }
}

fn cursor_to_edge(app: &mut App, top: bool) {
    if let Some(surface) = app.window.active_surface_mut() {
        if top {
            surface.cursor_to(0);
        } else {
            surface.move_cursor(isize::MAX / 2);
        }
    }
}

fn activate(app: &mut App) {
    let Some(surface_id) = app.window.active_surface_id() else {
        return;
    };
    let mode = app.reconcile_mode();
    match commands::activate_selection(&mut app.sessions, &mut app.window, surface_id, mode) {
        Ok(Activation::OpenedFiles(paths)) => {
            app.set_status_message(format!("opening {} file(s)", paths.len()));
        }
        Ok(Activation::ToggledFolders(_)) | Ok(Activation::AscendedRoot) => {}
        Err(err) => app.set_status_message(err.to_string()),
    }
}

fn jump_to_parent(app: &mut App) {
    let Some(surface_id) = app.window.active_surface_id() else {
        return;
    };
    if let Err(err) = commands::jump_to_parent(&app.sessions, &mut app.window, surface_id) {
        app.set_status_message(err.to_string());
    }
}

fn ascend(app: &mut App) {
    let Some(surface_id) = app.window.active_surface_id() else {
        return;
    };
    if let Err(err) = commands::ascend_root(&mut app.sessions, &mut app.window, surface_id) {
        app.set_status_message(err.to_string());
    }
}

fn close_active(app: &mut App) {
    let Some(surface_id) = app.window.active_surface_id() else {
        return;
    };
    app.window.close_surface(surface_id);
    app.sessions.prune(&app.window);
}

fn refresh(app: &mut App) {
    let Some(surface_id) = app.window.active_surface_id() else {
        return;
    };
    let mode = app.reconcile_mode();
    if let Err(err) = commands::refresh_tree(&mut app.sessions, &mut app.window, surface_id, mode) {
        app.set_status_message(err.to_string());
    }
}
