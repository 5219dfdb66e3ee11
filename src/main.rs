mod app;
mod commands;
mod config;
mod error;
mod event;
mod handler;
mod session;
mod store;
mod surface;
mod tree;
mod tui;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::app::App;
use crate::config::{AppConfig, TreeConfig};
use crate::event::{Event, EventHandler};
use crate::tui::{install_panic_hook, Tui};

/// A filesystem outline viewer: an indented tree kept in sync with disk,
/// restorable from its own rendered text.
#[derive(Parser, Debug)]
#[command(name = "treedit", version, about)]
struct Cli {
    /// Paths to show: directories become project folders, a file is
    /// revealed inside its enclosing tree (defaults to the current
    /// directory)
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// Explicit config file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip restoring saved outline sessions (and don't save on exit)
    #[arg(long)]
    no_restore: bool,

    /// Preserve expansion state across reordering renames
    #[arg(long)]
    stable_reconcile: bool,
}

/// Log to a file when $TREEDIT_LOG names one; a TUI owns stdout.
fn init_tracing() {
    if let Ok(log_path) = std::env::var("TREEDIT_LOG") {
        use tracing_subscriber::prelude::*;
        use tracing_subscriber::{fmt, EnvFilter};
        let Ok(log_file) = std::fs::File::create(&log_path) else {
            eprintln!("Warning: cannot create log file {log_path}");
            return;
        };
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "treedit=debug".into()))
            .with(fmt::layer().with_writer(log_file).with_ansi(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> error::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let overrides = AppConfig {
        tree: TreeConfig {
            stable_reconcile: cli.stable_reconcile.then_some(true),
        },
        ..Default::default()
    };
    let config = AppConfig::load(cli.config.as_deref(), Some(&overrides));

    let mut paths = Vec::new();
    for path in &cli.paths {
        let canonical = path.canonicalize().map_err(|_| {
            error::AppError::InvalidPath(format!("{} does not exist", path.display()))
        })?;
        paths.push(canonical);
    }
    let folders: Vec<PathBuf> = paths.iter().filter(|p| p.is_dir()).cloned().collect();
    let initial = paths.first().cloned();

    let persist = config.restore_enabled() && !cli.no_restore;
    let session_dir = config.session_dir();

    install_panic_hook();

    let mut tui = Tui::new()?;
    let mut app = App::new(config, folders);
    let mut events = EventHandler::new(Duration::from_millis(16));

    if persist {
        store::restore_session(&session_dir, &mut app.sessions, &mut app.window);
    }
    if let Some(target) = initial {
        let mode = app.reconcile_mode();
        if let Err(err) = commands::reveal(&mut app.sessions, &mut app.window, &target, mode) {
            app.set_status_message(err.to_string());
        }
    }

    loop {
        tui.terminal_mut().draw(|frame| {
            ui::render(&mut app, frame);
        })?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Tick => {}
            Event::Resize(_, _) => {}
        }

        for path in app.window.take_open_requests() {
            if let Err(err) = open_in_editor(&mut tui, &app, &path) {
                app.set_status_message(err.to_string());
            }
        }

        if app.should_quit {
            break;
        }
    }

    if persist {
        if let Err(err) = store::save_session(&session_dir, &app.sessions, &app.window) {
            tracing::warn!(%err, "failed to save session");
        }
    }

    tui.restore()?;
    Ok(())
}

/// Suspend the TUI, run the user's editor on the file, and take the
/// terminal back.
fn open_in_editor(tui: &mut Tui, app: &App, path: &std::path::Path) -> error::Result<()> {
    let command = app
        .config
        .editor()
        .map(str::to_string)
        .or_else(|| std::env::var("VISUAL").ok())
        .or_else(|| std::env::var("EDITOR").ok())
        .unwrap_or_else(|| "vi".into());
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| error::AppError::Terminal("empty editor command".into()))?;

    tui.suspend()?;
    let status = std::process::Command::new(program)
        .args(parts)
        .arg(path)
        .status();
    tui.resume()?;

    match status {
        Ok(code) if code.success() => Ok(()),
        Ok(code) => Err(error::AppError::Terminal(format!(
            "editor exited with {code}"
        ))),
        Err(err) => Err(error::AppError::Terminal(format!(
            "failed to launch {program}: {err}"
        ))),
    }
}
