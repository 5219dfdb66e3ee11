//! Saving and restoring outline sessions.
//!
//! Nothing is serialized beyond the rendered text itself: each tree-bound
//! surface's outline is written to a file on exit, and on start each file
//! is re-parsed into a fresh tree (which also reconciles it against the
//! current state of the disk).

use std::fs;
use std::path::Path;

use crate::commands;
use crate::error::Result;
use crate::session::{SessionManager, Tree};
use crate::surface::{TextSurface, WindowHost};
use crate::tree::restore::parse_outline;

const OUTLINE_EXT: &str = "outline";

/// Write every tree-bound surface of `host`'s window to `dir`, replacing
/// whatever was saved there before. Returns how many outlines were written.
pub fn save_session<H: WindowHost>(
    dir: &Path,
    sessions: &SessionManager,
    host: &H,
) -> Result<usize> {
    fs::create_dir_all(dir)?;
    for stale in saved_outline_paths(dir)? {
        fs::remove_file(stale)?;
    }

    let window = host.id();
    let mut written = 0;
    for tree in sessions.iter().filter(|t| t.window == window) {
        let Some(surface) = host.surface(tree.surface) else {
            continue;
        };
        let file = dir.join(format!("{:03}.{OUTLINE_EXT}", written));
        fs::write(&file, surface.text())?;
        written += 1;
    }
    tracing::info!(written, dir = %dir.display(), "saved session outlines");
    Ok(written)
}

/// Re-parse every saved outline in `dir` into a new tree bound to a fresh
/// surface. Files that are not valid tree sessions are skipped with a
/// warning. Returns how many trees were restored.
pub fn restore_session<H: WindowHost>(
    dir: &Path,
    sessions: &mut SessionManager,
    host: &mut H,
) -> usize {
    let Ok(paths) = saved_outline_paths(dir) else {
        return 0;
    };

    let window = host.id();
    let mut restored = 0;
    for path in paths {
        let Ok(text) = fs::read_to_string(&path) else {
            tracing::warn!(path = %path.display(), "unreadable session outline, skipping");
            continue;
        };
        let Some(root) = parse_outline(&text) else {
            tracing::warn!(path = %path.display(), "not a tree session, skipping");
            continue;
        };
        let surface_id = host.create_surface();
        let surface = host
            .surface_mut(surface_id)
            .expect("surface was just created");
        commands::sync_surface(&root, surface);
        sessions.insert(Tree {
            window,
            surface: surface_id,
            root,
        });
        restored += 1;
    }
    tracing::info!(restored, "restored session outlines");
    restored
}

fn saved_outline_paths(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == OUTLINE_EXT))
        .collect();
    paths.sort();
    Ok(paths)
}
