//! Engine operations: everything a key binding or restore trigger can do to
//! a tree, expressed against the host boundary traits.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::session::{SessionManager, Tree};
use crate::surface::{SurfaceId, TextSurface, WindowHost};
use crate::tree::{render, walk, Entry, ReconcileMode};

/// What an activate (open) request ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    OpenedFiles(Vec<PathBuf>),
    ToggledFolders(usize),
    AscendedRoot,
}

/// Rewrite a surface from scratch with the tree's rendered outline.
///
/// A total rewrite each time: trees are interactively small, and the
/// simplicity pays for itself in the restore contract. Selection is kept
/// (clamped) across the rewrite.
pub fn sync_surface<S: TextSurface>(root: &Entry, surface: &mut S) {
    let selection = surface.selection_lines();
    surface.set_read_only(false);
    let len = surface.text().len();
    surface.erase(0, len);
    surface.insert(0, &render::render_outline(root));
    surface.select_lines(&selection);
    surface.set_title(&root.display_name());
    surface.set_read_only(true);
}

/// Reveal a path: find or create the tree that claims it, materialize the
/// ancestor chain, rewrite the surface if anything changed, and put the
/// cursor on the target's line.
pub fn reveal<H: WindowHost>(
    sessions: &mut SessionManager,
    host: &mut H,
    path: &Path,
    mode: ReconcileMode,
) -> Result<SurfaceId> {
    let window = host.id();
    sessions.prune(host);

    let (surface_id, mut dirty) = match sessions.claiming_tree_mut(window, path) {
        Some(tree) => (tree.surface, false),
        None => {
            let root_path = choose_root(host, path)?;
            let surface = host.create_surface();
            tracing::debug!(root = %root_path.display(), "creating tree");
            sessions.insert(Tree {
                window,
                surface,
                root: Entry::new(&root_path),
            });
            (surface, true)
        }
    };

    let tree = sessions
        .tree_for_surface_mut(window, surface_id)
        .expect("tree was just found or inserted");
    let rel: Vec<OsString> = path
        .strip_prefix(&tree.root.path)
        .map_err(|_| {
            AppError::InvalidPath(format!(
                "{} is outside the tree rooted at {}",
                path.display(),
                tree.root.path.display()
            ))
        })?
        .iter()
        .map(|c| c.to_os_string())
        .collect();

    // Materialize missing or unopened ancestors along the chain.
    let mut node = &mut tree.root;
    if !node.is_opened() || !node.has_loaded_children() {
        node.set_opened(true);
        node.refresh(mode)?;
        dirty = true;
    }
    for part in &rel {
        if !node.is_opened() || node.child_by_name(part).is_none() {
            node.set_opened(true);
            node.refresh(mode)?;
            dirty = true;
        }
        node = node.child_by_name_mut(part).ok_or_else(|| {
            AppError::InvalidPath(format!("{} does not exist on disk", path.display()))
        })?;
    }

    let tree = sessions
        .tree_for_surface(window, surface_id)
        .expect("tree still registered");
    let surface = host
        .surface_mut(surface_id)
        .ok_or_else(|| AppError::Terminal("tree surface vanished".into()))?;
    if dirty {
        sync_surface(&tree.root, surface);
    }

    // Locate the target's line by exact pattern search, one component at a
    // time. A miss means the text and the tree have diverged: hard error.
    let mut node = &tree.root;
    let mut offset = 0;
    let mut line = 1;
    for (depth, part) in rel.iter().enumerate() {
        node = node.child_by_name(part).ok_or_else(|| {
            AppError::Desync(format!("{} missing from materialized tree", path.display()))
        })?;
        let needle = render::render_line(node, depth);
        let hit = surface.find_line(&needle, offset).ok_or_else(|| {
            AppError::Desync(format!("rendered line `{needle}` not found"))
        })?;
        offset = hit.end + 1;
        line = hit.line;
    }
    surface.select_lines(&[line]);
    surface.scroll_to_line(line);
    host.focus_surface(surface_id);
    Ok(surface_id)
}

/// Pick the root for a brand new tree: the enclosing project folder if any,
/// otherwise the path's parent.
fn choose_root<H: WindowHost>(host: &H, path: &Path) -> Result<PathBuf> {
    if let Some(folder) = host
        .project_folders()
        .into_iter()
        .find(|folder| path.starts_with(folder))
    {
        return Ok(folder);
    }
    path.parent().map(Path::to_path_buf).ok_or_else(|| {
        AppError::InvalidPath(format!("{} has no parent directory", path.display()))
    })
}

/// Act on the selected lines: open files, toggle folders, or ascend when
/// the up-control is selected. Mixing files and folders is rejected with no
/// partial action.
pub fn activate_selection<H: WindowHost>(
    sessions: &mut SessionManager,
    host: &mut H,
    surface_id: SurfaceId,
    mode: ReconcileMode,
) -> Result<Activation> {
    let window = host.id();
    let lines = host
        .surface(surface_id)
        .ok_or_else(|| AppError::Terminal("no such surface".into()))?
        .selection_lines();
    let Some(&first) = lines.first() else {
        return Err(AppError::no_selection());
    };

    if first <= 1 {
        if lines.len() > 1 {
            return Err(AppError::Selection(
                "to go up a level, only have the cursor on the up line (..)".into(),
            ));
        }
        if first == 0 {
            return Err(AppError::Selection("the path header is not actionable".into()));
        }
        ascend_root(sessions, host, surface_id)?;
        return Ok(Activation::AscendedRoot);
    }

    let tree = sessions
        .tree_for_surface_mut(window, surface_id)
        .ok_or_else(|| AppError::Terminal("no tree bound to this surface".into()))?;

    // Snapshot the targets before mutating anything: toggling shifts line
    // numbers, so targets are re-found by path afterwards. Traversal
    // ordinals start at the root; visible descendants start at ordinal 1.
    let wanted: BTreeSet<usize> = lines
        .iter()
        .filter_map(|&l| walk::ordinal_of_line(l))
        .collect();
    let mut targets: Vec<(bool, PathBuf)> = Vec::new();
    for (index, entry) in walk::entries(&tree.root).enumerate() {
        if wanted.contains(&(index + 1)) {
            targets.push((entry.is_dir(), entry.path.clone()));
        }
    }
    if targets.len() != wanted.len() {
        return Err(AppError::Desync("selection is beyond the tree".into()));
    }

    if targets.iter().all(|(is_dir, _)| !is_dir) {
        let paths: Vec<PathBuf> = targets.into_iter().map(|(_, p)| p).collect();
        for path in &paths {
            host.open_file(path)?;
        }
        Ok(Activation::OpenedFiles(paths))
    } else if targets.iter().all(|(is_dir, _)| *is_dir) {
        let mut failed = None;
        for (_, path) in &targets {
            let node = tree
                .root
                .find_path_mut(path)
                .ok_or_else(|| AppError::Desync(format!("{} left the tree", path.display())))?;
            if let Err(err) = node.toggle(mode) {
                failed = Some(err);
                break;
            }
        }
        let count = targets.len();
        let tree = sessions
            .tree_for_surface(window, surface_id)
            .expect("tree still registered");
        let surface = host
            .surface_mut(surface_id)
            .ok_or_else(|| AppError::Terminal("tree surface vanished".into()))?;
        sync_surface(&tree.root, surface);
        match failed {
            Some(err) => Err(err),
            None => Ok(Activation::ToggledFolders(count)),
        }
    } else {
        Err(AppError::mixed_selection())
    }
}

/// Zoom the tree out one level: the root's parent becomes the new root,
/// with the old root grafted in unchanged.
pub fn ascend_root<H: WindowHost>(
    sessions: &mut SessionManager,
    host: &mut H,
    surface_id: SurfaceId,
) -> Result<()> {
    let window = host.id();
    let tree = sessions
        .tree_for_surface_mut(window, surface_id)
        .ok_or_else(|| AppError::Terminal("no tree bound to this surface".into()))?;
    tree.root = tree.root.make_parent()?;
    let surface = host
        .surface_mut(surface_id)
        .ok_or_else(|| AppError::Terminal("tree surface vanished".into()))?;
    let tree = sessions
        .tree_for_surface(window, surface_id)
        .expect("tree still registered");
    sync_surface(&tree.root, surface);
    Ok(())
}

/// Move each selected line's cursor to its parent's line, resolving parents
/// through the ancestor-stack traversal and stopping as soon as every
/// selected line is accounted for.
pub fn jump_to_parent<H: WindowHost>(
    sessions: &SessionManager,
    host: &mut H,
    surface_id: SurfaceId,
) -> Result<()> {
    let window = host.id();
    let surface = host
        .surface(surface_id)
        .ok_or_else(|| AppError::Terminal("no such surface".into()))?;
    let lines = surface.selection_lines();
    let Some(&first) = lines.first() else {
        return Err(AppError::no_selection());
    };
    if first <= 1 {
        return Err(AppError::Selection(
            "to go up a level, use the open command on the up line (..)".into(),
        ));
    }
    let visible = surface.visible_lines();
    let show_line = lines.iter().copied().find(|l| visible.contains(l));

    let tree = sessions
        .tree_for_surface(window, surface_id)
        .ok_or_else(|| AppError::Terminal("no tree bound to this surface".into()))?;

    let mut parent_lines = Vec::new();
    let mut scroll_target = None;
    let mut next = 0;
    let _ = walk::with_ancestry(&tree.root, |stack| {
        let (ordinal, _) = *stack.last().expect("stack is never empty");
        let line = walk::line_of_ordinal(ordinal);
        while next < lines.len() && lines[next] == line {
            let parent_line = walk::line_of_ordinal(stack[stack.len() - 2].0);
            parent_lines.push(parent_line);
            if show_line == Some(line) {
                scroll_target = Some(parent_line);
            }
            next += 1;
        }
        if next == lines.len() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    if parent_lines.is_empty() {
        return Err(AppError::Desync("selection is beyond the tree".into()));
    }
    parent_lines.sort_unstable();
    parent_lines.dedup();

    let surface = host
        .surface_mut(surface_id)
        .ok_or_else(|| AppError::Terminal("no such surface".into()))?;
    surface.select_lines(&parent_lines);
    if let Some(target) = scroll_target {
        surface.scroll_to_line(target);
    }
    Ok(())
}

/// External sync trigger: re-list every opened directory in the tree and
/// rewrite the surface.
pub fn refresh_tree<H: WindowHost>(
    sessions: &mut SessionManager,
    host: &mut H,
    surface_id: SurfaceId,
    mode: ReconcileMode,
) -> Result<()> {
    let window = host.id();
    let tree = sessions
        .tree_for_surface_mut(window, surface_id)
        .ok_or_else(|| AppError::Terminal("no tree bound to this surface".into()))?;
    let result = refresh_opened(&mut tree.root, mode);
    tracing::debug!(visible = walk::paths(&tree.root).count(), "tree refreshed");
    let tree = sessions
        .tree_for_surface(window, surface_id)
        .expect("tree still registered");
    let surface = host
        .surface_mut(surface_id)
        .ok_or_else(|| AppError::Terminal("tree surface vanished".into()))?;
    // A failed refresh may still have updated part of the tree; the surface
    // has to track it either way.
    sync_surface(&tree.root, surface);
    result
}

fn refresh_opened(entry: &mut Entry, mode: ReconcileMode) -> Result<()> {
    entry.refresh(mode)?;
    if !entry.is_opened() {
        return Ok(());
    }
    if let Some(children) = entry.children_mut() {
        for child in children {
            if child.is_opened() {
                refresh_opened(child, mode)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::TerminalWindow;
    use std::fs::{self, File};
    use tempfile::TempDir;

    const MODE: ReconcileMode = ReconcileMode::Forward;

    /// `outer/proj` with `src/main.ext`, `docs/` and `readme.md`.
    fn setup_project() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let proj = dir.path().join("outer").join("proj");
        fs::create_dir_all(proj.join("src")).unwrap();
        fs::create_dir(proj.join("docs")).unwrap();
        File::create(proj.join("src").join("main.ext")).unwrap();
        File::create(proj.join("readme.md")).unwrap();
        (dir, proj)
    }

    fn setup_host(proj: &Path) -> (SessionManager, TerminalWindow) {
        (
            SessionManager::new(),
            TerminalWindow::new(vec![proj.to_path_buf()]),
        )
    }

    fn surface_lines(window: &TerminalWindow, id: SurfaceId) -> Vec<String> {
        window
            .surface(id)
            .unwrap()
            .text()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn reveal_builds_tree_and_selects_target_line() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);

        let id = reveal(
            &mut sessions,
            &mut window,
            &proj.join("src").join("main.ext"),
            MODE,
        )
        .unwrap();

        let lines = surface_lines(&window, id);
        assert_eq!(lines[0], proj.to_string_lossy());
        assert_eq!(lines[1], "..");
        assert_eq!(lines[2], "docs ▶");
        assert_eq!(lines[3], "readme.md");
        assert_eq!(lines[4], "src ▼");
        assert_eq!(lines[5], "    main.ext");
        assert_eq!(window.surface(id).unwrap().selection_lines(), vec![5]);

        let tree = sessions.tree_for_surface(window.id(), id).unwrap();
        assert_eq!(tree.root.path, proj);
    }

    #[test]
    fn reveal_reuses_the_claiming_tree() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);

        let first = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();
        let second = reveal(
            &mut sessions,
            &mut window,
            &proj.join("src").join("main.ext"),
            MODE,
        )
        .unwrap();

        assert_eq!(first, second);
        assert_eq!(sessions.len(), 1);
        assert_eq!(window.surface_count(), 1);
    }

    #[test]
    fn reveal_outside_project_folders_roots_at_parent() {
        let (dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let stray = dir.path().join("stray.txt");
        File::create(&stray).unwrap();

        let id = reveal(&mut sessions, &mut window, &stray, MODE).unwrap();
        let tree = sessions.tree_for_surface(window.id(), id).unwrap();
        assert_eq!(tree.root.path, dir.path());
    }

    #[test]
    fn reveal_missing_path_is_invalid() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);

        let err = reveal(&mut sessions, &mut window, &proj.join("ghost.txt"), MODE).unwrap_err();
        assert!(matches!(err, AppError::InvalidPath(_)));
    }

    #[test]
    fn activate_file_line_queues_open() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();

        // reveal left the cursor on readme.md's line
        let result = activate_selection(&mut sessions, &mut window, id, MODE).unwrap();
        assert_eq!(
            result,
            Activation::OpenedFiles(vec![proj.join("readme.md")])
        );
        assert_eq!(window.take_open_requests(), vec![proj.join("readme.md")]);
    }

    #[test]
    fn activate_folder_line_toggles_it() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();

        window.surface_mut(id).unwrap().cursor_to(2); // docs ▶
        let result = activate_selection(&mut sessions, &mut window, id, MODE).unwrap();
        assert_eq!(result, Activation::ToggledFolders(1));
        assert_eq!(surface_lines(&window, id)[2], "docs ▼");

        let result = activate_selection(&mut sessions, &mut window, id, MODE).unwrap();
        assert_eq!(result, Activation::ToggledFolders(1));
        assert_eq!(surface_lines(&window, id)[2], "docs ▶");
    }

    #[test]
    fn activate_mixed_selection_is_rejected_without_action() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();

        window.surface_mut(id).unwrap().select_lines(&[2, 3]); // docs + readme.md
        let err = activate_selection(&mut sessions, &mut window, id, MODE).unwrap_err();
        assert!(matches!(err, AppError::Selection(_)));
        assert_eq!(surface_lines(&window, id)[2], "docs ▶");
        assert!(window.take_open_requests().is_empty());
    }

    #[test]
    fn activate_up_line_ascends_the_root() {
        let (dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();

        window.surface_mut(id).unwrap().cursor_to(1);
        let result = activate_selection(&mut sessions, &mut window, id, MODE).unwrap();
        assert_eq!(result, Activation::AscendedRoot);

        let tree = sessions.tree_for_surface(window.id(), id).unwrap();
        assert_eq!(tree.root.path, dir.path().join("outer"));
        // The old root is grafted in, still expanded.
        let lines = surface_lines(&window, id);
        assert_eq!(lines[2], "proj ▼");
        assert!(lines.contains(&"    readme.md".to_string()));
    }

    #[test]
    fn activate_up_line_with_more_selected_is_rejected() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();

        window.surface_mut(id).unwrap().select_lines(&[1, 3]);
        let err = activate_selection(&mut sessions, &mut window, id, MODE).unwrap_err();
        assert!(matches!(err, AppError::Selection(_)));
    }

    #[test]
    fn activate_header_line_is_rejected() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();

        window.surface_mut(id).unwrap().cursor_to(0);
        let err = activate_selection(&mut sessions, &mut window, id, MODE).unwrap_err();
        assert!(matches!(err, AppError::Selection(_)));
    }

    #[test]
    fn jump_to_parent_climbs_to_the_root_sentinel() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(
            &mut sessions,
            &mut window,
            &proj.join("src").join("main.ext"),
            MODE,
        )
        .unwrap();

        // main.ext is on line 5, its parent src on line 4.
        jump_to_parent(&sessions, &mut window, id).unwrap();
        assert_eq!(window.surface(id).unwrap().selection_lines(), vec![4]);

        // src is top-level: its parent is the up-control line.
        jump_to_parent(&sessions, &mut window, id).unwrap();
        assert_eq!(window.surface(id).unwrap().selection_lines(), vec![1]);

        let err = jump_to_parent(&sessions, &mut window, id).unwrap_err();
        assert!(matches!(err, AppError::Selection(_)));
    }

    #[test]
    fn refresh_tree_picks_up_disk_changes() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(
            &mut sessions,
            &mut window,
            &proj.join("src").join("main.ext"),
            MODE,
        )
        .unwrap();

        File::create(proj.join("src").join("new.ext")).unwrap();
        refresh_tree(&mut sessions, &mut window, id, MODE).unwrap();

        let lines = surface_lines(&window, id);
        assert!(lines.contains(&"    new.ext".to_string()));
        assert_eq!(lines[4], "src ▼");
    }

    #[test]
    fn refresh_failure_still_rewrites_the_surface() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        fs::create_dir(proj.join("src").join("sub")).unwrap();
        File::create(proj.join("src").join("sub").join("inner.ext")).unwrap();
        let id = reveal(
            &mut sessions,
            &mut window,
            &proj.join("src").join("sub").join("inner.ext"),
            MODE,
        )
        .unwrap();

        // Replace the opened subdirectory with a same-named file, and add a
        // new top-level file the refresh will pick up before it fails.
        fs::remove_dir_all(proj.join("src").join("sub")).unwrap();
        File::create(proj.join("src").join("sub")).unwrap();
        File::create(proj.join("zz.txt")).unwrap();

        let err = refresh_tree(&mut sessions, &mut window, id, MODE).unwrap_err();
        assert!(matches!(err, AppError::Io(_)));

        // The partial refresh is what the surface shows now.
        assert!(surface_lines(&window, id).contains(&"zz.txt".to_string()));
        let revealed = reveal(&mut sessions, &mut window, &proj.join("zz.txt"), MODE).unwrap();
        assert_eq!(revealed, id);
    }

    #[test]
    fn prune_drops_trees_for_closed_surfaces() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();
        assert_eq!(sessions.len(), 1);

        window.close_surface(id);
        sessions.prune(&window);
        assert!(sessions.is_empty());

        // A new reveal builds a fresh tree instead of hitting a stale one.
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();
        assert!(sessions.tree_for_surface(window.id(), id).is_some());
    }

    #[test]
    fn reveal_detects_desynced_surface_text() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();

        // Corrupt the rendered text behind the engine's back.
        let surface = window.surface_mut(id).unwrap();
        surface.set_read_only(false);
        let len = surface.text().len();
        surface.erase(0, len);
        surface.insert(0, "garbage\n..\n");

        let err = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap_err();
        assert!(matches!(err, AppError::Desync(_)));
    }

    #[test]
    fn sync_preserves_selection_across_rewrite() {
        let (_dir, proj) = setup_project();
        let (mut sessions, mut window) = setup_host(&proj);
        let id = reveal(&mut sessions, &mut window, &proj.join("readme.md"), MODE).unwrap();
        window.surface_mut(id).unwrap().cursor_to(2);

        refresh_tree(&mut sessions, &mut window, id, MODE).unwrap();
        assert_eq!(window.surface(id).unwrap().selection_lines(), vec![2]);
    }
}
