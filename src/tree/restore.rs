//! Session restore: rebuilding expand state from previously rendered text.
//!
//! There is no side-channel serialization. The outline text itself — root
//! path on line 0, indentation, and the ` ▼` opened markers — is the entire
//! persisted state. Entries that were renamed or deleted since the text was
//! written are dropped silently.

use std::ffi::OsStr;
use std::path::PathBuf;

use crate::tree::entry::{classify, Classification, Entry, ReconcileMode};
use crate::tree::render::{indent_width, INDENT, OPENED_MARKER};

/// Reconstruct a tree from rendered outline text.
///
/// Returns `None` when the text is not a tree session at all: line 0 must
/// name an existing, listable directory. Everything after that is restored
/// best-effort — an opened folder whose name no longer exists on disk is
/// skipped together with its whole rendered subtree.
pub fn parse_outline(text: &str) -> Option<Entry> {
    let header = text.lines().next()?;
    let root_path = PathBuf::from(header);
    if classify(&root_path) != Classification::Directory {
        return None;
    }
    let mut root = match Entry::with_children(&root_path) {
        Ok(root) => root,
        Err(err) => {
            tracing::warn!(path = %root_path.display(), %err, "root unlistable, not restoring");
            return None;
        }
    };
    let lines: Vec<&str> = text.lines().collect();
    // Line 0 is the header, line 1 the up-control; tokens start at line 2.
    replay(&mut root, &lines, 2, 0);
    Some(root)
}

/// Scan lines at the given depth, expanding each opened-folder token found
/// in `node`'s freshly-listed children and recursing one level deeper from
/// the token's resumption point. Returns the index of the first line that
/// belongs to a shallower level (or the text length).
fn replay(node: &mut Entry, lines: &[&str], mut i: usize, depth: usize) -> usize {
    let expected = depth * INDENT.len();
    while i < lines.len() {
        let line = lines[i];
        let indent = indent_width(line);
        if indent < expected {
            return i;
        }
        if indent == expected {
            if let Some(name) = line[indent..].strip_suffix(OPENED_MARKER) {
                match node.child_by_name_mut(OsStr::new(name)) {
                    Some(child) if child.is_dir() => {
                        match child.toggle(ReconcileMode::Forward) {
                            Ok(()) => {
                                i = replay(child, lines, i + 1, depth + 1);
                            }
                            Err(err) => {
                                tracing::debug!(name, %err, "skipping unlistable folder");
                                i = skip_subtree(lines, i + 1, indent);
                            }
                        }
                    }
                    _ => {
                        // Renamed or deleted since the text was written.
                        tracing::debug!(name, "dropping orphaned session token");
                        i = skip_subtree(lines, i + 1, indent);
                    }
                }
                continue;
            }
        }
        // A file, a closed folder, or a stray deeper line: not a token.
        i += 1;
    }
    i
}

fn skip_subtree(lines: &[&str], mut i: usize, indent: usize) -> usize {
    while i < lines.len() && indent_width(lines[i]) > indent {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::render::render_outline;
    use crate::tree::walk;
    use std::collections::BTreeSet;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn open_at(root: &mut Entry, components: &[&str]) {
        let mut node = root;
        for part in components {
            node = node.child_by_name_mut(OsStr::new(part)).unwrap();
        }
        node.toggle(ReconcileMode::Forward).unwrap();
    }

    fn opened_paths(root: &Entry) -> BTreeSet<PathBuf> {
        let mut set = BTreeSet::new();
        if root.is_opened() {
            set.insert(root.path.clone());
        }
        for entry in walk::entries(root) {
            if entry.is_opened() {
                set.insert(entry.path.clone());
            }
        }
        set
    }

    fn setup_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("aaa").join("deep")).unwrap();
        fs::create_dir_all(dir.path().join("src").join("sub")).unwrap();
        fs::create_dir(dir.path().join("zzz")).unwrap();
        File::create(dir.path().join("aaa").join("one.txt")).unwrap();
        File::create(dir.path().join("src").join("main.ext")).unwrap();
        File::create(dir.path().join("top.txt")).unwrap();
        dir
    }

    #[test]
    fn round_trip_preserves_opened_set() {
        let dir = setup_test_dir();
        let mut root = Entry::new(dir.path());
        root.toggle(ReconcileMode::Forward).unwrap();
        open_at(&mut root, &["aaa"]);
        open_at(&mut root, &["aaa", "deep"]);
        open_at(&mut root, &["src"]);

        let text = render_outline(&root);
        let restored = parse_outline(&text).expect("valid session text");

        assert_eq!(opened_paths(&restored), opened_paths(&root));
    }

    #[test]
    fn marker_free_text_restores_one_level_root() {
        let dir = setup_test_dir();
        let mut root = Entry::new(dir.path());
        root.toggle(ReconcileMode::Forward).unwrap();

        let text = render_outline(&root);
        let restored = parse_outline(&text).unwrap();

        assert!(restored.is_opened());
        assert_eq!(restored.children().len(), root.children().len());
        assert!(restored.children().iter().all(|c| !c.is_opened()));
    }

    #[test]
    fn non_directory_header_is_not_a_session() {
        let dir = setup_test_dir();
        let file_header = format!("{}\n..\n", dir.path().join("top.txt").display());
        assert!(parse_outline(&file_header).is_none());
        assert!(parse_outline("just some\nscratch text\n").is_none());
        assert!(parse_outline("").is_none());
    }

    #[test]
    fn orphaned_folder_is_dropped_with_its_subtree() {
        let dir = setup_test_dir();
        let mut root = Entry::new(dir.path());
        root.toggle(ReconcileMode::Forward).unwrap();
        open_at(&mut root, &["aaa"]);
        open_at(&mut root, &["src"]);
        open_at(&mut root, &["src", "sub"]);
        open_at(&mut root, &["zzz"]);
        let text = render_outline(&root);

        fs::remove_dir_all(dir.path().join("src")).unwrap();
        let restored = parse_outline(&text).unwrap();

        let opened = opened_paths(&restored);
        assert!(opened.contains(&dir.path().join("aaa")));
        assert!(opened.contains(&dir.path().join("zzz")));
        assert!(!opened.iter().any(|p| p.starts_with(dir.path().join("src"))));
        assert!(restored
            .child_by_name(OsStr::new("src"))
            .is_none());
    }

    #[test]
    fn renamed_folder_resets_to_closed() {
        let dir = setup_test_dir();
        let mut root = Entry::new(dir.path());
        root.toggle(ReconcileMode::Forward).unwrap();
        open_at(&mut root, &["zzz"]);
        let text = render_outline(&root);

        fs::rename(dir.path().join("zzz"), dir.path().join("yyy")).unwrap();
        let restored = parse_outline(&text).unwrap();

        let renamed = restored.child_by_name(OsStr::new("yyy")).unwrap();
        assert!(!renamed.is_opened());
    }

    #[test]
    fn deep_chain_restores() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a").join("b").join("c").join("d")).unwrap();
        let mut root = Entry::new(dir.path());
        root.toggle(ReconcileMode::Forward).unwrap();
        open_at(&mut root, &["a"]);
        open_at(&mut root, &["a", "b"]);
        open_at(&mut root, &["a", "b", "c"]);

        let text = render_outline(&root);
        let restored = parse_outline(&text).unwrap();
        assert_eq!(opened_paths(&restored), opened_paths(&root));
    }
}
