//! Deterministic text rendering of the visible tree.
//!
//! The format is load-bearing: session restore reconstructs expand state by
//! re-parsing exactly this text, so every byte here is part of the contract.
//!
//! - line 0: the root's absolute path
//! - line 1: the literal up-control `..`
//! - then one line per visible node: `4*depth` spaces, the name, and a
//!   marker — nothing for files, ` ▶` closed, ` ▼` opened.

use crate::tree::entry::{Entry, EntryKind};

/// One indentation unit.
pub const INDENT: &str = "    ";
/// Suffix marking a collapsed directory.
pub const CLOSED_MARKER: &str = " ▶";
/// Suffix marking an expanded directory.
pub const OPENED_MARKER: &str = " ▼";
/// The up-navigation control line.
pub const UP_LINE: &str = "..";

/// Render one node as a single outline line at the given depth.
pub fn render_line(entry: &Entry, depth: usize) -> String {
    let marker = match &entry.kind {
        EntryKind::File => "",
        EntryKind::Dir { opened: false, .. } => CLOSED_MARKER,
        EntryKind::Dir { opened: true, .. } => OPENED_MARKER,
    };
    format!(
        "{}{}{}",
        INDENT.repeat(depth),
        entry.display_name(),
        marker
    )
}

/// Render the whole outline: header, up-control, then the depth-first body.
pub fn render_outline(root: &Entry) -> String {
    let mut out = String::new();
    out.push_str(&root.path.to_string_lossy());
    out.push('\n');
    out.push_str(UP_LINE);
    out.push('\n');
    render_children(root.children(), 0, &mut out);
    out
}

fn render_children(children: &[Entry], depth: usize, out: &mut String) {
    for child in children {
        out.push_str(&render_line(child, depth));
        out.push('\n');
        if child.is_opened() {
            render_children(child.children(), depth + 1, out);
        }
    }
}

/// Number of leading space bytes on a line.
pub fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::entry::ReconcileMode;
    use std::ffi::OsStr;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn render_line_distinguishes_kinds() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        let file = Entry::new(&dir.path().join("notes.txt"));
        assert_eq!(render_line(&file, 0), "notes.txt");

        let mut docs = Entry::new(&dir.path().join("docs"));
        assert_eq!(render_line(&docs, 1), "    docs ▶");
        docs.toggle(ReconcileMode::Forward).unwrap();
        assert_eq!(render_line(&docs, 2), "        docs ▼");
    }

    #[test]
    fn outline_matches_expected_layout() {
        // Root with `docs/` closed and `src/` opened containing `main.ext`:
        // line 2 is `docs ▶`, line 3 `src ▼`, line 4 the indented file.
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        File::create(dir.path().join("src").join("main.ext")).unwrap();

        let mut root = Entry::new(dir.path());
        root.toggle(ReconcileMode::Forward).unwrap();
        root.child_by_name_mut(OsStr::new("src"))
            .unwrap()
            .toggle(ReconcileMode::Forward)
            .unwrap();

        let text = render_outline(&root);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], dir.path().to_string_lossy());
        assert_eq!(lines[1], "..");
        assert_eq!(lines[2], "docs ▶");
        assert_eq!(lines[3], "src ▼");
        assert_eq!(lines[4], "    main.ext");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn closed_root_renders_header_only() {
        let dir = TempDir::new().unwrap();
        let root = Entry::new(dir.path());
        let text = render_outline(&root);
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn indent_width_counts_leading_spaces() {
        assert_eq!(indent_width("name"), 0);
        assert_eq!(indent_width("    name"), 4);
        assert_eq!(indent_width("        a b"), 8);
    }
}
