//! The host boundary: what the engine needs from a text surface and its
//! window, and the in-memory outline buffer the terminal front-end uses.
//!
//! The engine never draws; it edits surface text at byte offsets, locates
//! rendered lines by exact match, and moves the selection. Anything that
//! satisfies these two traits can host a tree.

use std::collections::BTreeSet;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Identity of one text surface within a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Identity of one host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// A located line: its number and the byte range of its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineHit {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// A host text surface holding one rendered outline.
pub trait TextSurface {
    fn id(&self) -> SurfaceId;

    fn text(&self) -> &str;

    /// Insert text at a byte offset. Ignored while the surface is read-only.
    fn insert(&mut self, offset: usize, text: &str);

    /// Erase the byte range. Ignored while the surface is read-only.
    fn erase(&mut self, start: usize, end: usize);

    /// Currently selected line numbers (cursor line if nothing is marked).
    fn selection_lines(&self) -> Vec<usize>;

    /// Replace the selection with the given lines.
    fn select_lines(&mut self, lines: &[usize]);

    /// Line numbers currently scrolled into view.
    fn visible_lines(&self) -> Range<usize>;

    fn scroll_to_line(&mut self, line: usize);

    fn set_read_only(&mut self, read_only: bool);

    fn set_title(&mut self, title: &str);

    /// Exact whole-line search, scanning forward from lines that begin at
    /// or after `from_offset`. Anchored at both ends: the entire line must
    /// equal `needle`.
    fn find_line(&self, needle: &str, from_offset: usize) -> Option<LineHit> {
        let text = self.text();
        let mut start = 0usize;
        for (line, seg) in text.split_inclusive('\n').enumerate() {
            let content = seg.strip_suffix('\n').unwrap_or(seg);
            if start >= from_offset && content == needle {
                return Some(LineHit {
                    line,
                    start,
                    end: start + content.len(),
                });
            }
            start += seg.len();
        }
        None
    }

    fn line_count(&self) -> usize {
        self.text().lines().count()
    }
}

/// A host window owning text surfaces.
pub trait WindowHost {
    type Surface: TextSurface;

    fn id(&self) -> WindowId;

    fn surface_ids(&self) -> Vec<SurfaceId>;

    fn surface(&self, id: SurfaceId) -> Option<&Self::Surface>;

    fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut Self::Surface>;

    /// Create a new empty scratch surface and return its id.
    fn create_surface(&mut self) -> SurfaceId;

    /// Open a file in the host (outside any tree surface).
    fn open_file(&mut self, path: &Path) -> Result<()>;

    fn focus_surface(&mut self, id: SurfaceId);

    /// Top-level project folders, used to pick roots for new trees.
    fn project_folders(&self) -> Vec<PathBuf>;
}

/// In-memory outline surface: a string buffer plus cursor, multi-select
/// marks, scroll state, and a title. Serves both the terminal front-end and
/// the engine tests.
#[derive(Debug, Clone)]
pub struct OutlineBuffer {
    id: SurfaceId,
    text: String,
    title: String,
    read_only: bool,
    cursor_line: usize,
    marks: BTreeSet<usize>,
    scroll: usize,
    viewport_height: usize,
}

impl OutlineBuffer {
    pub fn new(id: SurfaceId) -> Self {
        Self {
            id,
            text: String::new(),
            title: String::new(),
            read_only: false,
            cursor_line: 0,
            marks: BTreeSet::new(),
            scroll: 0,
            viewport_height: 24,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn cursor_line(&self) -> usize {
        self.cursor_line
    }

    pub fn marks(&self) -> &BTreeSet<usize> {
        &self.marks
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Move the cursor by a signed number of lines, clamped to the buffer.
    pub fn move_cursor(&mut self, delta: isize) {
        let last = self.line_count().saturating_sub(1);
        let target = self.cursor_line as isize + delta;
        self.cursor_line = target.clamp(0, last as isize) as usize;
        self.ensure_cursor_visible();
    }

    pub fn cursor_to(&mut self, line: usize) {
        self.cursor_line = line.min(self.line_count().saturating_sub(1));
        self.ensure_cursor_visible();
    }

    /// Toggle a multi-select mark on the cursor line.
    pub fn toggle_mark(&mut self) {
        if !self.marks.remove(&self.cursor_line) {
            self.marks.insert(self.cursor_line);
        }
    }

    pub fn clear_marks(&mut self) {
        self.marks.clear();
    }

    /// Called by the renderer each frame with the pane height.
    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height.max(1);
        self.ensure_cursor_visible();
    }

    fn ensure_cursor_visible(&mut self) {
        if self.cursor_line < self.scroll {
            self.scroll = self.cursor_line;
        } else if self.cursor_line >= self.scroll + self.viewport_height {
            self.scroll = self.cursor_line + 1 - self.viewport_height;
        }
    }
}

impl TextSurface for OutlineBuffer {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn insert(&mut self, offset: usize, text: &str) {
        if self.read_only || offset > self.text.len() {
            return;
        }
        self.text.insert_str(offset, text);
    }

    fn erase(&mut self, start: usize, end: usize) {
        if self.read_only || start > end || end > self.text.len() {
            return;
        }
        self.text.replace_range(start..end, "");
    }

    fn selection_lines(&self) -> Vec<usize> {
        if self.marks.is_empty() {
            vec![self.cursor_line]
        } else {
            self.marks.iter().copied().collect()
        }
    }

    fn select_lines(&mut self, lines: &[usize]) {
        self.marks.clear();
        match lines {
            [] => {}
            [line] => self.cursor_to(*line),
            many => {
                self.cursor_to(many[0]);
                let last = self.line_count().saturating_sub(1);
                self.marks.extend(many.iter().map(|l| (*l).min(last)));
            }
        }
    }

    fn visible_lines(&self) -> Range<usize> {
        self.scroll..self.scroll + self.viewport_height
    }

    fn scroll_to_line(&mut self, line: usize) {
        if line < self.scroll {
            self.scroll = line;
        } else if line >= self.scroll + self.viewport_height {
            self.scroll = line + 1 - self.viewport_height;
        }
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }
}
