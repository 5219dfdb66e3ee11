//! Depth-first addressing over the visible tree.
//!
//! The pre-order traversal over a root's children (recursing only into
//! opened directories) is the single source of truth for mapping between
//! rendered line numbers and tree nodes. Line 0 is the path header, line 1
//! the up-control (the root's ordinal 0), and visible nodes start at line 2.

use std::ops::ControlFlow;
use std::path::Path;

use crate::tree::entry::Entry;

/// Rendered line number of a traversal ordinal (root = ordinal 0 = line 1).
pub fn line_of_ordinal(ordinal: usize) -> usize {
    ordinal + 1
}

/// Traversal ordinal addressed by a rendered line, if any. Line 0 is the
/// header and has no ordinal.
pub fn ordinal_of_line(line: usize) -> Option<usize> {
    line.checked_sub(1)
}

/// Lazy pre-order iterator over the visible descendants of a root.
pub struct Entries<'a> {
    stack: Vec<std::slice::Iter<'a, Entry>>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<&'a Entry> {
        loop {
            let iter = self.stack.last_mut()?;
            match iter.next() {
                Some(child) => {
                    if child.is_opened() {
                        self.stack.push(child.children().iter());
                    }
                    return Some(child);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Visible descendants of `root` in traversal order, the root excluded.
pub fn entries(root: &Entry) -> Entries<'_> {
    Entries {
        stack: vec![root.children().iter()],
    }
}

/// Paths of the visible descendants, in the same order as [`entries`].
pub fn paths(root: &Entry) -> impl Iterator<Item = &Path> {
    entries(root).map(|e| e.path.as_path())
}

/// Visit the root and then every visible node in traversal order, handing
/// the visitor the full ancestor stack of `(ordinal, node)` pairs, root
/// first. Ordinals index the full traversal, not the sibling list.
///
/// The visitor's `ControlFlow` return makes early termination cheap:
/// callers resolving a handful of lines stop as soon as they are done.
pub fn with_ancestry<'a, F>(root: &'a Entry, mut visit: F) -> ControlFlow<()>
where
    F: FnMut(&[(usize, &'a Entry)]) -> ControlFlow<()>,
{
    let mut stack: Vec<(usize, &'a Entry)> = vec![(0, root)];
    visit(&stack)?;
    let mut ordinal = 1;
    descend_stack(root, &mut stack, &mut ordinal, &mut visit)
}

fn descend_stack<'a, F>(
    node: &'a Entry,
    stack: &mut Vec<(usize, &'a Entry)>,
    ordinal: &mut usize,
    visit: &mut F,
) -> ControlFlow<()>
where
    F: FnMut(&[(usize, &'a Entry)]) -> ControlFlow<()>,
{
    for child in node.children() {
        stack.push((*ordinal, child));
        *ordinal += 1;
        visit(stack)?;
        if child.is_opened() {
            descend_stack(child, stack, ordinal, visit)?;
        }
        stack.pop();
    }
    ControlFlow::Continue(())
}
