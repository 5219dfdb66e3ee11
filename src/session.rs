//! The registry of trees, each binding a root entry to one rendered surface.
//!
//! The registry is an explicitly owned object passed into every operation,
//! never ambient state. It must be pruned before any lookup that may create
//! a tree, so a closed surface neither leaks its tree nor blocks a new one.

use std::path::Path;

use crate::surface::{SurfaceId, WindowHost, WindowId};
use crate::tree::Entry;

/// One root entry bound to exactly one rendered surface.
#[derive(Debug)]
pub struct Tree {
    pub window: WindowId,
    pub surface: SurfaceId,
    pub root: Entry,
}

/// Owner of every live [`Tree`], keyed by (window, surface).
#[derive(Debug, Default)]
pub struct SessionManager {
    trees: Vec<Tree>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Drop trees belonging to `host`'s window whose surface no longer
    /// exists there.
    pub fn prune<H: WindowHost>(&mut self, host: &H) {
        let window = host.id();
        let alive = host.surface_ids();
        let before = self.trees.len();
        self.trees
            .retain(|t| t.window != window || alive.contains(&t.surface));
        let dropped = before - self.trees.len();
        if dropped > 0 {
            tracing::debug!(dropped, "pruned trees for closed surfaces");
        }
    }

    pub fn tree_for_surface(&self, window: WindowId, surface: SurfaceId) -> Option<&Tree> {
        self.trees
            .iter()
            .find(|t| t.window == window && t.surface == surface)
    }

    pub fn tree_for_surface_mut(
        &mut self,
        window: WindowId,
        surface: SurfaceId,
    ) -> Option<&mut Tree> {
        self.trees
            .iter_mut()
            .find(|t| t.window == window && t.surface == surface)
    }

    /// The first tree in `window` whose root is an ancestor of, or equal
    /// to, `path`. First wins: at most one tree per window claims a path.
    pub fn claiming_tree_mut(&mut self, window: WindowId, path: &Path) -> Option<&mut Tree> {
        self.trees
            .iter_mut()
            .find(|t| t.window == window && path.starts_with(&t.root.path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tree> {
        self.trees.iter()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
