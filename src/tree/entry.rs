use std::borrow::Cow;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// What a path turned out to be when probed on disk.
///
/// Probing never panics and never throws: permission failures and vanished
/// paths both land in `Inaccessible`, which callers treat as a plain file
/// leaf. That classification is terminal for the node — it is not retried
/// unless the node is reconstructed from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Directory,
    File,
    Inaccessible,
}

/// Probe a path's kind on disk.
pub fn classify(path: &Path) -> Classification {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Classification::Directory,
        Ok(_) => Classification::File,
        Err(_) => Classification::Inaccessible,
    }
}

/// How `refresh` matches fresh on-disk names against previously-known
/// children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconcileMode {
    /// Forward-only cursor through the old children, never backtracking.
    /// A name that moved earlier in sort order than the cursor position is
    /// treated as brand new and loses its subtree state. Kept as the
    /// default because it is the historical behavior this tool replays.
    #[default]
    Forward,
    /// Name-map lookup: any old child whose name still exists keeps its
    /// state, regardless of how the listing reordered around it.
    ByName,
}

/// The variant half of an [`Entry`].
///
/// Files can never carry children; that is a type-level guarantee here, not
/// a runtime convention. Directory children are `Option` because "never
/// listed" and "listed and empty" are different states: a collapsed
/// directory may still hold a cached listing from when it was last open,
/// which makes re-expanding it instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir {
        opened: bool,
        children: Option<Vec<Entry>>,
    },
}

/// One node in the in-memory mirror of a filesystem subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl Entry {
    /// Construct a node for `path` without touching its children.
    ///
    /// Inaccessible paths degrade to file leaves.
    pub fn new(path: &Path) -> Self {
        let kind = match classify(path) {
            Classification::Directory => EntryKind::Dir {
                opened: false,
                children: None,
            },
            Classification::File | Classification::Inaccessible => EntryKind::File,
        };
        Self {
            path: path.to_path_buf(),
            kind,
        }
    }

    /// Construct a directory node with one level of children materialized
    /// and the node marked opened. Grandchildren stay unloaded.
    ///
    /// Non-directories fall back to [`Entry::new`]; listing errors propagate.
    pub fn with_children(path: &Path) -> Result<Self> {
        if classify(path) != Classification::Directory {
            return Ok(Entry::new(path));
        }
        let children = list_sorted(path)?
            .iter()
            .map(|p| Entry::new(p))
            .collect();
        Ok(Self {
            path: path.to_path_buf(),
            kind: EntryKind::Dir {
                opened: true,
                children: Some(children),
            },
        })
    }

    /// The node's display name: final path component, lossily decoded.
    pub fn display_name(&self) -> Cow<'_, str> {
        match self.path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => self.path.to_string_lossy(),
        }
    }

    fn file_name(&self) -> Option<&OsStr> {
        self.path.file_name()
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, EntryKind::Dir { .. })
    }

    pub fn is_opened(&self) -> bool {
        matches!(self.kind, EntryKind::Dir { opened: true, .. })
    }

    /// Loaded children, or an empty slice for files and unlisted directories.
    pub fn children(&self) -> &[Entry] {
        match &self.kind {
            EntryKind::Dir {
                children: Some(children),
                ..
            } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Entry>> {
        match &mut self.kind {
            EntryKind::Dir { children, .. } => children.as_mut(),
            EntryKind::File => None,
        }
    }

    /// Whether the directory has ever listed its children (a retained cache
    /// on a collapsed directory counts).
    pub fn has_loaded_children(&self) -> bool {
        matches!(
            self.kind,
            EntryKind::Dir {
                children: Some(_),
                ..
            }
        )
    }

    /// Flip the expansion flag without touching children. No-op on files.
    pub fn set_opened(&mut self, value: bool) {
        if let EntryKind::Dir { opened, .. } = &mut self.kind {
            *opened = value;
        }
    }

    pub fn child_by_name(&self, name: &OsStr) -> Option<&Entry> {
        self.children()
            .iter()
            .find(|c| c.file_name() == Some(name))
    }

    pub fn child_by_name_mut(&mut self, name: &OsStr) -> Option<&mut Entry> {
        self.children_mut()?
            .iter_mut()
            .find(|c| c.file_name() == Some(name))
    }

    /// Find the node with the given path anywhere in the loaded tree,
    /// including under collapsed directories with cached children.
    pub fn find_path_mut(&mut self, target: &Path) -> Option<&mut Entry> {
        if self.path == target {
            return Some(self);
        }
        for child in self.children_mut()? {
            if let Some(found) = child.find_path_mut(target) {
                return Some(found);
            }
        }
        None
    }

    /// Re-list this directory and reconcile against the previously-known
    /// children, preserving subtree state for names that survive.
    ///
    /// No-op unless the node is an opened directory. Listing errors
    /// propagate; the children are left as they were.
    pub fn refresh(&mut self, mode: ReconcileMode) -> Result<()> {
        if !self.is_opened() {
            return Ok(());
        }
        let fresh = list_sorted(&self.path)?;
        let EntryKind::Dir { children, .. } = &mut self.kind else {
            unreachable!("is_opened implies Dir");
        };
        let reconciled = match children.take() {
            None => fresh.iter().map(|p| Entry::new(p)).collect(),
            Some(old) => match mode {
                ReconcileMode::Forward => reconcile_forward(old, &fresh),
                ReconcileMode::ByName => reconcile_by_name(old, &fresh),
            },
        };
        *children = Some(reconciled);
        Ok(())
    }

    /// Expand a collapsed directory (listing or reconciling its children)
    /// or collapse an expanded one (children stay cached). No-op on files.
    ///
    /// If expansion fails to list the directory, the node reverts to closed
    /// and the error propagates — the tree is left exactly as it was.
    pub fn toggle(&mut self, mode: ReconcileMode) -> Result<()> {
        if !self.is_dir() {
            return Ok(());
        }
        if self.is_opened() {
            self.set_opened(false);
            return Ok(());
        }
        self.set_opened(true);
        if let Err(err) = self.refresh(mode) {
            self.set_opened(false);
            return Err(err);
        }
        Ok(())
    }

    /// Construct this node's parent directory, one level deep, with this
    /// node's exact state grafted over the freshly-listed child of the same
    /// name. Used to zoom the tree root out by one level.
    pub fn make_parent(&self) -> Result<Entry> {
        let parent_path = self.path.parent().ok_or_else(|| {
            AppError::InvalidPath(format!("{} has no parent directory", self.path.display()))
        })?;
        let mut parent = Entry::with_children(parent_path)?;
        if !parent.is_dir() {
            return Err(AppError::InvalidPath(format!(
                "{} is not a directory",
                parent_path.display()
            )));
        }
        let name = self.file_name().ok_or_else(|| {
            AppError::InvalidPath(format!("{} has no file name", self.path.display()))
        })?;
        let needle = parent.child_by_name_mut(name).ok_or_else(|| {
            AppError::InvalidPath(format!(
                "{} no longer exists in {}",
                self.path.display(),
                parent_path.display()
            ))
        })?;
        *needle = self.clone();
        Ok(parent)
    }
}

/// List a directory's entries sorted by name, ascending, case-sensitive
/// byte order.
pub fn list_sorted(path: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(path)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Walk the fresh listing in order, advancing a forward-only cursor through
/// the old children; a name match keeps the old node, anything else is
/// constructed fresh. Old entries the cursor skips are dropped.
fn reconcile_forward(old: Vec<Entry>, fresh: &[PathBuf]) -> Vec<Entry> {
    let mut cursor = old.into_iter().peekable();
    let mut out = Vec::with_capacity(fresh.len());
    for path in fresh {
        while cursor
            .peek()
            .is_some_and(|e| e.file_name() != path.file_name())
        {
            cursor.next();
        }
        match cursor.next() {
            Some(kept) => out.push(kept),
            None => out.push(Entry::new(path)),
        }
    }
    out
}

/// Name-map reconciliation: survives reordering, unlike the forward cursor.
fn reconcile_by_name(old: Vec<Entry>, fresh: &[PathBuf]) -> Vec<Entry> {
    let mut by_name: HashMap<OsString, Entry> = old
        .into_iter()
        .filter_map(|e| e.file_name().map(OsStr::to_os_string).map(|n| (n, e)))
        .collect();
    fresh
        .iter()
        .map(|path| {
            path.file_name()
                .and_then(|n| by_name.remove(n))
                .unwrap_or_else(|| Entry::new(path))
        })
        .collect()
}
