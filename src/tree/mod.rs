//! The tree-state engine: entry model, diff-preserving refresh, depth-first
//! line addressing, deterministic rendering, and session restore.

pub mod entry;
pub mod render;
pub mod restore;
pub mod walk;

pub use entry::{classify, Classification, Entry, EntryKind, ReconcileMode};
