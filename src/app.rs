//! Application state: the terminal window host and the state shared by the
//! event loop.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::error::Result;
use crate::session::SessionManager;
use crate::surface::{OutlineBuffer, SurfaceId, TextSurface, WindowHost, WindowId};
use crate::tree::ReconcileMode;

/// How long a status message stays on screen.
const STATUS_TTL: Duration = Duration::from_secs(4);

/// The one terminal window, owning every outline surface.
///
/// File opens are queued rather than executed: spawning `$EDITOR` needs the
/// terminal suspended, which only the main loop can do.
#[derive(Debug)]
pub struct TerminalWindow {
    id: WindowId,
    surfaces: Vec<OutlineBuffer>,
    active: usize,
    next_surface: u64,
    folders: Vec<PathBuf>,
    open_requests: Vec<PathBuf>,
}

impl TerminalWindow {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self {
            id: WindowId(1),
            surfaces: Vec::new(),
            active: 0,
            next_surface: 1,
            folders,
            open_requests: Vec::new(),
        }
    }

    pub fn active_surface(&self) -> Option<&OutlineBuffer> {
        self.surfaces.get(self.active)
    }

    pub fn active_surface_mut(&mut self) -> Option<&mut OutlineBuffer> {
        self.surfaces.get_mut(self.active)
    }

    pub fn active_surface_id(&self) -> Option<SurfaceId> {
        self.active_surface().map(|s| s.id())
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Switch focus to the next surface, wrapping around.
    pub fn cycle_surface(&mut self) {
        if !self.surfaces.is_empty() {
            self.active = (self.active + 1) % self.surfaces.len();
        }
    }

    /// Drain the queued file-open requests for the main loop to execute.
    pub fn take_open_requests(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.open_requests)
    }

    /// Close a surface. Its tree is dropped on the next prune.
    pub fn close_surface(&mut self, id: SurfaceId) {
        self.surfaces.retain(|s| s.id() != id);
        if self.active >= self.surfaces.len() {
            self.active = self.surfaces.len().saturating_sub(1);
        }
    }
}

impl WindowHost for TerminalWindow {
    type Surface = OutlineBuffer;

    fn id(&self) -> WindowId {
        self.id
    }

    fn surface_ids(&self) -> Vec<SurfaceId> {
        self.surfaces.iter().map(|s| s.id()).collect()
    }

    fn surface(&self, id: SurfaceId) -> Option<&OutlineBuffer> {
        self.surfaces.iter().find(|s| s.id() == id)
    }

    fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut OutlineBuffer> {
        self.surfaces.iter_mut().find(|s| s.id() == id)
    }

    fn create_surface(&mut self) -> SurfaceId {
        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        self.surfaces.push(OutlineBuffer::new(id));
        self.active = self.surfaces.len() - 1;
        id
    }

    fn open_file(&mut self, path: &Path) -> Result<()> {
        self.open_requests.push(path.to_path_buf());
        Ok(())
    }

    fn focus_surface(&mut self, id: SurfaceId) {
        if let Some(index) = self.surfaces.iter().position(|s| s.id() == id) {
            self.active = index;
        }
    }

    fn project_folders(&self) -> Vec<PathBuf> {
        self.folders.clone()
    }
}

/// Main application state.
pub struct App {
    pub window: TerminalWindow,
    pub sessions: SessionManager,
    pub config: AppConfig,
    pub should_quit: bool,
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(config: AppConfig, folders: Vec<PathBuf>) -> Self {
        Self {
            window: TerminalWindow::new(folders),
            sessions: SessionManager::new(),
            config,
            should_quit: false,
            status_message: None,
        }
    }

    pub fn reconcile_mode(&self) -> ReconcileMode {
        self.config.reconcile_mode()
    }

    pub fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Current status message, if it hasn't expired.
    pub fn status(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, at)) if at.elapsed() < STATUS_TTL => Some(msg),
            _ => None,
        }
    }
}
