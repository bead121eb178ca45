//! Narrow interface over the OS window enumeration primitive and the
//! virtual-desktop service, plus an in-memory backend.
//!
//! Real platform integrations implement [`WindowSystem`] out of tree. The
//! bundled [`SimWindowSystem`] models desktops and windows in process; the
//! test suites and the CLI's session-file mode run against it.

use serde::{Deserialize, Serialize};
use win_model::{WindowKey, WindowPlacement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

impl WindowId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One visible top-level window as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenWindow {
    pub id: WindowId,
    pub key: WindowKey,
}

#[derive(Debug, thiserror::Error)]
pub enum WindowSystemError {
    /// The window behind this handle no longer exists.
    #[error("stale window handle {0}")]
    StaleHandle(u64),
    #[error("desktop {desktop} out of range (desktop_count={desktop_count})")]
    DesktopOutOfRange { desktop: u32, desktop_count: u32 },
    #[error("window system error: {0}")]
    Backend(String),
}

/// The window-system collaborator consumed by the capture/restore engine.
///
/// `desktop_of` returns `Ok(None)` for a window the virtual-desktop service
/// does not track (system surfaces and the like); callers treat that as
/// "exclude", not as a failure.
pub trait WindowSystem {
    fn windows(&self) -> Vec<OpenWindow>;
    fn desktop_of(&self, id: WindowId) -> Result<Option<u32>, WindowSystemError>;
    fn placement(&self, id: WindowId) -> Result<WindowPlacement, WindowSystemError>;
    fn set_placement(
        &mut self,
        id: WindowId,
        placement: &WindowPlacement,
    ) -> Result<(), WindowSystemError>;
    fn desktop_count(&self) -> u32;
    /// Appends one desktop and returns its index.
    fn create_desktop(&mut self) -> Result<u32, WindowSystemError>;
    fn move_to_desktop(&mut self, id: WindowId, desktop: u32) -> Result<(), WindowSystemError>;
}

/// Serializable state of the simulated window system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimState {
    pub desktop_count: u32,
    pub windows: Vec<SimWindow>,
}

impl Default for SimState {
    fn default() -> Self {
        Self { desktop_count: 1, windows: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimWindow {
    pub id: u64,
    #[serde(flatten)]
    pub key: WindowKey,
    /// `None` models a window the virtual-desktop service does not track.
    pub desktop: Option<u32>,
    pub placement: WindowPlacement,
}

/// In-memory window system: an ordered set of windows across a bank of
/// virtual desktops. Enumeration order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct SimWindowSystem {
    state: SimState,
    next_id: u64,
    /// Windows whose placement/move calls fail with a backend error.
    unresponsive: Vec<u64>,
}

impl SimWindowSystem {
    pub fn new() -> Self {
        Self::from_state(SimState::default())
    }

    pub fn from_state(state: SimState) -> Self {
        let next_id = state.windows.iter().map(|w| w.id).max().unwrap_or(0);
        Self { state, next_id, unresponsive: Vec::new() }
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn into_state(self) -> SimState {
        self.state
    }

    /// Opens a window on the given desktop (`None` = untracked) and returns
    /// its handle.
    pub fn open_window(
        &mut self,
        key: WindowKey,
        desktop: Option<u32>,
        placement: WindowPlacement,
    ) -> WindowId {
        self.next_id += 1;
        self.state.windows.push(SimWindow { id: self.next_id, key, desktop, placement });
        WindowId(self.next_id)
    }

    /// Closes a window; its handle becomes stale.
    pub fn close_window(&mut self, id: WindowId) {
        self.state.windows.retain(|w| w.id != id.0);
    }

    /// Makes every placement/move call against this window fail, simulating
    /// a window manager rejecting operations on it.
    pub fn mark_unresponsive(&mut self, id: WindowId) {
        if !self.unresponsive.contains(&id.0) {
            self.unresponsive.push(id.0);
        }
    }

    pub fn window_id_by_key(&self, key: &WindowKey) -> Option<WindowId> {
        self.state.windows.iter().find(|w| &w.key == key).map(|w| WindowId(w.id))
    }

    fn window(&self, id: WindowId) -> Result<&SimWindow, WindowSystemError> {
        self.state
            .windows
            .iter()
            .find(|w| w.id == id.0)
            .ok_or(WindowSystemError::StaleHandle(id.0))
    }

    fn window_mut(&mut self, id: WindowId) -> Result<&mut SimWindow, WindowSystemError> {
        self.state
            .windows
            .iter_mut()
            .find(|w| w.id == id.0)
            .ok_or(WindowSystemError::StaleHandle(id.0))
    }

    fn reject_unresponsive(&self, id: WindowId) -> Result<(), WindowSystemError> {
        if self.unresponsive.contains(&id.raw()) {
            return Err(WindowSystemError::Backend(format!("window {} unresponsive", id.raw())));
        }
        Ok(())
    }
}

impl WindowSystem for SimWindowSystem {
    fn windows(&self) -> Vec<OpenWindow> {
        self.state
            .windows
            .iter()
            .map(|w| OpenWindow { id: WindowId(w.id), key: w.key.clone() })
            .collect()
    }

    fn desktop_of(&self, id: WindowId) -> Result<Option<u32>, WindowSystemError> {
        Ok(self.window(id)?.desktop)
    }

    fn placement(&self, id: WindowId) -> Result<WindowPlacement, WindowSystemError> {
        Ok(self.window(id)?.placement)
    }

    fn set_placement(
        &mut self,
        id: WindowId,
        placement: &WindowPlacement,
    ) -> Result<(), WindowSystemError> {
        self.window(id)?;
        self.reject_unresponsive(id)?;
        self.window_mut(id)?.placement = *placement;
        Ok(())
    }

    fn desktop_count(&self) -> u32 {
        self.state.desktop_count
    }

    fn create_desktop(&mut self) -> Result<u32, WindowSystemError> {
        self.state.desktop_count += 1;
        Ok(self.state.desktop_count - 1)
    }

    fn move_to_desktop(&mut self, id: WindowId, desktop: u32) -> Result<(), WindowSystemError> {
        self.window(id)?;
        self.reject_unresponsive(id)?;
        let desktop_count = self.state.desktop_count;
        if desktop >= desktop_count {
            return Err(WindowSystemError::DesktopOutOfRange { desktop, desktop_count });
        }
        self.window_mut(id)?.desktop = Some(desktop);
        Ok(())
    }
}

pub fn default_system() -> SimWindowSystem {
    SimWindowSystem::new()
}
