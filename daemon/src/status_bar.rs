//! Status-bar integration point (spec §1 Non-goal: "OS-specific
//! status-bar/hotkey integration" is an external collaborator). `engine.h`
//! in the original source confirms `EngineCreationInfo` carries an
//! `enable_statusbar` flag, so this crate keeps the seam as a trait with a
//! no-op default rather than wiring real OS status-bar code.

/// A sink the engine notifies of GUI-visibility changes. Real status-bar
/// integration (menu-bar icon, tray icon, ...) is out of scope; `NoStatusBar`
/// satisfies the seam when `enable_statusbar` is false or unset.
pub trait StatusBarSink: Send + Sync {
    fn set_gui_visible(&self, _visible: bool) {}
}

pub struct NoStatusBar;

impl StatusBarSink for NoStatusBar {}
