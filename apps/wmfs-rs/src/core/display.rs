use anyhow::Result;

use crate::core::event::{ConfigureRequest, WindowId, WmEvent};
use crate::geometry::Rect;
use crate::window::client::{SavedState, SizeHints};
use crate::window::frame::{FrameLayout, FrameWindows};

/// Server-side attributes of a top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub override_redirect: bool,
    pub viewable: bool,
    pub geometry: Rect,
    pub border_width: u16,
}

/// Everything `manage` reads from a window before registering it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowProperties {
    pub title: Option<String>,
    pub size_hints: SizeHints,
    /// `_NET_WM_DESKTOP`; `0xFFFFFFFF` requests all desktops.
    pub desktop: Option<u32>,
    pub transient_for: Option<WindowId>,
    pub fullscreen: bool,
    pub urgent: bool,
    /// False when the window asked (Motif hints) not to be decorated.
    pub decorated: bool,
    pub saved_state: Option<SavedState>,
}

/// ICCCM WM_STATE values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    Resize,
}

pub const ALL_DESKTOPS: u32 = 0xFFFF_FFFF;

/// The requests and notifications the core needs from a display server.
///
/// Requests against a window the server no longer knows are harmless at the
/// protocol level; the core still checks `is_alive` before geometry changes.
pub trait DisplayServer {
    fn root(&self) -> WindowId;

    /// Physical screen rectangles, at least one.
    fn screen_geometries(&self) -> Result<Vec<Rect>>;
    /// Top-level windows in stacking order.
    fn top_level_windows(&self) -> Result<Vec<WindowId>>;
    fn attributes(&self, window: WindowId) -> Option<WindowAttributes>;
    fn properties(&self, window: WindowId) -> WindowProperties;
    fn title(&self, window: WindowId) -> Option<String>;
    fn size_hints(&self, window: WindowId) -> SizeHints;
    fn is_urgent(&self, window: WindowId) -> bool;
    fn transient_for(&self, window: WindowId) -> Option<WindowId>;
    fn status_text(&self) -> Option<String>;
    /// Whether the server still knows `window`.
    fn is_alive(&self, window: WindowId) -> bool;

    /// Create the frame and its decoration sub-windows and reparent `window` into it.
    fn create_frame(&mut self, window: WindowId, layout: &FrameLayout) -> Result<FrameWindows>;
    /// Release a frame; `restore` reparents the still-living window back to root there.
    fn destroy_frame(&mut self, frame: &FrameWindows, window: WindowId, restore: Option<Rect>) -> Result<()>;
    fn configure_frame(&mut self, frame: &FrameWindows, window: WindowId, layout: &FrameLayout) -> Result<()>;
    /// Synthetic ConfigureNotify telling the client where it really is.
    fn send_configure_notify(&mut self, window: WindowId, geo: Rect, border_width: u16) -> Result<()>;
    fn configure_unmanaged(&mut self, request: &ConfigureRequest) -> Result<()>;
    fn set_border_width(&mut self, window: WindowId, width: u16) -> Result<()>;

    fn create_bar(&mut self, geo: Rect) -> Result<WindowId>;
    fn move_bar(&mut self, bar: WindowId, geo: Rect) -> Result<()>;
    fn destroy_bar(&mut self, bar: WindowId) -> Result<()>;

    fn map(&mut self, window: WindowId) -> Result<()>;
    fn unmap(&mut self, window: WindowId) -> Result<()>;
    fn set_wm_state(&mut self, window: WindowId, state: WmState) -> Result<()>;
    fn raise(&mut self, window: WindowId) -> Result<()>;
    /// Focus `window`, or the root fallback for `None`.
    fn set_input_focus(&mut self, window: Option<WindowId>) -> Result<()>;
    /// Politely close (WM_DELETE_WINDOW) or kill.
    fn close_window(&mut self, window: WindowId) -> Result<()>;
    fn store_state(&mut self, window: WindowId, state: &SavedState) -> Result<()>;
    /// Publish the selected tag of the selected screen.
    fn set_current_desktop(&mut self, desktop: u32) -> Result<()>;
    fn set_desktop_count(&mut self, count: u32) -> Result<()>;

    /// Replace all key grabs on the root window with `(modifiers, keysym)` pairs.
    fn grab_keys(&mut self, keys: &[(u16, u32)]) -> Result<()>;
    /// Unfocused clients grab every click; focused ones only the `(modifiers, button)` bindings.
    fn grab_buttons(&mut self, window: WindowId, focused: bool, bindings: &[(u16, u8)]) -> Result<()>;
    /// Thaw the pointer after a synchronous passive grab; `replay` passes the click on to the client.
    fn allow_pointer_events(&mut self, replay: bool) -> Result<()>;
    /// Returns false when someone else holds the pointer.
    fn grab_pointer(&mut self, kind: DragKind) -> Result<bool>;
    fn ungrab_pointer(&mut self) -> Result<()>;
    fn query_pointer(&self) -> Result<(i32, i32)>;
    fn warp_pointer(&mut self, window: WindowId, x: i32, y: i32) -> Result<()>;

    /// Block until the next event.
    fn next_event(&mut self) -> Result<WmEvent>;
    /// Block until the next pointer motion, button release or expose; others are deferred.
    fn next_drag_event(&mut self) -> Result<WmEvent>;
    fn flush(&mut self) -> Result<()>;
}
