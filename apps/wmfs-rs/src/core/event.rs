//! Display-agnostic events consumed by the dispatcher.

/// Opaque display-server window handle.
pub type WindowId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Window the event was reported on
    pub window: WindowId,
    pub button: u8,
    pub modifiers: u16,
    pub root_x: i32,
    pub root_y: i32,
    /// Position relative to `window`
    pub event_x: i32,
    pub event_y: i32,
}

/// A window asking to move/resize/restack itself. Absent fields were not requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigureRequest {
    pub window: WindowId,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_width: Option<u16>,
    pub raise: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    SizeHints,
    WmHints,
    TransientFor,
    StatusText,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmEvent {
    MapRequest { window: WindowId },
    DestroyNotify { window: WindowId },
    /// `event` is the window the unmap was reported on: the root or a frame.
    UnmapNotify { window: WindowId, event: WindowId },
    ConfigureRequest(ConfigureRequest),
    ButtonPress(ButtonEvent),
    ButtonRelease(ButtonEvent),
    MotionNotify { root_x: i32, root_y: i32 },
    EnterNotify { window: WindowId },
    KeyPress { keysym: u32, modifiers: u16 },
    Expose { window: WindowId, count: u16 },
    PropertyNotify { window: WindowId, property: PropertyKind },
    ScreenChange,
    /// Anything the core has no handler for.
    Ignored,
}
