//! Interactive move and resize under a pointer grab.

use anyhow::Result;
use tracing::debug;

use crate::core::display::{DisplayServer, DragKind};
use crate::core::event::{WindowId, WmEvent};
use crate::geometry::{clamp_dimension, Rect};
use crate::window::draw::Renderer;
use crate::window::manager::WindowManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Moving {
        start: Rect,
        start_pointer_x: i32,
        start_pointer_y: i32,
    },
    /// The pointer sits on the bottom-right corner of `start`.
    Resizing { start: Rect },
}

impl DragState {
    /// Geometry for the pointer at root position (`x`, `y`).
    pub fn candidate(&self, x: i32, y: i32) -> Rect {
        match *self {
            DragState::Moving { start, start_pointer_x, start_pointer_y } => Rect::new(
                start.x + x - start_pointer_x,
                start.y + y - start_pointer_y,
                start.width,
                start.height,
            ),
            DragState::Resizing { start } => Rect::new(
                start.x,
                start.y,
                clamp_dimension(x - start.x),
                clamp_dimension(y - start.y),
            ),
        }
    }
}

impl<D: DisplayServer, R: Renderer> WindowManager<D, R> {
    /// Move or resize a floating client until the button is released.
    pub fn drag(&mut self, window: WindowId, kind: DragKind) -> Result<()> {
        let Some(client) = self.clients.get(window) else { return Ok(()) };
        if !client.is_floating() {
            debug!("Window {} is laid out, not dragging", window);
            return Ok(());
        }
        let start = client.geo;

        if !self.display.grab_pointer(kind)? {
            self.error_tracker.record_grab_error("drag", "pointer is grabbed elsewhere");
            return Ok(());
        }
        self.raise(window)?;

        let result = self.drag_loop(window, kind, start);
        if kind == DragKind::Resize {
            if let Some(geo) = self.clients.get(window).filter(|c| c.is_floating()).map(|c| c.geo) {
                let root = self.display.root();
                self.display.warp_pointer(root, geo.right(), geo.bottom())?;
            }
        }
        self.display.ungrab_pointer()?;
        result
    }

    fn drag_loop(&mut self, window: WindowId, kind: DragKind, start: Rect) -> Result<()> {
        let state = match kind {
            DragKind::Move => {
                let (start_pointer_x, start_pointer_y) = self.display.query_pointer()?;
                DragState::Moving { start, start_pointer_x, start_pointer_y }
            }
            DragKind::Resize => {
                let root = self.display.root();
                self.display.warp_pointer(root, start.right(), start.bottom())?;
                DragState::Resizing { start }
            }
        };

        loop {
            match self.display.next_drag_event()? {
                WmEvent::MotionNotify { root_x, root_y } => {
                    if !self.clients.contains(window) {
                        return Ok(());
                    }
                    self.moveresize(window, state.candidate(root_x, root_y), true)?;
                }
                WmEvent::Expose { window: exposed, count: 0 } => self.on_expose(exposed),
                WmEvent::ButtonRelease(_) => return Ok(()),
                _ => {}
            }
        }
    }
}
