use wmfs_rs_config::ClientConfig;

use crate::core::event::WindowId;
use crate::geometry::{Padding, Rect};

/// Width of a bottom-corner resize handle, in border widths.
const RESIZE_HANDLE_FACTOR: u32 = 6;

/// Frame decoration sizes, fixed at startup from the client configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoration {
    pub border: u32,
    /// Title bar height; never thinner than the border.
    pub titlebar: u32,
    pub buttons: usize,
}

impl Decoration {
    pub fn from_config(config: &ClientConfig) -> Self {
        let border = config.border_width as u32;
        Self {
            border,
            titlebar: (config.titlebar_height as u32).max(border),
            buttons: config.buttons.len(),
        }
    }

    pub fn padding(&self) -> Padding {
        Padding { left: self.border, right: self.border, top: self.titlebar, bottom: self.border }
    }

    pub fn has_titlebar(&self) -> bool {
        self.titlebar > self.border
    }

    pub fn button_size(&self) -> u32 {
        self.titlebar / 2
    }

    /// Placement of every frame sub-window for a client with inner geometry `geo`.
    pub fn layout(&self, geo: Rect, padding: Padding, decorated: bool) -> FrameLayout {
        let outer = geo.grow(padding);
        let client = Rect::new(padding.left as i32, padding.top as i32, geo.width, geo.height);

        if !decorated || padding == Padding::ZERO {
            return FrameLayout { outer, client, titlebar: None, resize: Vec::new(), buttons: Vec::new() };
        }

        let titlebar = self
            .has_titlebar()
            .then(|| Rect::new(0, 0, outer.width, self.titlebar));

        let handle_w = (RESIZE_HANDLE_FACTOR * self.border).min(outer.width / 2).max(1);
        let handle_h = self.border.max(1);
        let handle_y = outer.height as i32 - handle_h as i32;
        let resize = vec![
            Rect::new(0, handle_y, handle_w, handle_h),
            Rect::new(outer.width as i32 - handle_w as i32, handle_y, handle_w, handle_h),
        ];

        let size = self.button_size().max(1);
        let gap = self.border.max(2) as i32;
        let button_y = (self.titlebar.saturating_sub(size) / 2) as i32;
        let buttons = match titlebar {
            Some(_) => (0..self.buttons)
                .map(|i| {
                    let x = outer.width as i32 - (i as i32 + 1) * (size as i32 + gap);
                    Rect::new(x, button_y, size, size)
                })
                .collect(),
            None => Vec::new(),
        };

        FrameLayout { outer, client, titlebar, resize, buttons }
    }
}

/// Display handles owned by one client's frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameWindows {
    pub frame: WindowId,
    pub titlebar: Option<WindowId>,
    pub resize: Vec<WindowId>,
    pub buttons: Vec<WindowId>,
}

impl FrameWindows {
    /// A frame with no decoration sub-windows.
    pub fn bare(frame: WindowId) -> Self {
        Self { frame, titlebar: None, resize: Vec::new(), buttons: Vec::new() }
    }
}

/// Geometry of a frame and its sub-windows; sub-window rectangles are frame-relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLayout {
    pub outer: Rect,
    pub client: Rect,
    pub titlebar: Option<Rect>,
    pub resize: Vec<Rect>,
    pub buttons: Vec<Rect>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FramePart {
    TitleBar,
    ClientArea,
    Border,
    ResizeHandle(usize),
    Button(usize),
    None,
}

impl FrameLayout {
    /// Which part of the frame a frame-relative point falls on.
    pub fn hit_test(&self, x: i32, y: i32) -> FramePart {
        let bounds = Rect::new(0, 0, self.outer.width, self.outer.height);
        if !bounds.contains_point(x, y) {
            return FramePart::None;
        }
        if let Some(i) = self.buttons.iter().position(|b| b.contains_point(x, y)) {
            return FramePart::Button(i);
        }
        if let Some(i) = self.resize.iter().position(|r| r.contains_point(x, y)) {
            return FramePart::ResizeHandle(i);
        }
        if self.client.contains_point(x, y) {
            return FramePart::ClientArea;
        }
        if self.titlebar.is_some_and(|t| t.contains_point(x, y)) {
            return FramePart::TitleBar;
        }
        FramePart::Border
    }
}
