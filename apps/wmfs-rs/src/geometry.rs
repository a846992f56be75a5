//! Rectangle arithmetic shared by the layout engine, frames and screens.

/// An axis-aligned rectangle in root-window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Space added around a client window by its frame (border, title bar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// Clamp a possibly negative candidate dimension to the 1px minimum.
pub fn clamp_dimension(value: i32) -> u32 {
    value.max(1) as u32
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.bottom() <= self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(Rect::new(x, y, (right - x) as u32, (bottom - y) as u32))
    }

    /// Same size, centered in `area`; a rectangle larger than the area is pinned to its origin.
    pub fn centered_in(&self, area: &Rect) -> Rect {
        let x = area.x + ((area.width as i32 - self.width as i32) / 2).max(0);
        let y = area.y + ((area.height as i32 - self.height as i32) / 2).max(0);
        Rect { x, y, ..*self }
    }

    /// Shrink to fit inside `area` and slide back within its bounds.
    pub fn clamped_into(&self, area: &Rect) -> Rect {
        let width = self.width.min(area.width).max(1);
        let height = self.height.min(area.height).max(1);
        let x = self.x.clamp(area.x, area.right() - width as i32);
        let y = self.y.clamp(area.y, area.bottom() - height as i32);
        Rect::new(x, y, width, height)
    }

    /// Outer (frame) rectangle to inner (client) rectangle.
    pub fn shrink(&self, pad: Padding) -> Rect {
        Rect {
            x: self.x + pad.left as i32,
            y: self.y + pad.top as i32,
            width: clamp_dimension(self.width as i32 - (pad.left + pad.right) as i32),
            height: clamp_dimension(self.height as i32 - (pad.top + pad.bottom) as i32),
        }
    }

    /// Inner (client) rectangle to outer (frame) rectangle.
    pub fn grow(&self, pad: Padding) -> Rect {
        Rect {
            x: self.x - pad.left as i32,
            y: self.y - pad.top as i32,
            width: self.width + pad.left + pad.right,
            height: self.height + pad.top + pad.bottom,
        }
    }
}

impl Padding {
    pub const ZERO: Padding = Padding { left: 0, right: 0, top: 0, bottom: 0 };

    pub const fn uniform(width: u32) -> Self {
        Self { left: width, right: width, top: width, bottom: width }
    }
}
