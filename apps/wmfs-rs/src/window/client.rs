use bitflags::bitflags;

use crate::core::event::WindowId;
use crate::geometry::{Padding, Rect};
use crate::window::frame::{Decoration, FrameWindows};

bitflags! {
    /// Mode bits of a managed client.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClientFlags: u16 {
        /// Participates in the tiled layout.
        const TILED = 1 << 0;
        /// Floating because its hints demand it (transient, fixed size).
        const FREE_FORCED = 1 << 1;
        const MAXIMIZED = 1 << 2;
        const FULLSCREEN = 1 << 3;
        const URGENT = 1 << 4;
        /// Visible on every tag of its screen.
        const STICKY = 1 << 5;
        const HIDDEN = 1 << 6;
    }
}

/// ICCCM WM_NORMAL_HINTS, reduced to what geometry clamping needs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeHints {
    pub base: Option<(u32, u32)>,
    pub min: Option<(u32, u32)>,
    pub max: Option<(u32, u32)>,
    pub increment: Option<(u32, u32)>,
    /// (min, max) width/height ratios.
    pub aspect: Option<(f64, f64)>,
}

impl SizeHints {
    /// A client whose minimum and maximum sizes coincide cannot be tiled.
    pub fn is_fixed(&self) -> bool {
        matches!((self.min, self.max), (Some(min), Some(max)) if min == max && min.0 > 0 && min.1 > 0)
    }

    fn base_size(&self) -> (u32, u32) {
        self.base.or(self.min).unwrap_or((0, 0))
    }

    /// Constrain a candidate size.
    ///
    /// Min/max bounds always apply. Aspect and increment hints only apply
    /// when `honor_increments` is set; they only ever shrink the size.
    /// The result is never below 1x1.
    pub fn constrain(&self, width: i32, height: i32, honor_increments: bool) -> (u32, u32) {
        let mut w = width.max(1) as u32;
        let mut h = height.max(1) as u32;

        if honor_increments {
            let (base_w, base_h) = self.base_size();

            if let Some((min_ratio, max_ratio)) = self.aspect {
                let aw = w.saturating_sub(base_w).max(1) as f64;
                let ah = h.saturating_sub(base_h).max(1) as f64;
                if max_ratio > 0.0 && aw / ah > max_ratio {
                    w = base_w + (ah * max_ratio).floor().max(1.0) as u32;
                } else if min_ratio > 0.0 && aw / ah < min_ratio {
                    h = base_h + (aw / min_ratio).floor().max(1.0) as u32;
                }
            }

            if let Some((inc_w, inc_h)) = self.increment {
                if inc_w > 1 && w > base_w {
                    w -= (w - base_w) % inc_w;
                }
                if inc_h > 1 && h > base_h {
                    h -= (h - base_h) % inc_h;
                }
            }
        }

        if let Some((min_w, min_h)) = self.min {
            w = w.max(min_w);
            h = h.max(min_h);
        }
        if let Some((max_w, max_h)) = self.max {
            if max_w > 0 {
                w = w.min(max_w);
            }
            if max_h > 0 {
                h = h.min(max_h);
            }
        }

        (w.max(1), h.max(1))
    }
}

/// Per-window state persisted on the window itself so a restarted manager
/// can put it back where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedState {
    pub screen: u32,
    pub tag: u32,
    pub free: bool,
}

#[derive(Debug, Clone)]
pub struct Client {
    /// The window ID of the application window
    pub window: WindowId,
    /// Frame sub-windows owned by this client
    pub frame: FrameWindows,
    /// Application window geometry in root coordinates
    pub geo: Rect,
    /// The application's own border width. The frame replaces it while
    /// managed; it is put back when the window is released.
    pub border_width: u16,
    /// Last geometry the client had while floating
    pub free_geo: Rect,
    pub max_geo: Option<Rect>,
    pub fullscreen_geo: Option<Rect>,
    pub fullscreen_was_tiled: bool,
    pub flags: ClientFlags,
    pub screen: usize,
    pub tag: usize,
    pub hints: SizeHints,
    pub title: String,
    pub decorated: bool,
    pub transient_for: Option<WindowId>,
    /// Unmap notifications caused by our own reparenting, to be swallowed
    pub pending_unmaps: u32,
}

impl Client {
    pub fn new(window: WindowId, frame: FrameWindows, geo: Rect) -> Self {
        Self {
            window,
            frame,
            geo,
            border_width: 0,
            free_geo: geo,
            max_geo: None,
            fullscreen_geo: None,
            fullscreen_was_tiled: false,
            flags: ClientFlags::empty(),
            screen: 0,
            tag: 0,
            hints: SizeHints::default(),
            title: String::from("Unnamed"),
            decorated: true,
            transient_for: None,
            pending_unmaps: 0,
        }
    }

    pub fn is_tiled(&self) -> bool {
        self.flags.contains(ClientFlags::TILED)
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(ClientFlags::HIDDEN)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.flags.contains(ClientFlags::FULLSCREEN)
    }

    pub fn is_maximized(&self) -> bool {
        self.flags.contains(ClientFlags::MAXIMIZED)
    }

    pub fn is_sticky(&self) -> bool {
        self.flags.contains(ClientFlags::STICKY)
    }

    /// Floating in the user-visible sense: keeps its own geometry.
    pub fn is_floating(&self) -> bool {
        !self.is_tiled() && !self.is_maximized() && !self.is_fullscreen()
    }

    /// Whether the client belongs to `tag` on `screen`, sticky clients belong to all tags.
    pub fn is_on(&self, screen: usize, tag: usize) -> bool {
        self.screen == screen && (self.tag == tag || self.is_sticky())
    }

    /// Member of the tiled subsequence of (`screen`, `tag`).
    pub fn is_tiled_on(&self, screen: usize, tag: usize) -> bool {
        self.is_tiled()
            && !self.is_hidden()
            && !self.is_maximized()
            && !self.is_fullscreen()
            && self.is_on(screen, tag)
    }

    pub fn padding(&self, deco: &Decoration) -> Padding {
        if self.is_fullscreen() {
            return Padding::ZERO;
        }
        if self.decorated {
            deco.padding()
        } else {
            Padding::ZERO
        }
    }

    pub fn outer(&self, deco: &Decoration) -> Rect {
        self.geo.grow(self.padding(deco))
    }

    pub fn saved_state(&self) -> SavedState {
        SavedState {
            screen: self.screen as u32,
            tag: self.tag as u32,
            free: !self.is_tiled() && !self.is_fullscreen(),
        }
    }
}
