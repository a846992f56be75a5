//! Physical screens, their infobars and tag sets.

use wmfs_rs_config::{BarPosition, TagConfig};

use crate::core::event::WindowId;
use crate::geometry::Rect;
use crate::tag::TagSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Infobar {
    pub position: BarPosition,
    pub height: u32,
    /// Bar window, created by the manager once the screen exists
    pub window: Option<WindowId>,
}

impl Infobar {
    /// The bar strip within `screen`, `None` when hidden.
    pub fn geometry(&self, screen: Rect) -> Option<Rect> {
        let height = self.height.min(screen.height.saturating_sub(1));
        match self.position {
            BarPosition::Hidden => None,
            _ if height == 0 => None,
            BarPosition::Top => Some(Rect::new(screen.x, screen.y, screen.width, height)),
            BarPosition::Bottom => {
                Some(Rect::new(screen.x, screen.bottom() - height as i32, screen.width, height))
            }
        }
    }

    /// Top, then bottom, then hidden.
    pub fn toggle_position(&mut self) {
        self.position = match self.position {
            BarPosition::Top => BarPosition::Bottom,
            BarPosition::Bottom => BarPosition::Hidden,
            BarPosition::Hidden => BarPosition::Top,
        };
    }
}

#[derive(Debug, Clone)]
pub struct Screen {
    pub index: usize,
    pub geo: Rect,
    pub tags: TagSet,
    pub infobar: Infobar,
}

impl Screen {
    /// Screen area minus the infobar strip.
    pub fn usable(&self) -> Rect {
        match self.infobar.geometry(self.geo) {
            None => self.geo,
            Some(bar) if self.infobar.position == BarPosition::Top => Rect::new(
                self.geo.x,
                self.geo.y + bar.height as i32,
                self.geo.width,
                self.geo.height - bar.height,
            ),
            Some(bar) => Rect::new(self.geo.x, self.geo.y, self.geo.width, self.geo.height - bar.height),
        }
    }

    pub fn bar_geometry(&self) -> Option<Rect> {
        self.infobar.geometry(self.geo)
    }
}

/// What a topology change did to the screen list.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Rebuild {
    /// Indices of screens that did not exist before
    pub added: Vec<usize>,
    /// Bar windows of screens that vanished
    pub orphaned_bars: Vec<WindowId>,
}

#[derive(Debug, Clone)]
pub struct ScreenRegistry {
    screens: Vec<Screen>,
    selected: usize,
    tag_configs: Vec<TagConfig>,
    bar: Infobar,
}

impl ScreenRegistry {
    pub fn new(geometries: &[Rect], tag_configs: &[TagConfig], position: BarPosition, bar_height: u32) -> Self {
        let mut registry = Self {
            screens: Vec::new(),
            selected: 0,
            tag_configs: tag_configs.to_vec(),
            bar: Infobar { position, height: bar_height, window: None },
        };
        registry.rebuild(geometries);
        registry
    }

    fn fresh_screen(&self, index: usize, geo: Rect) -> Screen {
        Screen { index, geo, tags: TagSet::from_config(&self.tag_configs), infobar: self.bar.clone() }
    }

    /// Apply a new topology. Screens whose index survives keep their tags and bar.
    pub fn rebuild(&mut self, geometries: &[Rect]) -> Rebuild {
        let fallback = [Rect::new(0, 0, 1, 1)];
        let geometries = if geometries.is_empty() { &fallback[..] } else { geometries };

        let mut rebuild = Rebuild::default();
        for screen in self.screens.drain(geometries.len().min(self.screens.len())..) {
            rebuild.orphaned_bars.extend(screen.infobar.window);
        }
        for (index, geo) in geometries.iter().enumerate() {
            match self.screens.get_mut(index) {
                Some(screen) => screen.geo = *geo,
                None => {
                    let screen = self.fresh_screen(index, *geo);
                    self.screens.push(screen);
                    rebuild.added.push(index);
                }
            }
        }
        if self.selected >= self.screens.len() {
            self.selected = 0;
        }
        rebuild
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.screens.len() {
            return false;
        }
        self.selected = index;
        true
    }

    pub fn next_index(&self) -> usize {
        (self.selected + 1) % self.screens.len()
    }

    pub fn prev_index(&self) -> usize {
        (self.selected + self.screens.len() - 1) % self.screens.len()
    }

    pub fn get(&self, index: usize) -> Option<&Screen> {
        self.screens.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Screen> {
        self.screens.get_mut(index)
    }

    pub fn current(&self) -> &Screen {
        &self.screens[self.selected]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Screen> {
        self.screens.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Screen> {
        self.screens.iter_mut()
    }

    /// Selected tag of `screen`, 0 for an unknown screen.
    pub fn selected_tag(&self, screen: usize) -> usize {
        self.screens.get(screen).map(|s| s.tags.selected()).unwrap_or(0)
    }

    /// Screen containing the point, falling back to the first one.
    pub fn screen_at(&self, x: i32, y: i32) -> usize {
        self.screens
            .iter()
            .position(|s| s.geo.contains_point(x, y))
            .unwrap_or(0)
    }

    /// The screen whose bar window is `window`.
    pub fn by_bar(&self, window: WindowId) -> Option<usize> {
        self.screens.iter().position(|s| s.infobar.window == Some(window))
    }
}
