//! In-memory display server and renderer for driving the manager in tests.

use std::collections::{BTreeMap, VecDeque};

use anyhow::{anyhow, Result};
use wmfs_rs_config::{BarPosition, TagConfig, WmConfig};

use crate::core::display::{DisplayServer, DragKind, WindowAttributes, WindowProperties, WmState};
use crate::core::event::{ConfigureRequest, WindowId, WmEvent};
use crate::geometry::Rect;
use crate::window::client::{Client, SavedState, SizeHints};
use crate::window::draw::{DecorationState, InfobarView, Region, Renderer};
use crate::window::frame::{FrameLayout, FrameWindows};

pub const ROOT: WindowId = 1;
const FIRST_INTERNAL_ID: WindowId = 0x10_0000;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    CreateFrame { window: WindowId, frame: WindowId },
    DestroyFrame { window: WindowId, restored: bool },
    ConfigureFrame { window: WindowId, outer: Rect },
    ConfigureNotify { window: WindowId, geo: Rect },
    ConfigureUnmanaged(ConfigureRequest),
    SetBorderWidth { window: WindowId, width: u16 },
    CreateBar(WindowId),
    MoveBar(WindowId, Rect),
    DestroyBar(WindowId),
    Map(WindowId),
    Unmap(WindowId),
    SetWmState(WindowId, WmState),
    Raise(WindowId),
    Focus(Option<WindowId>),
    Close(WindowId),
    StoreState(WindowId, SavedState),
    CurrentDesktop(u32),
    DesktopCount(u32),
    GrabKeys(usize),
    GrabButtons { window: WindowId, focused: bool },
    AllowEvents { replay: bool },
    GrabPointer(DragKind),
    UngrabPointer,
    Warp { x: i32, y: i32 },
}

#[derive(Debug, Clone)]
pub struct MockWindow {
    pub attributes: WindowAttributes,
    pub properties: WindowProperties,
}

pub struct MockDisplay {
    pub screens: Vec<Rect>,
    pub windows: BTreeMap<WindowId, MockWindow>,
    pub requests: Vec<Request>,
    pub events: VecDeque<WmEvent>,
    pub drag_events: VecDeque<WmEvent>,
    pub pointer: (i32, i32),
    pub grab_succeeds: bool,
    pub status: Option<String>,
    next_id: WindowId,
}

impl MockDisplay {
    pub fn new(screens: Vec<Rect>) -> Self {
        Self {
            screens,
            windows: BTreeMap::new(),
            requests: Vec::new(),
            events: VecDeque::new(),
            drag_events: VecDeque::new(),
            pointer: (0, 0),
            grab_succeeds: true,
            status: None,
            next_id: FIRST_INTERNAL_ID,
        }
    }

    /// A plain, decorated, unmapped top-level window.
    pub fn add_window(&mut self, window: WindowId, geo: Rect) {
        let properties = WindowProperties {
            title: Some(format!("window {}", window)),
            decorated: true,
            ..WindowProperties::default()
        };
        self.add_window_with(window, geo, properties);
    }

    pub fn add_window_with(&mut self, window: WindowId, geo: Rect, properties: WindowProperties) {
        let attributes = WindowAttributes { override_redirect: false, viewable: false, geometry: geo, border_width: 0 };
        self.windows.insert(window, MockWindow { attributes, properties });
    }

    pub fn destroy(&mut self, window: WindowId) {
        self.windows.remove(&window);
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    pub fn has(&self, request: &Request) -> bool {
        self.requests.contains(request)
    }

    fn fresh_id(&mut self) -> WindowId {
        self.next_id += 1;
        self.next_id
    }
}

impl DisplayServer for MockDisplay {
    fn root(&self) -> WindowId {
        ROOT
    }

    fn screen_geometries(&self) -> Result<Vec<Rect>> {
        Ok(self.screens.clone())
    }

    fn top_level_windows(&self) -> Result<Vec<WindowId>> {
        Ok(self.windows.keys().copied().collect())
    }

    fn attributes(&self, window: WindowId) -> Option<WindowAttributes> {
        self.windows.get(&window).map(|w| w.attributes)
    }

    fn properties(&self, window: WindowId) -> WindowProperties {
        self.windows.get(&window).map(|w| w.properties.clone()).unwrap_or_default()
    }

    fn title(&self, window: WindowId) -> Option<String> {
        self.windows.get(&window).and_then(|w| w.properties.title.clone())
    }

    fn size_hints(&self, window: WindowId) -> SizeHints {
        self.windows.get(&window).map(|w| w.properties.size_hints).unwrap_or_default()
    }

    fn is_urgent(&self, window: WindowId) -> bool {
        self.windows.get(&window).is_some_and(|w| w.properties.urgent)
    }

    fn transient_for(&self, window: WindowId) -> Option<WindowId> {
        self.windows.get(&window).and_then(|w| w.properties.transient_for)
    }

    fn status_text(&self) -> Option<String> {
        self.status.clone()
    }

    fn is_alive(&self, window: WindowId) -> bool {
        self.windows.contains_key(&window)
    }

    fn create_frame(&mut self, window: WindowId, layout: &FrameLayout) -> Result<FrameWindows> {
        let frame = self.fresh_id();
        let titlebar = layout.titlebar.map(|_| self.fresh_id());
        let resize = layout.resize.iter().map(|_| self.fresh_id()).collect();
        let buttons = layout.buttons.iter().map(|_| self.fresh_id()).collect();
        self.requests.push(Request::CreateFrame { window, frame });
        Ok(FrameWindows { frame, titlebar, resize, buttons })
    }

    fn destroy_frame(&mut self, _frame: &FrameWindows, window: WindowId, restore: Option<Rect>) -> Result<()> {
        self.requests.push(Request::DestroyFrame { window, restored: restore.is_some() });
        Ok(())
    }

    fn configure_frame(&mut self, _frame: &FrameWindows, window: WindowId, layout: &FrameLayout) -> Result<()> {
        self.requests.push(Request::ConfigureFrame { window, outer: layout.outer });
        Ok(())
    }

    fn send_configure_notify(&mut self, window: WindowId, geo: Rect, _border_width: u16) -> Result<()> {
        self.requests.push(Request::ConfigureNotify { window, geo });
        Ok(())
    }

    fn configure_unmanaged(&mut self, request: &ConfigureRequest) -> Result<()> {
        self.requests.push(Request::ConfigureUnmanaged(*request));
        Ok(())
    }

    fn set_border_width(&mut self, window: WindowId, width: u16) -> Result<()> {
        self.requests.push(Request::SetBorderWidth { window, width });
        Ok(())
    }

    fn create_bar(&mut self, _geo: Rect) -> Result<WindowId> {
        let bar = self.fresh_id();
        self.requests.push(Request::CreateBar(bar));
        Ok(bar)
    }

    fn move_bar(&mut self, bar: WindowId, geo: Rect) -> Result<()> {
        self.requests.push(Request::MoveBar(bar, geo));
        Ok(())
    }

    fn destroy_bar(&mut self, bar: WindowId) -> Result<()> {
        self.requests.push(Request::DestroyBar(bar));
        Ok(())
    }

    fn map(&mut self, window: WindowId) -> Result<()> {
        self.requests.push(Request::Map(window));
        Ok(())
    }

    fn unmap(&mut self, window: WindowId) -> Result<()> {
        self.requests.push(Request::Unmap(window));
        Ok(())
    }

    fn set_wm_state(&mut self, window: WindowId, state: WmState) -> Result<()> {
        self.requests.push(Request::SetWmState(window, state));
        Ok(())
    }

    fn raise(&mut self, window: WindowId) -> Result<()> {
        self.requests.push(Request::Raise(window));
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<WindowId>) -> Result<()> {
        self.requests.push(Request::Focus(window));
        Ok(())
    }

    fn close_window(&mut self, window: WindowId) -> Result<()> {
        self.requests.push(Request::Close(window));
        Ok(())
    }

    fn store_state(&mut self, window: WindowId, state: &SavedState) -> Result<()> {
        self.requests.push(Request::StoreState(window, *state));
        Ok(())
    }

    fn set_desktop_count(&mut self, count: u32) -> Result<()> {
        self.requests.push(Request::DesktopCount(count));
        Ok(())
    }

    fn set_current_desktop(&mut self, desktop: u32) -> Result<()> {
        self.requests.push(Request::CurrentDesktop(desktop));
        Ok(())
    }

    fn grab_keys(&mut self, keys: &[(u16, u32)]) -> Result<()> {
        self.requests.push(Request::GrabKeys(keys.len()));
        Ok(())
    }

    fn grab_buttons(&mut self, window: WindowId, focused: bool, _bindings: &[(u16, u8)]) -> Result<()> {
        self.requests.push(Request::GrabButtons { window, focused });
        Ok(())
    }

    fn allow_pointer_events(&mut self, replay: bool) -> Result<()> {
        self.requests.push(Request::AllowEvents { replay });
        Ok(())
    }

    fn grab_pointer(&mut self, kind: DragKind) -> Result<bool> {
        self.requests.push(Request::GrabPointer(kind));
        Ok(self.grab_succeeds)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.requests.push(Request::UngrabPointer);
        Ok(())
    }

    fn query_pointer(&self) -> Result<(i32, i32)> {
        Ok(self.pointer)
    }

    fn warp_pointer(&mut self, _window: WindowId, x: i32, y: i32) -> Result<()> {
        self.pointer = (x, y);
        self.requests.push(Request::Warp { x, y });
        Ok(())
    }

    fn next_event(&mut self) -> Result<WmEvent> {
        self.events.pop_front().ok_or_else(|| anyhow!("event queue exhausted"))
    }

    fn next_drag_event(&mut self) -> Result<WmEvent> {
        self.drag_events.pop_front().ok_or_else(|| anyhow!("drag event queue exhausted"))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Drawn {
    Decoration(WindowId, DecorationState),
    Infobar { screen: usize, tags: Vec<String>, layout: &'static str, status: String },
}

/// Records what would have been painted.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub drawn: Vec<Drawn>,
    pub colors: Vec<(WindowId, DecorationState)>,
}

impl RecordingRenderer {
    pub const CHAR_WIDTH: u32 = 6;

    pub fn last_infobar(&self, screen: usize) -> Option<&Drawn> {
        self.drawn
            .iter()
            .rev()
            .find(|d| matches!(d, Drawn::Infobar { screen: s, .. } if *s == screen))
    }
}

impl Renderer for RecordingRenderer {
    fn redraw(&mut self, region: Region<'_>) -> Result<()> {
        let drawn = match region {
            Region::Decoration { client, state, .. } => Drawn::Decoration(client.window, state),
            Region::Infobar(bar) => Drawn::Infobar {
                screen: bar.screen,
                tags: bar.tags.iter().map(|t| t.label()).collect(),
                layout: bar.layout,
                status: bar.status.clone(),
            },
        };
        self.drawn.push(drawn);
        Ok(())
    }

    fn set_decoration_color(&mut self, client: &Client, state: DecorationState) -> Result<()> {
        self.colors.push((client.window, state));
        Ok(())
    }

    fn infobar_hit(&self, bar: &InfobarView, x: i32) -> Option<usize> {
        bar.hit(x, Self::CHAR_WIDTH)
    }
}

/// Undecorated clients, no bar, three tags split 0.6 by default.
pub fn test_config() -> WmConfig {
    let mut config = WmConfig::default();
    config.client.border_width = 0;
    config.client.titlebar_height = 0;
    config.client.buttons.clear();
    config.bar.position = BarPosition::Hidden;
    config.tags = ["one", "two", "three"]
        .iter()
        .map(|name| TagConfig { name: name.to_string(), mwfact: 0.6, ..TagConfig::default() })
        .collect();
    config
}
