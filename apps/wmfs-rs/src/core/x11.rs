//! `DisplayServer` over an x11rb connection.

use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::Result;
use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{
    Allow, Atom, AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageData, ClientMessageEvent,
    ConfigWindow, ConfigureNotifyEvent, ConfigureWindowAux, ConnectionExt, CreateWindowAux, EventMask, Grab,
    GrabMode, GrabStatus, Gravity, InputFocus, MapState, ModMask, NotifyDetail, NotifyMode, PropMode, SetMode,
    StackMode, Window, WindowClass, CLIENT_MESSAGE_EVENT, CONFIGURE_NOTIFY_EVENT,
};
use x11rb::protocol::Event;
use x11rb::wrapper::ConnectionExt as _;
use wmfs_rs_config::{MOD_2, MOD_LOCK};

use crate::core::context::Context;
use crate::core::display::{DisplayServer, DragKind, WindowAttributes, WindowProperties, WmState};
use crate::core::event::{ButtonEvent, ConfigureRequest, PropertyKind, WindowId, WmEvent};
use crate::ewmh::setup::{set_active_window, set_current_desktop, set_desktop_count};
use crate::geometry::Rect;
use crate::window::client::{SavedState, SizeHints};
use crate::window::cursors::Cursors;
use crate::window::frame::{FrameLayout, FrameWindows};

/// Modifier combinations a grab is repeated under so CapsLock/NumLock do not break bindings.
const LOCK_COMBOS: [u16; 4] = [0, MOD_LOCK, MOD_2, MOD_LOCK | MOD_2];
const IGNORED_MODS: u16 = MOD_LOCK | MOD_2;

// WM_NORMAL_HINTS flags
const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;

const URGENCY_HINT: u32 = 1 << 8;
const MWM_HINTS_DECORATIONS: u32 = 1 << 1;

fn window_aux(rect: Rect) -> ConfigureWindowAux {
    ConfigureWindowAux::new()
        .x(rect.x)
        .y(rect.y)
        .width(rect.width.max(1))
        .height(rect.height.max(1))
}

/// Keycode to keysym table, first column only for lookups.
struct KeyboardMap {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<u32>,
}

impl KeyboardMap {
    fn load(ctx: &Context) -> Result<Self> {
        let setup = ctx.conn.setup();
        let min_keycode = setup.min_keycode;
        let max_keycode = setup.max_keycode;
        let mapping = ctx
            .conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)?
            .reply()?;
        Ok(Self {
            min_keycode,
            per_keycode: (mapping.keysyms_per_keycode as usize).max(1),
            keysyms: mapping.keysyms,
        })
    }

    fn keysym(&self, keycode: u8) -> u32 {
        let index = keycode.saturating_sub(self.min_keycode) as usize * self.per_keycode;
        self.keysyms.get(index).copied().unwrap_or(0)
    }

    fn keycodes(&self, keysym: u32) -> Vec<u8> {
        self.keysyms
            .chunks(self.per_keycode)
            .enumerate()
            .filter(|(_, chunk)| chunk.contains(&keysym))
            .map(|(i, _)| self.min_keycode + i as u8)
            .collect()
    }
}

pub struct X11Display {
    ctx: Rc<Context>,
    cursors: Cursors,
    keyboard: KeyboardMap,
    /// Events that arrived during a drag, replayed by the outer loop
    deferred: VecDeque<WmEvent>,
}

impl X11Display {
    pub fn new(ctx: Rc<Context>) -> Result<Self> {
        let cursors = Cursors::new(&ctx.conn, ctx.screen_num)?;
        let keyboard = KeyboardMap::load(&ctx)?;
        ctx.conn.change_window_attributes(
            ctx.root_window,
            &ChangeWindowAttributesAux::new().cursor(cursors.normal),
        )?;
        Ok(Self { ctx, cursors, keyboard, deferred: VecDeque::new() })
    }

    fn property32(&self, window: Window, property: impl Into<Atom>, type_: impl Into<Atom>, len: u32) -> Option<Vec<u32>> {
        let reply = self
            .ctx
            .conn
            .get_property(false, window, property, type_, 0, len)
            .ok()?
            .reply()
            .ok()?;
        if reply.format != 32 {
            return None;
        }
        reply.value32().map(|values| values.collect())
    }

    fn property_string(&self, window: Window, property: impl Into<Atom>, type_: impl Into<Atom>) -> Option<String> {
        let reply = self
            .ctx
            .conn
            .get_property(false, window, property, type_, 0, 1024)
            .ok()?
            .reply()
            .ok()?;
        if reply.format != 8 || reply.value.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&reply.value).into_owned())
    }

    fn supports_protocol(&self, window: Window, protocol: Atom) -> bool {
        self.property32(window, self.ctx.atoms.WM_PROTOCOLS, AtomEnum::ATOM, 64)
            .is_some_and(|protocols| protocols.contains(&protocol))
    }

    fn send_protocol(&self, window: Window, protocol: Atom) -> Result<()> {
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            window,
            type_: self.ctx.atoms.WM_PROTOCOLS,
            data: ClientMessageData::from([protocol, x11rb::CURRENT_TIME, 0, 0, 0]),
            sequence: 0,
        };
        self.ctx.conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn is_fullscreen_requested(&self, window: Window) -> bool {
        self.property32(window, self.ctx.atoms._NET_WM_STATE, AtomEnum::ATOM, 32)
            .is_some_and(|states| states.contains(&self.ctx.atoms._NET_WM_STATE_FULLSCREEN))
    }

    fn is_decorated(&self, window: Window) -> bool {
        match self.property32(window, self.ctx.atoms._MOTIF_WM_HINTS, AtomEnum::ANY, 5) {
            Some(hints) if hints.len() >= 3 && hints[0] & MWM_HINTS_DECORATIONS != 0 => hints[2] != 0,
            _ => true,
        }
    }

    fn desktop(&self, window: Window) -> Option<u32> {
        self.property32(window, self.ctx.atoms._NET_WM_DESKTOP, AtomEnum::CARDINAL, 1)?
            .first()
            .copied()
    }

    fn saved_state(&self, window: Window) -> Option<SavedState> {
        let values = self.property32(window, self.ctx.atoms._WMFS_STATE, AtomEnum::CARDINAL, 3)?;
        match values.as_slice() {
            [tag, screen, free] => Some(SavedState { screen: *screen, tag: *tag, free: *free != 0 }),
            _ => None,
        }
    }

    fn create_child(&self, parent: Window, rect: Rect, mask: EventMask, cursor: u32) -> Result<Window> {
        let window = self.ctx.conn.generate_id()?;
        self.ctx.conn.create_window(
            self.ctx.root_depth,
            window,
            parent,
            rect.x as i16,
            rect.y as i16,
            rect.width.max(1) as u16,
            rect.height.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new().event_mask(mask).background_pixel(0).cursor(cursor),
        )?;
        self.ctx.conn.map_window(window)?;
        Ok(window)
    }

    fn translate(&mut self, event: Event) -> WmEvent {
        match event {
            Event::MapRequest(e) => WmEvent::MapRequest { window: e.window },
            Event::DestroyNotify(e) => WmEvent::DestroyNotify { window: e.window },
            Event::UnmapNotify(e) => WmEvent::UnmapNotify { window: e.window, event: e.event },
            Event::ConfigureRequest(e) => {
                let has = |flag: ConfigWindow| e.value_mask.contains(flag);
                WmEvent::ConfigureRequest(ConfigureRequest {
                    window: e.window,
                    x: has(ConfigWindow::X).then_some(e.x as i32),
                    y: has(ConfigWindow::Y).then_some(e.y as i32),
                    width: has(ConfigWindow::WIDTH).then_some(e.width as u32),
                    height: has(ConfigWindow::HEIGHT).then_some(e.height as u32),
                    border_width: has(ConfigWindow::BORDER_WIDTH).then_some(e.border_width),
                    raise: has(ConfigWindow::STACK_MODE) && e.stack_mode == StackMode::ABOVE,
                })
            }
            Event::ButtonPress(e) => WmEvent::ButtonPress(ButtonEvent {
                window: e.event,
                button: e.detail,
                modifiers: u16::from(e.state) & 0xff & !IGNORED_MODS,
                root_x: e.root_x as i32,
                root_y: e.root_y as i32,
                event_x: e.event_x as i32,
                event_y: e.event_y as i32,
            }),
            Event::ButtonRelease(e) => WmEvent::ButtonRelease(ButtonEvent {
                window: e.event,
                button: e.detail,
                modifiers: u16::from(e.state) & 0xff & !IGNORED_MODS,
                root_x: e.root_x as i32,
                root_y: e.root_y as i32,
                event_x: e.event_x as i32,
                event_y: e.event_y as i32,
            }),
            Event::MotionNotify(e) => WmEvent::MotionNotify { root_x: e.root_x as i32, root_y: e.root_y as i32 },
            Event::EnterNotify(e) if e.mode == NotifyMode::NORMAL && e.detail != NotifyDetail::INFERIOR => {
                WmEvent::EnterNotify { window: e.event }
            }
            Event::KeyPress(e) => WmEvent::KeyPress {
                keysym: self.keyboard.keysym(e.detail),
                modifiers: u16::from(e.state) & 0xff & !IGNORED_MODS,
            },
            Event::Expose(e) => WmEvent::Expose { window: e.window, count: e.count },
            Event::PropertyNotify(e) => {
                let atoms = &self.ctx.atoms;
                let property = if e.atom == atoms._NET_WM_NAME || e.atom == u32::from(AtomEnum::WM_NAME) {
                    PropertyKind::Title
                } else if e.atom == u32::from(AtomEnum::WM_NORMAL_HINTS) {
                    PropertyKind::SizeHints
                } else if e.atom == u32::from(AtomEnum::WM_HINTS) {
                    PropertyKind::WmHints
                } else if e.atom == u32::from(AtomEnum::WM_TRANSIENT_FOR) {
                    PropertyKind::TransientFor
                } else if e.atom == atoms._WMFS_STATUSTEXT && e.window == self.ctx.root_window {
                    PropertyKind::StatusText
                } else {
                    PropertyKind::Other
                };
                WmEvent::PropertyNotify { window: e.window, property }
            }
            Event::RandrScreenChangeNotify(_) => WmEvent::ScreenChange,
            Event::ConfigureNotify(e) if e.window == self.ctx.root_window => WmEvent::ScreenChange,
            Event::MappingNotify(_) => {
                match KeyboardMap::load(&self.ctx) {
                    Ok(keyboard) => self.keyboard = keyboard,
                    Err(e) => warn!("Failed to reload keyboard mapping: {}", e),
                }
                WmEvent::Ignored
            }
            Event::Error(e) => {
                debug!("X11 error: {:?}", e);
                WmEvent::Ignored
            }
            _ => WmEvent::Ignored,
        }
    }
}

impl DisplayServer for X11Display {
    fn root(&self) -> WindowId {
        self.ctx.root_window
    }

    fn screen_geometries(&self) -> Result<Vec<Rect>> {
        let monitors = self
            .ctx
            .conn
            .randr_get_monitors(self.ctx.root_window, true)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map(|reply| reply.monitors)
            .unwrap_or_default();

        let mut screens: Vec<Rect> = monitors
            .iter()
            .map(|m| Rect::new(m.x as i32, m.y as i32, m.width as u32, m.height as u32))
            .filter(|r| r.width > 0 && r.height > 0)
            .collect();

        if screens.is_empty() {
            let geo = self.ctx.conn.get_geometry(self.ctx.root_window)?.reply()?;
            screens.push(Rect::new(0, 0, geo.width as u32, geo.height as u32));
        }
        Ok(screens)
    }

    fn top_level_windows(&self) -> Result<Vec<WindowId>> {
        Ok(self.ctx.conn.query_tree(self.ctx.root_window)?.reply()?.children)
    }

    fn attributes(&self, window: WindowId) -> Option<WindowAttributes> {
        let attrs = self.ctx.conn.get_window_attributes(window).ok()?.reply().ok()?;
        let geo = self.ctx.conn.get_geometry(window).ok()?.reply().ok()?;
        Some(WindowAttributes {
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
            geometry: Rect::new(geo.x as i32, geo.y as i32, geo.width as u32, geo.height as u32),
            border_width: geo.border_width,
        })
    }

    fn properties(&self, window: WindowId) -> WindowProperties {
        WindowProperties {
            title: self.title(window),
            size_hints: self.size_hints(window),
            desktop: self.desktop(window),
            transient_for: self.transient_for(window),
            fullscreen: self.is_fullscreen_requested(window),
            urgent: self.is_urgent(window),
            decorated: self.is_decorated(window),
            saved_state: self.saved_state(window),
        }
    }

    fn title(&self, window: WindowId) -> Option<String> {
        self.property_string(window, self.ctx.atoms._NET_WM_NAME, self.ctx.atoms.UTF8_STRING)
            .or_else(|| self.property_string(window, AtomEnum::WM_NAME, AtomEnum::ANY))
    }

    fn size_hints(&self, window: WindowId) -> SizeHints {
        let Some(data) = self.property32(window, AtomEnum::WM_NORMAL_HINTS, AtomEnum::ANY, 18) else {
            return SizeHints::default();
        };
        if data.is_empty() {
            return SizeHints::default();
        }
        let flags = data[0];
        let pair = |flag: u32, i: usize| -> Option<(u32, u32)> {
            (flags & flag != 0 && data.len() > i + 1).then(|| (data[i], data[i + 1]))
        };
        let ratio = |num: u32, den: u32| if den == 0 { 0.0 } else { num as f64 / den as f64 };

        SizeHints {
            min: pair(P_MIN_SIZE, 5),
            max: pair(P_MAX_SIZE, 7).filter(|(w, h)| *w > 0 || *h > 0),
            increment: pair(P_RESIZE_INC, 9),
            aspect: (flags & P_ASPECT != 0 && data.len() >= 15)
                .then(|| (ratio(data[11], data[12]), ratio(data[13], data[14]))),
            base: pair(P_BASE_SIZE, 15),
        }
    }

    fn is_urgent(&self, window: WindowId) -> bool {
        self.property32(window, AtomEnum::WM_HINTS, AtomEnum::ANY, 9)
            .and_then(|hints| hints.first().copied())
            .is_some_and(|flags| flags & URGENCY_HINT != 0)
    }

    fn transient_for(&self, window: WindowId) -> Option<WindowId> {
        self.property32(window, AtomEnum::WM_TRANSIENT_FOR, AtomEnum::WINDOW, 1)?
            .first()
            .copied()
            .filter(|w| *w != x11rb::NONE)
    }

    fn status_text(&self) -> Option<String> {
        self.property_string(self.ctx.root_window, self.ctx.atoms._WMFS_STATUSTEXT, AtomEnum::ANY)
    }

    fn is_alive(&self, window: WindowId) -> bool {
        self.ctx
            .conn
            .get_window_attributes(window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .is_some()
    }

    fn create_frame(&mut self, window: WindowId, layout: &FrameLayout) -> Result<FrameWindows> {
        let conn = &self.ctx.conn;
        let outer = layout.outer;
        let frame = conn.generate_id()?;
        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::ENTER_WINDOW
            | EventMask::EXPOSURE;
        conn.create_window(
            self.ctx.root_depth,
            frame,
            self.ctx.root_window,
            outer.x as i16,
            outer.y as i16,
            outer.width.max(1) as u16,
            outer.height.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new().event_mask(mask).background_pixel(0),
        )?;

        let deco_mask = EventMask::BUTTON_PRESS | EventMask::EXPOSURE | EventMask::ENTER_WINDOW;
        let titlebar = match layout.titlebar {
            Some(rect) => Some(self.create_child(frame, rect, deco_mask, self.cursors.normal)?),
            None => None,
        };
        let resize = layout
            .resize
            .iter()
            .map(|rect| self.create_child(frame, *rect, deco_mask, self.cursors.resize))
            .collect::<Result<Vec<_>>>()?;
        let buttons = layout
            .buttons
            .iter()
            .map(|rect| self.create_child(frame, *rect, deco_mask, self.cursors.normal))
            .collect::<Result<Vec<_>>>()?;

        let conn = &self.ctx.conn;
        conn.change_save_set(SetMode::INSERT, window)?;
        conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::PROPERTY_CHANGE | EventMask::ENTER_WINDOW)
                .win_gravity(Gravity::NORTH_WEST),
        )?;
        conn.reparent_window(window, frame, layout.client.x as i16, layout.client.y as i16)?;
        conn.configure_window(window, &window_aux(layout.client).border_width(0))?;

        debug!("Created frame {} for client {}", frame, window);
        Ok(FrameWindows { frame, titlebar, resize, buttons })
    }

    fn destroy_frame(&mut self, frame: &FrameWindows, window: WindowId, restore: Option<Rect>) -> Result<()> {
        let conn = &self.ctx.conn;
        if let Some(geo) = restore {
            conn.reparent_window(window, self.ctx.root_window, geo.x as i16, geo.y as i16)?;
            conn.change_save_set(SetMode::DELETE, window)?;
        }
        conn.destroy_window(frame.frame)?;
        Ok(())
    }

    fn configure_frame(&mut self, frame: &FrameWindows, window: WindowId, layout: &FrameLayout) -> Result<()> {
        let conn = &self.ctx.conn;
        conn.configure_window(frame.frame, &window_aux(layout.outer))?;
        conn.configure_window(window, &window_aux(layout.client))?;
        if let (Some(titlebar), Some(rect)) = (frame.titlebar, layout.titlebar) {
            conn.configure_window(titlebar, &window_aux(rect))?;
        }
        for (handle, rect) in frame.resize.iter().zip(&layout.resize) {
            conn.configure_window(*handle, &window_aux(*rect))?;
        }
        for (button, rect) in frame.buttons.iter().zip(&layout.buttons) {
            conn.configure_window(*button, &window_aux(*rect))?;
        }
        Ok(())
    }

    fn send_configure_notify(&mut self, window: WindowId, geo: Rect, border_width: u16) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: geo.x as i16,
            y: geo.y as i16,
            width: geo.width as u16,
            height: geo.height as u16,
            border_width,
            override_redirect: false,
        };
        self.ctx.conn.send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn configure_unmanaged(&mut self, request: &ConfigureRequest) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        aux.x = request.x;
        aux.y = request.y;
        aux.width = request.width;
        aux.height = request.height;
        aux.border_width = request.border_width.map(u32::from);
        if request.raise {
            aux = aux.stack_mode(StackMode::ABOVE);
        }
        self.ctx.conn.configure_window(request.window, &aux)?;
        Ok(())
    }

    fn set_border_width(&mut self, window: WindowId, width: u16) -> Result<()> {
        self.ctx
            .conn
            .configure_window(window, &ConfigureWindowAux::new().border_width(width as u32))?;
        Ok(())
    }

    fn create_bar(&mut self, geo: Rect) -> Result<WindowId> {
        let bar = self.ctx.conn.generate_id()?;
        self.ctx.conn.create_window(
            self.ctx.root_depth,
            bar,
            self.ctx.root_window,
            geo.x as i16,
            geo.y as i16,
            geo.width.max(1) as u16,
            geo.height.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new()
                .override_redirect(1)
                .event_mask(EventMask::BUTTON_PRESS | EventMask::EXPOSURE)
                .cursor(self.cursors.normal),
        )?;
        self.ctx.conn.map_window(bar)?;
        self.raise(bar)?;
        Ok(bar)
    }

    fn move_bar(&mut self, bar: WindowId, geo: Rect) -> Result<()> {
        self.ctx.conn.configure_window(bar, &window_aux(geo))?;
        Ok(())
    }

    fn destroy_bar(&mut self, bar: WindowId) -> Result<()> {
        self.ctx.conn.destroy_window(bar)?;
        Ok(())
    }

    fn map(&mut self, window: WindowId) -> Result<()> {
        self.ctx.conn.map_window(window)?;
        Ok(())
    }

    fn unmap(&mut self, window: WindowId) -> Result<()> {
        self.ctx.conn.unmap_window(window)?;
        Ok(())
    }

    fn set_wm_state(&mut self, window: WindowId, state: WmState) -> Result<()> {
        self.ctx.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.ctx.atoms.WM_STATE,
            self.ctx.atoms.WM_STATE,
            &[state as u32, x11rb::NONE],
        )?;
        Ok(())
    }

    fn raise(&mut self, window: WindowId) -> Result<()> {
        self.ctx
            .conn
            .configure_window(window, &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE))?;
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<WindowId>) -> Result<()> {
        let target = window.unwrap_or(self.ctx.root_window);
        self.ctx
            .conn
            .set_input_focus(InputFocus::POINTER_ROOT, target, x11rb::CURRENT_TIME)?;
        if let Some(window) = window {
            if self.supports_protocol(window, self.ctx.atoms.WM_TAKE_FOCUS) {
                self.send_protocol(window, self.ctx.atoms.WM_TAKE_FOCUS)?;
            }
        }
        set_active_window(&self.ctx, window)
    }

    fn close_window(&mut self, window: WindowId) -> Result<()> {
        if self.supports_protocol(window, self.ctx.atoms.WM_DELETE_WINDOW) {
            self.send_protocol(window, self.ctx.atoms.WM_DELETE_WINDOW)
        } else {
            self.ctx.conn.kill_client(window)?;
            Ok(())
        }
    }

    fn store_state(&mut self, window: WindowId, state: &SavedState) -> Result<()> {
        self.ctx.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.ctx.atoms._WMFS_STATE,
            AtomEnum::CARDINAL,
            &[state.tag, state.screen, state.free as u32],
        )?;
        Ok(())
    }

    fn set_current_desktop(&mut self, desktop: u32) -> Result<()> {
        set_current_desktop(&self.ctx, desktop)
    }

    fn set_desktop_count(&mut self, count: u32) -> Result<()> {
        set_desktop_count(&self.ctx, count)
    }

    fn grab_keys(&mut self, keys: &[(u16, u32)]) -> Result<()> {
        let root = self.ctx.root_window;
        self.ctx.conn.ungrab_key(Grab::ANY, root, ModMask::ANY)?;
        for (mods, keysym) in keys {
            let keycodes = self.keyboard.keycodes(*keysym);
            if keycodes.is_empty() {
                warn!("No keycode for keysym 0x{:x}", keysym);
            }
            for keycode in keycodes {
                for extra in LOCK_COMBOS {
                    self.ctx.conn.grab_key(
                        true,
                        root,
                        ModMask::from(mods | extra),
                        keycode,
                        GrabMode::ASYNC,
                        GrabMode::ASYNC,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn grab_buttons(&mut self, window: WindowId, focused: bool, bindings: &[(u16, u8)]) -> Result<()> {
        let conn = &self.ctx.conn;
        conn.ungrab_button(ButtonIndex::ANY, window, ModMask::ANY)?;
        if !focused {
            conn.grab_button(
                false,
                window,
                EventMask::BUTTON_PRESS,
                GrabMode::SYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                ButtonIndex::ANY,
                ModMask::ANY,
            )?;
            return Ok(());
        }
        for (mods, button) in bindings {
            for extra in LOCK_COMBOS {
                conn.grab_button(
                    false,
                    window,
                    EventMask::BUTTON_PRESS,
                    GrabMode::SYNC,
                    GrabMode::ASYNC,
                    x11rb::NONE,
                    x11rb::NONE,
                    ButtonIndex::from(*button),
                    ModMask::from(mods | extra),
                )?;
            }
        }
        Ok(())
    }

    fn allow_pointer_events(&mut self, replay: bool) -> Result<()> {
        let mode = if replay { Allow::REPLAY_POINTER } else { Allow::ASYNC_POINTER };
        self.ctx.conn.allow_events(mode, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn grab_pointer(&mut self, kind: DragKind) -> Result<bool> {
        let reply = self
            .ctx
            .conn
            .grab_pointer(
                false,
                self.ctx.root_window,
                EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                self.cursors.for_drag(kind),
                x11rb::CURRENT_TIME,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&mut self) -> Result<()> {
        self.ctx.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn query_pointer(&self) -> Result<(i32, i32)> {
        let reply = self.ctx.conn.query_pointer(self.ctx.root_window)?.reply()?;
        Ok((reply.root_x as i32, reply.root_y as i32))
    }

    fn warp_pointer(&mut self, window: WindowId, x: i32, y: i32) -> Result<()> {
        self.ctx
            .conn
            .warp_pointer(x11rb::NONE, window, 0, 0, 0, 0, x as i16, y as i16)?;
        Ok(())
    }

    fn next_event(&mut self) -> Result<WmEvent> {
        if let Some(event) = self.deferred.pop_front() {
            return Ok(event);
        }
        self.ctx.conn.flush()?;
        let event = self.ctx.conn.wait_for_event()?;
        Ok(self.translate(event))
    }

    fn next_drag_event(&mut self) -> Result<WmEvent> {
        loop {
            self.ctx.conn.flush()?;
            let event = self.ctx.conn.wait_for_event()?;
            match self.translate(event) {
                event @ (WmEvent::MotionNotify { .. } | WmEvent::ButtonRelease(_) | WmEvent::Expose { .. }) => {
                    return Ok(event)
                }
                WmEvent::Ignored => {}
                other => self.deferred.push_back(other),
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.ctx.conn.flush()?;
        Ok(())
    }
}
