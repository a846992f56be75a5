//! Event dispatch: one handler per display event.

use anyhow::Result;
use tracing::{debug, info, warn};
use wmfs_rs_config::MouseContext;

use crate::core::display::{DisplayServer, DragKind};
use crate::core::event::{ButtonEvent, ConfigureRequest, PropertyKind, WindowId, WmEvent};
use crate::geometry::Rect;
use crate::window::client::ClientFlags;
use crate::window::draw::Renderer;
use crate::window::error::WmError;
use crate::window::frame::FramePart;
use crate::window::manager::WindowManager;
use crate::window::registry::HandleKind;

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Quit,
    Reload,
}

impl<D: DisplayServer, R: Renderer> WindowManager<D, R> {
    /// Pump events until a quit or reload command.
    pub fn run(&mut self) -> Result<RunOutcome> {
        self.exit = None;
        let mut healthy = true;
        loop {
            let event = self
                .display
                .next_event()
                .map_err(|e| WmError::ConnectionLost(e.to_string()))?;
            if let Err(e) = self.handle_event(event) {
                self.error_tracker.record_window_error("event handler", e);
            }
            if let Some(outcome) = self.exit.take() {
                info!("Leaving event loop: {:?}", outcome);
                return Ok(outcome);
            }

            let health = self.error_tracker.health_check();
            if healthy && !health.is_healthy {
                warn!(
                    "Health degraded: display errors: {}, grab errors: {}, window errors: {}",
                    health.display_errors, health.grab_errors, health.window_errors
                );
            }
            healthy = health.is_healthy;
        }
    }

    pub fn handle_event(&mut self, event: WmEvent) -> Result<()> {
        match event {
            WmEvent::MapRequest { window } => self.on_map_request(window),
            WmEvent::DestroyNotify { window } => self.unmanage(window, true),
            WmEvent::UnmapNotify { window, event } => self.on_unmap(window, event),
            WmEvent::ConfigureRequest(request) => self.on_configure_request(&request),
            WmEvent::ButtonPress(e) => self.on_button_press(&e),
            WmEvent::EnterNotify { window } => self.on_enter(window),
            WmEvent::KeyPress { keysym, modifiers } => match self.bindings.key(modifiers, keysym).cloned() {
                Some(command) => self.execute(&command),
                None => Ok(()),
            },
            WmEvent::Expose { window, count: 0 } => {
                self.on_expose(window);
                Ok(())
            }
            WmEvent::PropertyNotify { window, property } => self.on_property(window, property),
            WmEvent::ScreenChange => self.handle_screen_change(),
            WmEvent::ButtonRelease(_) | WmEvent::MotionNotify { .. } | WmEvent::Expose { .. } | WmEvent::Ignored => {
                Ok(())
            }
        }
    }

    fn on_map_request(&mut self, window: WindowId) -> Result<()> {
        if let Some(client) = self.clients.get(window) {
            if self.is_visible(client) {
                self.unhide(window)?;
                self.focus(Some(window))?;
            }
            return Ok(());
        }
        match self.display.attributes(window) {
            Some(attrs) if attrs.override_redirect => self.display.map(window),
            Some(_) => self.manage(window, false),
            None => Ok(()),
        }
    }

    fn on_unmap(&mut self, window: WindowId, event: WindowId) -> Result<()> {
        let root = self.display.root();
        let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
        if event != root && event != client.frame.frame {
            debug!("Ignoring unmap of {} reported on stale frame {}", window, event);
            return Ok(());
        }
        if client.pending_unmaps > 0 {
            client.pending_unmaps -= 1;
            return Ok(());
        }
        self.unmanage(window, false)
    }

    fn on_configure_request(&mut self, request: &ConfigureRequest) -> Result<()> {
        let window = request.window;
        let Some(client) = self.clients.get_mut(window) else {
            return self.display.configure_unmanaged(request);
        };
        if let Some(border_width) = request.border_width {
            client.border_width = border_width;
        }
        let (floating, geo) = (client.is_floating(), client.geo);

        if request.raise {
            self.raise(window)?;
        }
        if floating {
            let requested = Rect::new(
                request.x.unwrap_or(geo.x),
                request.y.unwrap_or(geo.y),
                request.width.unwrap_or(geo.width),
                request.height.unwrap_or(geo.height),
            );
            self.moveresize(window, requested, true)
        } else {
            self.display.send_configure_notify(window, geo, 0)
        }
    }

    fn on_button_press(&mut self, event: &ButtonEvent) -> Result<()> {
        if let Some(screen) = self.screens.by_bar(event.window) {
            let Some(view) = self.infobar_view(screen) else { return Ok(()) };
            if let Some(tag) = self.renderer.infobar_hit(&view, event.event_x) {
                self.screen_set(screen)?;
                self.tag_set(tag)?;
            }
            return Ok(());
        }

        if event.window == self.display.root() {
            self.screen_set(self.screens.screen_at(event.root_x, event.root_y))?;
            if let Some(command) = self.bindings.mouse(MouseContext::Root, event.button, event.modifiers).cloned() {
                self.execute(&command)?;
            }
            return Ok(());
        }

        let Some((window, kind)) = self.clients.lookup(event.window) else { return Ok(()) };
        self.raise(window)?;
        self.focus(Some(window))?;

        let part = match kind {
            HandleKind::Client => FramePart::ClientArea,
            HandleKind::Titlebar => FramePart::TitleBar,
            HandleKind::Resize(i) => FramePart::ResizeHandle(i),
            HandleKind::Button(i) => FramePart::Button(i),
            HandleKind::Frame => match self.clients.get(window) {
                Some(client) => self.frame_layout(client).hit_test(event.event_x, event.event_y),
                None => FramePart::None,
            },
        };
        debug!("Click {} on {:?} of window {}", event.button, part, window);

        match part {
            FramePart::ClientArea => {
                let command = self
                    .bindings
                    .mouse(MouseContext::Client, event.button, event.modifiers)
                    .cloned();
                // Only the passive grab on the client freezes the pointer; replay unbound clicks.
                if kind == HandleKind::Client {
                    self.display.allow_pointer_events(command.is_none())?;
                }
                if let Some(command) = command {
                    self.execute(&command)?;
                }
            }
            FramePart::ResizeHandle(_) => self.drag(window, DragKind::Resize)?,
            FramePart::Button(i) => {
                if let Some(command) = self.bindings.button(i).cloned() {
                    self.execute(&command)?;
                }
            }
            FramePart::None => {}
            FramePart::TitleBar | FramePart::Border => {
                let command = self
                    .bindings
                    .mouse(MouseContext::Titlebar, event.button, event.modifiers)
                    .cloned();
                if let Some(command) = command {
                    self.execute(&command)?;
                }
            }
        }
        Ok(())
    }

    fn on_enter(&mut self, window: WindowId) -> Result<()> {
        if !self.config.client.focus_follows_pointer {
            return Ok(());
        }
        match self.clients.lookup(window) {
            Some((client, _)) if self.clients.selected() != Some(client) => self.focus(Some(client)),
            _ => Ok(()),
        }
    }

    /// Repaint whatever `window` belongs to.
    pub(crate) fn on_expose(&mut self, window: WindowId) {
        if let Some(screen) = self.screens.by_bar(window) {
            self.draw_infobar(screen);
        } else if let Some((client, _)) = self.clients.lookup(window) {
            self.draw_decoration(client);
        }
    }

    fn on_property(&mut self, window: WindowId, property: PropertyKind) -> Result<()> {
        if property == PropertyKind::StatusText {
            self.status_text = self.display.status_text().unwrap_or_default();
            self.draw_infobars();
            return Ok(());
        }
        if !self.clients.contains(window) {
            return Ok(());
        }

        match property {
            PropertyKind::Title => {
                let title = self.display.title(window);
                if let (Some(client), Some(title)) = (self.clients.get_mut(window), title) {
                    client.title = title;
                }
                self.draw_decoration(window);
            }
            PropertyKind::SizeHints => {
                let hints = self.display.size_hints(window);
                let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
                client.hints = hints;
                let (tiled, screen, geo) = (client.is_tiled(), client.screen, client.geo);
                if tiled {
                    self.arrange(screen)?;
                } else {
                    self.moveresize(window, geo, true)?;
                }
            }
            PropertyKind::WmHints => {
                let urgent = self.display.is_urgent(window) && self.clients.selected() != Some(window);
                let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
                if client.flags.contains(ClientFlags::URGENT) != urgent {
                    client.flags.set(ClientFlags::URGENT, urgent);
                    let screen = client.screen;
                    let state = if urgent { "urgent" } else { "calm" };
                    debug!("Window {} is now {}", window, state);
                    self.draw_decoration(window);
                    self.draw_infobar(screen);
                }
            }
            PropertyKind::TransientFor => {
                let parent = self.display.transient_for(window);
                let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
                client.transient_for = parent;
                if parent.is_some() && client.is_tiled() {
                    client.flags.insert(ClientFlags::FREE_FORCED);
                    self.toggle_floating(window)?;
                }
            }
            PropertyKind::StatusText | PropertyKind::Other => {}
        }
        Ok(())
    }
}
