use std::process::Command as StdCommand;

use anyhow::Result;
use tracing::{debug, info, warn};
use wmfs_rs_config::WmConfig;

use crate::commands::{Bindings, Command};
use crate::core::display::{DisplayServer, DragKind, WmState, ALL_DESKTOPS};
use crate::core::event::WindowId;
use crate::geometry::Rect;
use crate::layout::{self, Slot};
use crate::screen::ScreenRegistry;
use crate::window::client::{Client, ClientFlags};
use crate::window::draw::{DecorationState, InfobarView, Region, Renderer, TagView};
use crate::window::error::{log_warn, ErrorCategory, ErrorTracker, WmError};
use crate::window::events::RunOutcome;
use crate::window::frame::{Decoration, FrameLayout, FrameWindows};
use crate::window::registry::ClientRegistry;

pub struct WindowManager<D: DisplayServer, R: Renderer> {
    pub display: D,
    pub renderer: R,
    pub config: WmConfig,
    pub decoration: Decoration,
    pub bindings: Bindings,
    pub clients: ClientRegistry,
    pub screens: ScreenRegistry,
    pub status_text: String,
    pub error_tracker: ErrorTracker,
    pub(crate) exit: Option<RunOutcome>,
}

impl<D: DisplayServer, R: Renderer> WindowManager<D, R> {
    pub fn new(mut display: D, renderer: R, config: WmConfig) -> Result<Self> {
        let (bindings, errors) = Bindings::from_config(&config);
        for e in &errors {
            warn!("Skipping binding: {}", e);
        }

        let geometries = display.screen_geometries()?;
        if geometries.is_empty() {
            return Err(WmError::NoScreen.into());
        }
        let screens = ScreenRegistry::new(
            &geometries,
            &config.tags,
            config.bar.position,
            config.bar.height as u32,
        );
        let status_text = display.status_text().unwrap_or_else(|| config.bar.status.clone());
        display.grab_keys(&bindings.grabbed_keys())?;
        let tags = &screens.current().tags;
        log_warn(display.set_desktop_count(tags.len() as u32), "publish desktop count");
        log_warn(display.set_current_desktop(tags.selected() as u32), "publish current desktop");

        let mut wm = Self {
            display,
            renderer,
            decoration: Decoration::from_config(&config.client),
            config,
            bindings,
            clients: ClientRegistry::new(),
            screens,
            status_text,
            error_tracker: ErrorTracker::new(),
            exit: None,
        };
        wm.sync_bars()?;
        info!("Window manager ready on {} screen(s)", wm.screens.len());
        Ok(wm)
    }

    // --- queries -------------------------------------------------------

    pub fn tag_count(&self, screen: usize) -> usize {
        self.screens.get(screen).map_or(0, |s| s.tags.len())
    }

    /// On the selected tag of its screen, or sticky.
    pub fn is_visible(&self, client: &Client) -> bool {
        client.is_on(client.screen, self.screens.selected_tag(client.screen))
    }

    /// Predicate for clients currently shown on `screen`.
    fn shown_on(&self, screen: usize) -> impl Fn(&Client) -> bool {
        let tag = self.screens.selected_tag(screen);
        move |c: &Client| c.is_on(screen, tag) && !c.is_hidden()
    }

    fn first_visible(&self, screen: usize) -> Option<WindowId> {
        self.clients.first(self.shown_on(screen))
    }

    pub fn frame_layout(&self, client: &Client) -> FrameLayout {
        self.decoration
            .layout(client.geo, client.padding(&self.decoration), client.decorated)
    }

    fn decoration_state(&self, client: &Client) -> DecorationState {
        if self.clients.selected() == Some(client.window) {
            DecorationState::Focused
        } else if client.flags.contains(ClientFlags::URGENT) {
            DecorationState::Urgent
        } else {
            DecorationState::Normal
        }
    }

    // --- drawing -------------------------------------------------------

    pub fn infobar_view(&self, screen: usize) -> Option<InfobarView> {
        let s = self.screens.get(screen)?;
        let window = s.infobar.window?;
        let geo = s.bar_geometry()?;
        let tags = s
            .tags
            .iter()
            .enumerate()
            .map(|(index, tag)| {
                let members = || self.clients.iter().filter(move |c| c.screen == screen && c.tag == index);
                TagView {
                    name: tag.name.clone(),
                    clients: members().count(),
                    selected: index == s.tags.selected(),
                    urgent: members().any(|c| c.flags.contains(ClientFlags::URGENT)),
                }
            })
            .collect();
        Some(InfobarView {
            screen,
            window,
            geo,
            tags,
            layout: s.tags.current().layout.symbol(),
            status: self.status_text.clone(),
        })
    }

    pub fn draw_infobar(&mut self, screen: usize) {
        if let Some(view) = self.infobar_view(screen) {
            let result = self.renderer.redraw(Region::Infobar(&view));
            self.error_tracker.warn_if_failed(result, "draw infobar", ErrorCategory::Display);
        }
    }

    pub fn draw_infobars(&mut self) {
        for screen in 0..self.screens.len() {
            self.draw_infobar(screen);
        }
    }

    pub fn draw_decoration(&mut self, window: WindowId) {
        let Some(client) = self.clients.get(window) else { return };
        let layout = self.frame_layout(client);
        let state = self.decoration_state(client);
        let result = self.renderer.redraw(Region::Decoration { client, layout: &layout, state });
        self.error_tracker.warn_if_failed(result, "draw decoration", ErrorCategory::Display);
    }

    /// Recolor and repaint after a focus or urgency change.
    fn refresh_decoration(&mut self, window: WindowId) {
        let Some(client) = self.clients.get(window) else { return };
        let state = self.decoration_state(client);
        let result = self.renderer.set_decoration_color(client, state);
        self.error_tracker.warn_if_failed(result, "set decoration color", ErrorCategory::Display);
        self.draw_decoration(window);
    }

    /// Create, move or destroy each screen's bar window to match its position.
    pub fn sync_bars(&mut self) -> Result<()> {
        for index in 0..self.screens.len() {
            let Some(screen) = self.screens.get(index) else { continue };
            let window = match (screen.bar_geometry(), screen.infobar.window) {
                (Some(geo), Some(bar)) => {
                    self.display.move_bar(bar, geo)?;
                    Some(bar)
                }
                (Some(geo), None) => Some(self.display.create_bar(geo)?),
                (None, Some(bar)) => {
                    self.display.destroy_bar(bar)?;
                    None
                }
                (None, None) => None,
            };
            if let Some(screen) = self.screens.get_mut(index) {
                screen.infobar.window = window;
            }
            self.draw_infobar(index);
        }
        Ok(())
    }

    // --- lifecycle -----------------------------------------------------

    /// Take over every window that was already mapped when we started.
    pub fn scan(&mut self) -> Result<()> {
        let windows = self.display.top_level_windows()?;
        info!("Scanning {} windows...", windows.len());
        for window in windows {
            let Some(attrs) = self.display.attributes(window) else { continue };
            if attrs.override_redirect || !attrs.viewable || self.screens.by_bar(window).is_some() {
                continue;
            }
            if let Err(e) = self.manage(window, true) {
                self.error_tracker.record_window_error("scan", e);
            }
        }
        Ok(())
    }

    pub fn manage(&mut self, window: WindowId, autorestart: bool) -> Result<()> {
        if self.clients.contains(window) {
            return Ok(());
        }
        let Some(attrs) = self.display.attributes(window) else {
            debug!("Window {} vanished before it could be managed", window);
            return Ok(());
        };
        if attrs.override_redirect {
            return Ok(());
        }
        let props = self.display.properties(window);

        let sticky = props.desktop == Some(ALL_DESKTOPS);
        let mut screen = self.screens.selected();
        let mut tag = self.screens.selected_tag(screen);
        let mut saved_free = false;
        if let Some(saved) = props.saved_state.filter(|_| autorestart) {
            if (saved.screen as usize) < self.screens.len() {
                screen = saved.screen as usize;
            }
            tag = if (saved.tag as usize) < self.tag_count(screen) {
                saved.tag as usize
            } else {
                self.screens.selected_tag(screen)
            };
            saved_free = saved.free;
        } else if let Some(desktop) = props.desktop.filter(|_| !sticky) {
            if (desktop as usize) < self.tag_count(screen) {
                tag = desktop as usize;
            }
        } else if let Some(parent) = props.transient_for.and_then(|p| self.clients.get(p)) {
            screen = parent.screen;
            tag = parent.tag;
        }

        let hints = props.size_hints;
        let transient = props.transient_for.is_some();
        let fixed = hints.is_fixed();
        let tiled = !(transient || fixed || props.fullscreen || saved_free);

        let mut client = Client::new(window, FrameWindows::bare(0), attrs.geometry);
        client.border_width = attrs.border_width;
        client.screen = screen;
        client.tag = tag;
        client.hints = hints;
        client.decorated = props.decorated;
        client.transient_for = props.transient_for;
        if let Some(title) = props.title {
            client.title = title;
        }
        client.flags.set(ClientFlags::TILED, tiled);
        client.flags.set(ClientFlags::FREE_FORCED, transient || fixed);
        client.flags.set(ClientFlags::STICKY, sticky);
        client.flags.set(ClientFlags::URGENT, props.urgent);
        // Reparenting a mapped window unmaps it once.
        client.pending_unmaps = u32::from(attrs.viewable);

        let (width, height) = hints.constrain(attrs.geometry.width as i32, attrs.geometry.height as i32, true);
        let mut geo = Rect::new(attrs.geometry.x, attrs.geometry.y, width, height);
        if geo.x == 0 && geo.y == 0 {
            if let Some(usable) = self.screens.get(screen).map(|s| s.usable()) {
                let padding = client.padding(&self.decoration);
                geo = geo.grow(padding).centered_in(&usable).shrink(padding);
            }
        }
        client.geo = geo;
        client.free_geo = geo;

        let layout = self.frame_layout(&client);
        client.frame = self.display.create_frame(window, &layout)?;
        let state = client.saved_state();
        self.clients.attach(client);
        info!("Managing window {} on screen {} tag {}", window, screen, tag);

        log_warn(self.display.grab_buttons(window, false, &[]), "grab client buttons");
        log_warn(self.display.store_state(window, &state), "store client state");
        self.display.map(window)?;

        if props.fullscreen {
            self.toggle_fullscreen(window)?;
        } else if tiled {
            self.arrange(screen)?;
        } else {
            self.moveresize(window, geo, true)?;
        }

        let visible = self.clients.get(window).is_some_and(|c| self.is_visible(c));
        if visible {
            self.unhide(window)?;
            self.focus(Some(window))?;
        } else {
            self.hide(window)?;
        }
        self.draw_infobar(screen);
        Ok(())
    }

    /// Forget a client. A window that still exists is handed back to the root.
    pub fn unmanage(&mut self, window: WindowId, destroyed: bool) -> Result<()> {
        let was_selected = self.clients.selected() == Some(window);
        let Some(client) = self.clients.detach(window) else { return Ok(()) };

        let alive = !destroyed && self.display.is_alive(window);
        if alive {
            log_warn(self.display.set_border_width(window, client.border_width), "restore border");
            log_warn(self.display.set_wm_state(window, WmState::Withdrawn), "withdraw window");
        }
        self.display.destroy_frame(&client.frame, window, alive.then_some(client.geo))?;
        info!("Released window {}", window);

        if client.is_tiled() {
            self.arrange(client.screen)?;
        } else {
            self.draw_infobar(client.screen);
        }
        if was_selected {
            let next = self.first_visible(self.screens.selected());
            self.focus(next)?;
        }
        Ok(())
    }

    /// Release every client and bar, leaving windows where they are.
    pub fn shutdown(&mut self) -> Result<()> {
        for window in self.clients.windows() {
            log_warn(self.unmanage(window, false), "release client");
        }
        for screen in self.screens.iter_mut() {
            if let Some(bar) = screen.infobar.window.take() {
                log_warn(self.display.destroy_bar(bar), "destroy bar");
            }
        }
        self.display.set_input_focus(None)?;
        self.display.flush()
    }

    pub fn hide(&mut self, window: WindowId) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
        client.flags.insert(ClientFlags::HIDDEN);
        let frame = client.frame.frame;
        self.display.unmap(frame)?;
        self.display.set_wm_state(window, WmState::Iconic)
    }

    pub fn unhide(&mut self, window: WindowId) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
        client.flags.remove(ClientFlags::HIDDEN);
        let frame = client.frame.frame;
        self.display.map(frame)?;
        self.display.set_wm_state(window, WmState::Normal)
    }

    // --- focus and stacking --------------------------------------------

    /// Select a visible client (or nothing) and move input focus there.
    pub fn focus(&mut self, window: Option<WindowId>) -> Result<()> {
        let target = window.filter(|w| {
            self.clients
                .get(*w)
                .is_some_and(|c| self.is_visible(c) && !c.is_hidden())
        });
        let previous = self.clients.selected();
        self.clients.select(target);

        if let Some(previous) = previous.filter(|p| Some(*p) != target) {
            if self.clients.contains(previous) {
                log_warn(self.display.grab_buttons(previous, false, &[]), "grab client buttons");
                self.refresh_decoration(previous);
            }
        }

        let Some(window) = target else {
            return self.display.set_input_focus(None);
        };
        let screen = match self.clients.get_mut(window) {
            Some(client) => {
                client.flags.remove(ClientFlags::URGENT);
                client.screen
            }
            None => return Ok(()),
        };
        self.screens.select(screen);
        let buttons = self.bindings.client_buttons();
        log_warn(self.display.grab_buttons(window, true, &buttons), "grab client buttons");
        self.display.set_input_focus(Some(window))?;
        self.refresh_decoration(window);
        if previous != target {
            self.draw_infobar(screen);
        }
        Ok(())
    }

    pub fn raise(&mut self, window: WindowId) -> Result<()> {
        match self.clients.get(window) {
            Some(client) => self.display.raise(client.frame.frame),
            None => Ok(()),
        }
    }

    // --- geometry ------------------------------------------------------

    /// The single place geometry is applied to a client.
    ///
    /// Size hints are enforced here: min/max for tiled and floating clients,
    /// increments and aspect only for floating ones since the layout handles
    /// tiled ones. Maximized and fullscreen clients get the rectangle as is.
    pub fn moveresize(&mut self, window: WindowId, geo: Rect, commit: bool) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
        let (width, height) = if client.is_maximized() || client.is_fullscreen() {
            (geo.width.max(1), geo.height.max(1))
        } else {
            client.hints.constrain(
                geo.width.min(i32::MAX as u32) as i32,
                geo.height.min(i32::MAX as u32) as i32,
                client.is_floating(),
            )
        };
        let geo = Rect::new(geo.x, geo.y, width, height);
        client.geo = geo;
        if client.is_floating() {
            client.free_geo = geo;
        }
        if !commit {
            return Ok(());
        }
        if !self.display.is_alive(window) {
            debug!("Skipping configure of stale window {}", window);
            return Ok(());
        }

        let Some(client) = self.clients.get(window) else { return Ok(()) };
        let layout = self.frame_layout(client);
        self.display.configure_frame(&client.frame, window, &layout)?;
        self.display.send_configure_notify(window, geo, 0)?;
        self.draw_decoration(window);
        Ok(())
    }

    /// Recompute the selected tag's layout on `screen`.
    pub fn arrange(&mut self, screen: usize) -> Result<()> {
        let Some(s) = self.screens.get(screen) else { return Ok(()) };
        let tag = s.tags.current();
        let (kind, params, area) = (tag.layout, tag.params, s.usable());

        let windows = self.clients.tiled_on(screen, s.tags.selected());
        let slots: Vec<Slot> = windows
            .iter()
            .filter_map(|w| self.clients.get(*w))
            .map(|c| Slot { hints: c.hints, padding: c.padding(&self.decoration) })
            .collect();
        let rects = layout::arrange(kind, &params, area, &slots);
        debug!("Arranging {} clients on screen {} with {}", windows.len(), screen, kind.name());

        for ((window, slot), outer) in windows.iter().zip(&slots).zip(rects) {
            self.moveresize(*window, outer.shrink(slot.padding), true)?;
        }
        self.draw_infobar(screen);
        Ok(())
    }

    pub fn arrange_all(&mut self) -> Result<()> {
        for screen in 0..self.screens.len() {
            self.arrange(screen)?;
        }
        Ok(())
    }

    // --- mode toggles --------------------------------------------------

    pub fn toggle_floating(&mut self, window: WindowId) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
        if client.is_fullscreen() {
            return Ok(());
        }
        client.flags.toggle(ClientFlags::TILED);
        client.flags.remove(ClientFlags::MAXIMIZED);
        client.max_geo = None;
        let (screen, floating, restore, state) =
            (client.screen, !client.is_tiled(), client.free_geo, client.saved_state());

        if floating {
            self.moveresize(window, restore, true)?;
            self.raise(window)?;
        }
        log_warn(self.display.store_state(window, &state), "store client state");
        self.arrange(screen)
    }

    pub fn toggle_maximize(&mut self, window: WindowId) -> Result<()> {
        let padding = match self.clients.get(window) {
            Some(client) if !client.is_fullscreen() => client.padding(&self.decoration),
            _ => return Ok(()),
        };
        let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
        let screen = client.screen;

        if client.is_maximized() {
            client.flags.remove(ClientFlags::MAXIMIZED);
            let restore = client.max_geo.take().unwrap_or(client.free_geo);
            self.moveresize(window, restore, true)?;
        } else {
            client.max_geo = Some(client.geo);
            client.flags.insert(ClientFlags::MAXIMIZED);
            let Some(usable) = self.screens.get(screen).map(|s| s.usable()) else { return Ok(()) };
            self.moveresize(window, usable.shrink(padding), true)?;
            self.raise(window)?;
        }
        self.arrange(screen)
    }

    pub fn toggle_fullscreen(&mut self, window: WindowId) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
        let screen = client.screen;

        if client.is_fullscreen() {
            client.flags.remove(ClientFlags::FULLSCREEN);
            client.flags.set(ClientFlags::TILED, client.fullscreen_was_tiled);
            let restore = client.fullscreen_geo.take().unwrap_or(client.free_geo);
            self.moveresize(window, restore, true)?;
        } else {
            client.fullscreen_geo = Some(client.geo);
            client.fullscreen_was_tiled = client.is_tiled();
            client.flags.remove(ClientFlags::TILED);
            client.flags.insert(ClientFlags::FULLSCREEN);
            let Some(full) = self.screens.get(screen).map(|s| s.geo) else { return Ok(()) };
            self.moveresize(window, full, true)?;
            self.raise(window)?;
        }
        self.arrange(screen)
    }

    pub fn toggle_sticky(&mut self, window: WindowId) -> Result<()> {
        let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
        client.flags.toggle(ClientFlags::STICKY);
        let screen = client.screen;
        let visible = self.clients.get(window).is_some_and(|c| self.is_visible(c));
        if visible {
            self.unhide(window)?;
        } else {
            self.hide(window)?;
            if self.clients.selected() == Some(window) {
                let next = self.first_visible(screen);
                self.focus(next)?;
            }
        }
        self.arrange(screen)
    }

    // --- tags and screens ----------------------------------------------

    /// Move a client to another tag of its screen.
    pub fn set_tag(&mut self, window: WindowId, tag: usize) -> Result<()> {
        let Some(screen) = self.clients.get(window).map(|c| c.screen) else { return Ok(()) };
        if tag >= self.tag_count(screen) {
            return Ok(());
        }
        let Some(client) = self.clients.get_mut(window) else { return Ok(()) };
        if client.tag == tag {
            return Ok(());
        }
        client.tag = tag;
        let state = client.saved_state();
        log_warn(self.display.store_state(window, &state), "store client state");

        let visible = self.clients.get(window).is_some_and(|c| self.is_visible(c));
        if visible {
            self.unhide(window)?;
        } else {
            self.hide(window)?;
            if self.clients.selected() == Some(window) {
                let next = self.first_visible(screen);
                self.focus(next)?;
            }
        }
        self.arrange(screen)
    }

    /// Switch the selected screen to `tag`.
    pub fn tag_set(&mut self, tag: usize) -> Result<()> {
        let screen = self.screens.selected();
        let Some(s) = self.screens.get_mut(screen) else { return Ok(()) };
        let old = s.tags.selected();
        if tag == old || !s.tags.select(tag) {
            return Ok(());
        }
        debug!("Screen {}: tag {} -> {}", screen, old, tag);

        for window in self.clients.windows() {
            let Some(client) = self.clients.get(window) else { continue };
            if client.screen != screen || client.is_sticky() {
                continue;
            }
            if client.tag == old {
                self.hide(window)?;
            } else if client.tag == tag {
                self.unhide(window)?;
            }
        }
        log_warn(self.display.set_current_desktop(tag as u32), "publish current desktop");
        self.arrange(screen)?;

        let keep = self
            .clients
            .selected_client()
            .filter(|c| c.screen == screen && self.is_visible(c))
            .map(|c| c.window);
        let next = keep.or_else(|| self.first_visible(screen));
        self.focus(next)
    }

    pub fn screen_set(&mut self, screen: usize) -> Result<()> {
        if screen == self.screens.selected() || !self.screens.select(screen) {
            return Ok(());
        }
        let tag = self.screens.selected_tag(screen);
        log_warn(self.display.set_current_desktop(tag as u32), "publish current desktop");
        let next = self.first_visible(screen);
        self.focus(next)?;
        // focus(None) leaves the selection where it was.
        self.screens.select(screen);
        self.draw_infobars();
        Ok(())
    }

    /// Rediscover the physical screens after a topology change.
    pub fn handle_screen_change(&mut self) -> Result<()> {
        let geometries = self.display.screen_geometries()?;
        let rebuild = self.screens.rebuild(&geometries);
        info!("Screen layout changed: {} screen(s), {} new", self.screens.len(), rebuild.added.len());
        for bar in rebuild.orphaned_bars {
            log_warn(self.display.destroy_bar(bar), "destroy orphaned bar");
        }

        let count = self.screens.len();
        let fallback_tags = self.tag_count(0);
        let fallback_tag = self.screens.selected_tag(0);
        for client in self.clients.iter_mut() {
            if client.screen >= count {
                client.screen = 0;
                if client.tag >= fallback_tags {
                    client.tag = fallback_tag;
                }
            }
        }

        for window in self.clients.windows() {
            let Some(client) = self.clients.get(window) else { continue };
            let Some(usable) = self.screens.get(client.screen).map(|s| s.usable()) else { continue };
            let visible = self.is_visible(client);
            if client.is_floating() {
                let padding = client.padding(&self.decoration);
                let geo = client.geo.grow(padding).clamped_into(&usable).shrink(padding);
                self.moveresize(window, geo, true)?;
            }
            if visible {
                self.unhide(window)?;
            } else {
                self.hide(window)?;
            }
        }

        self.sync_bars()?;
        self.arrange_all()?;
        let next = self
            .clients
            .selected()
            .or_else(|| self.first_visible(self.screens.selected()));
        self.focus(next)
    }

    // --- commands ------------------------------------------------------

    /// Run a bound command against the current selection.
    pub fn execute(&mut self, command: &Command) -> Result<()> {
        debug!("Executing {:?}", command);
        let selected = self.clients.selected();
        let screen = self.screens.selected();

        match command {
            Command::Spawn(cmd) => match StdCommand::new("sh").arg("-c").arg(cmd).spawn() {
                Ok(_) => debug!("Spawned: {}", cmd),
                Err(e) => warn!("Failed to spawn '{}': {}", cmd, e),
            },
            Command::Quit => self.exit = Some(RunOutcome::Quit),
            Command::Reload => self.exit = Some(RunOutcome::Reload),
            Command::ClientKill => {
                if let Some(window) = selected {
                    self.display.close_window(window)?;
                }
            }
            // Registry order is newest first; "next" follows the layout, oldest first.
            Command::ClientNext | Command::ClientPrev => {
                let shown = self.shown_on(screen);
                let target = match (selected, command) {
                    (Some(from), Command::ClientNext) => self.clients.prev_matching(from, shown),
                    (Some(from), _) => self.clients.next_matching(from, shown),
                    (None, _) => self.clients.first(shown),
                };
                if let Some(window) = target {
                    self.focus(Some(window))?;
                    self.raise(window)?;
                }
            }
            Command::ClientRaise => {
                if let Some(window) = selected {
                    self.raise(window)?;
                }
            }
            Command::ClientSwapNext | Command::ClientSwapPrev => {
                let Some(from) = selected.filter(|w| self.clients.get(*w).is_some_and(|c| c.is_tiled())) else {
                    return Ok(());
                };
                let tag = self.screens.selected_tag(screen);
                let tiled = move |c: &Client| c.is_tiled_on(screen, tag);
                let target = if *command == Command::ClientSwapNext {
                    self.clients.prev_matching(from, tiled)
                } else {
                    self.clients.next_matching(from, tiled)
                };
                if let Some(target) = target {
                    self.clients.swap(from, target);
                    self.arrange(screen)?;
                }
            }
            Command::TileSwitch => {
                let Some(from) = selected else { return Ok(()) };
                let tiled = self.clients.tiled_on(screen, self.screens.selected_tag(screen));
                let target = match tiled.first() {
                    Some(master) if *master == from => tiled.get(1).copied(),
                    Some(master) if tiled.contains(&from) => Some(*master),
                    _ => None,
                };
                if let Some(target) = target {
                    self.clients.swap(from, target);
                    self.arrange(screen)?;
                }
            }
            Command::ToggleFree => {
                if let Some(window) = selected {
                    self.toggle_floating(window)?;
                }
            }
            Command::ToggleMax => {
                if let Some(window) = selected {
                    self.toggle_maximize(window)?;
                }
            }
            Command::ToggleFullscreen => {
                if let Some(window) = selected {
                    self.toggle_fullscreen(window)?;
                }
            }
            Command::ToggleSticky => {
                if let Some(window) = selected {
                    self.toggle_sticky(window)?;
                }
            }
            Command::Tag(tag) => self.tag_set(*tag)?,
            Command::TagNext => {
                let next = self.screens.current().tags.next_index();
                self.tag_set(next)?;
            }
            Command::TagPrev => {
                let prev = self.screens.current().tags.prev_index();
                self.tag_set(prev)?;
            }
            Command::TagTransfert(tag) => {
                if let Some(window) = selected {
                    self.set_tag(window, *tag)?;
                }
            }
            Command::ScreenSelect(index) => self.screen_set(*index)?,
            Command::ScreenNext => self.screen_set(self.screens.next_index())?,
            Command::ScreenPrev => self.screen_set(self.screens.prev_index())?,
            Command::LayoutNext | Command::LayoutPrev | Command::SetLayout(_) => {
                let Some(s) = self.screens.get_mut(screen) else { return Ok(()) };
                let tag = s.tags.current_mut();
                tag.layout = match command {
                    Command::LayoutNext => tag.layout.next(),
                    Command::LayoutPrev => tag.layout.prev(),
                    Command::SetLayout(layout) => *layout,
                    _ => tag.layout,
                };
                info!("Tag {} layout: {}", tag.name, tag.layout.name());
                self.arrange(screen)?;
            }
            Command::SetMwfact(delta) => {
                let Some(s) = self.screens.get_mut(screen) else { return Ok(()) };
                let tag = s.tags.current_mut();
                tag.params = tag.params.with_mwfact(tag.params.mwfact + delta);
                self.arrange(screen)?;
            }
            Command::SetNmaster(delta) => {
                let Some(s) = self.screens.get_mut(screen) else { return Ok(()) };
                let tag = s.tags.current_mut();
                tag.params.nmaster = (tag.params.nmaster as i64 + *delta as i64).max(0) as usize;
                self.arrange(screen)?;
            }
            Command::ToggleResizehint => {
                let Some(s) = self.screens.get_mut(screen) else { return Ok(()) };
                let tag = s.tags.current_mut();
                tag.params.resizehint = !tag.params.resizehint;
                self.arrange(screen)?;
            }
            Command::ToggleMirror => {
                let Some(s) = self.screens.get_mut(screen) else { return Ok(()) };
                let tag = s.tags.current_mut();
                tag.params.mirror = !tag.params.mirror;
                self.arrange(screen)?;
            }
            Command::InfobarTogglepos => {
                let Some(s) = self.screens.get_mut(screen) else { return Ok(()) };
                s.infobar.toggle_position();
                self.sync_bars()?;
                self.arrange(screen)?;
            }
            Command::MouseMove | Command::MouseResize => {
                let kind = if *command == Command::MouseMove { DragKind::Move } else { DragKind::Resize };
                if let Some(window) = selected {
                    self.drag(window, kind)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::display::WindowProperties;
    use crate::core::mock::{test_config, Drawn, MockDisplay, RecordingRenderer, Request};
    use crate::layout::Layout;
    use crate::window::client::{SavedState, SizeHints};
    use wmfs_rs_config::BarPosition;

    const A: WindowId = 10;
    const B: WindowId = 11;
    const C: WindowId = 12;

    fn manager() -> WindowManager<MockDisplay, RecordingRenderer> {
        let display = MockDisplay::new(vec![Rect::new(0, 0, 1000, 800)]);
        WindowManager::new(display, RecordingRenderer::default(), test_config()).unwrap()
    }

    fn manage_all(wm: &mut WindowManager<MockDisplay, RecordingRenderer>, windows: &[WindowId]) {
        for w in windows {
            wm.display.add_window(*w, Rect::new(0, 0, 200, 100));
            wm.manage(*w, false).unwrap();
        }
    }

    fn geo(wm: &WindowManager<MockDisplay, RecordingRenderer>, window: WindowId) -> Rect {
        wm.clients.get(window).unwrap().geo
    }

    #[test]
    fn test_manage_then_tile() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B, C]);

        assert_eq!(geo(&wm, A), Rect::new(0, 0, 600, 800));
        assert_eq!(geo(&wm, B), Rect::new(600, 0, 400, 400));
        assert_eq!(geo(&wm, C), Rect::new(600, 400, 400, 400));
        assert_eq!(wm.clients.selected(), Some(C));
        assert!(wm.display.has(&Request::Focus(Some(C))));
    }

    #[test]
    fn test_unmanage_recompute() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B, C]);
        wm.display.destroy(B);
        wm.unmanage(B, true).unwrap();

        assert_eq!(geo(&wm, A), Rect::new(0, 0, 600, 800));
        assert_eq!(geo(&wm, C), Rect::new(600, 0, 400, 800));
        assert!(wm.display.has(&Request::DestroyFrame { window: B, restored: false }));
        assert!(wm.clients.get(B).is_none());
    }

    #[test]
    fn test_unmanage_living_window_is_restored() {
        let mut wm = manager();
        manage_all(&mut wm, &[A]);
        wm.unmanage(A, false).unwrap();
        assert!(wm.display.has(&Request::DestroyFrame { window: A, restored: true }));
        assert!(wm.display.has(&Request::SetWmState(A, WmState::Withdrawn)));
        assert_eq!(wm.clients.selected(), None);
    }

    #[test]
    fn test_unmanage_selected_refocuses_visible_client() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B]);
        assert_eq!(wm.clients.selected(), Some(B));
        wm.unmanage(B, false).unwrap();
        assert_eq!(wm.clients.selected(), Some(A));
    }

    #[test]
    fn test_fullscreen_round_trip() {
        let mut wm = manager();
        let mut props = WindowProperties { decorated: true, ..WindowProperties::default() };
        props.transient_for = Some(99);
        wm.display.add_window_with(A, Rect::new(50, 50, 300, 200), props);
        wm.manage(A, false).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(50, 50, 300, 200));

        wm.toggle_fullscreen(A).unwrap();
        let client = wm.clients.get(A).unwrap();
        assert_eq!(client.geo, Rect::new(0, 0, 1000, 800));
        assert!(client.is_fullscreen() && !client.is_tiled());

        wm.toggle_fullscreen(A).unwrap();
        let client = wm.clients.get(A).unwrap();
        assert_eq!(client.geo, Rect::new(50, 50, 300, 200));
        assert!(!client.is_fullscreen());
    }

    #[test]
    fn test_fixed_size_client_still_fills_screen() {
        let mut wm = manager();
        let hints = SizeHints { min: Some((300, 200)), max: Some((300, 200)), ..Default::default() };
        let props = WindowProperties { size_hints: hints, ..Default::default() };
        wm.display.add_window_with(A, Rect::new(50, 50, 300, 200), props);
        wm.manage(A, false).unwrap();

        wm.toggle_fullscreen(A).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 800));
        wm.toggle_fullscreen(A).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(50, 50, 300, 200));

        wm.toggle_maximize(A).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 800));
        wm.toggle_maximize(A).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(50, 50, 300, 200));
    }

    #[test]
    fn test_fullscreen_survives_tag_switch() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B]);
        wm.toggle_fullscreen(A).unwrap();

        wm.tag_set(1).unwrap();
        assert!(wm.clients.get(A).unwrap().is_hidden());
        wm.tag_set(0).unwrap();

        let client = wm.clients.get(A).unwrap();
        assert!(client.is_fullscreen() && !client.is_tiled() && !client.is_hidden());
        assert_eq!(client.geo, Rect::new(0, 0, 1000, 800));
        assert_eq!(geo(&wm, B), Rect::new(0, 0, 1000, 800));
    }

    #[test]
    fn test_fullscreen_tiled_client_leaves_and_rejoins_layout() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B]);
        wm.toggle_fullscreen(A).unwrap();
        assert!(!wm.clients.get(A).unwrap().is_tiled());
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 800));
        // B is alone in the layout
        assert_eq!(geo(&wm, B), Rect::new(0, 0, 1000, 800));

        wm.toggle_fullscreen(A).unwrap();
        assert!(wm.clients.get(A).unwrap().is_tiled());
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 600, 800));
        assert_eq!(geo(&wm, B), Rect::new(600, 0, 400, 800));
    }

    #[test]
    fn test_maximize_restores_floating_geometry() {
        let mut wm = manager();
        manage_all(&mut wm, &[A]);
        wm.toggle_floating(A).unwrap();
        wm.moveresize(A, Rect::new(30, 40, 200, 100), true).unwrap();

        wm.toggle_maximize(A).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 800));
        wm.toggle_maximize(A).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(30, 40, 200, 100));
    }

    #[test]
    fn test_toggle_floating_restores_free_geometry() {
        let mut wm = manager();
        wm.display.add_window(A, Rect::new(120, 80, 200, 100));
        wm.manage(A, false).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 800));

        wm.toggle_floating(A).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(120, 80, 200, 100));
        assert!(wm.display.has(&Request::StoreState(A, SavedState { screen: 0, tag: 0, free: true })));
    }

    #[test]
    fn test_floating_at_origin_is_centered() {
        let mut wm = manager();
        let hints = SizeHints { min: Some((200, 100)), max: Some((200, 100)), ..Default::default() };
        let props = WindowProperties { size_hints: hints, decorated: true, ..Default::default() };
        wm.display.add_window_with(A, Rect::new(0, 0, 50, 50), props);
        wm.manage(A, false).unwrap();

        let client = wm.clients.get(A).unwrap();
        assert!(!client.is_tiled());
        assert!(client.flags.contains(ClientFlags::FREE_FORCED));
        assert_eq!(client.geo, Rect::new(400, 350, 200, 100));
    }

    #[test]
    fn test_moveresize_clamps_and_skips_stale_windows() {
        let mut wm = manager();
        manage_all(&mut wm, &[A]);
        wm.toggle_floating(A).unwrap();
        wm.display.destroy(A);
        wm.display.clear_requests();

        wm.moveresize(A, Rect::new(5, 5, 0, 0), true).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(5, 5, 1, 1));
        assert!(wm.display.requests.is_empty());
    }

    #[test]
    fn test_increments_apply_only_to_floating_clients() {
        let mut wm = manager();
        let hints = SizeHints { base: Some((0, 0)), increment: Some((10, 10)), ..Default::default() };
        let props = WindowProperties { size_hints: hints, decorated: true, ..Default::default() };
        wm.display.add_window_with(A, Rect::new(10, 10, 100, 100), props);
        wm.manage(A, false).unwrap();
        wm.display.add_window(B, Rect::new(0, 0, 100, 100));
        wm.manage(B, false).unwrap();
        // tiled: the layout gave 600x800 regardless of increments
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 600, 800));

        wm.toggle_floating(A).unwrap();
        wm.moveresize(A, Rect::new(0, 0, 155, 97), true).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 150, 90));
    }

    #[test]
    fn test_tag_switch_hides_and_shows() {
        let mut wm = manager();
        manage_all(&mut wm, &[A]);
        wm.tag_set(1).unwrap();
        assert!(wm.clients.get(A).unwrap().is_hidden());
        assert_eq!(wm.clients.selected(), None);
        assert!(wm.display.has(&Request::CurrentDesktop(1)));

        manage_all(&mut wm, &[B]);
        assert_eq!(wm.clients.get(B).unwrap().tag, 1);
        assert_eq!(geo(&wm, B), Rect::new(0, 0, 1000, 800));

        wm.tag_set(0).unwrap();
        assert!(!wm.clients.get(A).unwrap().is_hidden());
        assert!(wm.clients.get(B).unwrap().is_hidden());
        assert_eq!(wm.clients.selected(), Some(A));
    }

    #[test]
    fn test_set_tag_moves_client_out_of_view() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B]);
        wm.set_tag(B, 2).unwrap();

        let b = wm.clients.get(B).unwrap();
        assert_eq!(b.tag, 2);
        assert!(b.is_hidden());
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 800));
        assert_eq!(wm.clients.selected(), Some(A));
        assert!(wm.display.has(&Request::StoreState(B, SavedState { screen: 0, tag: 2, free: false })));
    }

    #[test]
    fn test_sticky_request_keeps_selected_tag() {
        let mut wm = manager();
        wm.tag_set(1).unwrap();
        let props = WindowProperties { desktop: Some(ALL_DESKTOPS), decorated: true, ..Default::default() };
        wm.display.add_window_with(A, Rect::new(0, 0, 100, 100), props);
        wm.manage(A, false).unwrap();

        let client = wm.clients.get(A).unwrap();
        assert!(client.is_sticky());
        assert_eq!(client.tag, 1);
        wm.tag_set(2).unwrap();
        assert!(!wm.clients.get(A).unwrap().is_hidden());
    }

    #[test]
    fn test_desktop_request_and_saved_state() {
        let mut wm = manager();
        let props = WindowProperties { desktop: Some(2), decorated: true, ..Default::default() };
        wm.display.add_window_with(A, Rect::new(0, 0, 100, 100), props);
        wm.manage(A, false).unwrap();
        assert_eq!(wm.clients.get(A).unwrap().tag, 2);
        assert!(wm.clients.get(A).unwrap().is_hidden());

        let saved = SavedState { screen: 0, tag: 1, free: true };
        let props = WindowProperties {
            desktop: Some(2),
            saved_state: Some(saved),
            decorated: true,
            ..Default::default()
        };
        wm.display.add_window_with(B, Rect::new(10, 10, 100, 100), props);
        wm.manage(B, true).unwrap();
        let b = wm.clients.get(B).unwrap();
        assert_eq!(b.tag, 1);
        assert!(!b.is_tiled());
    }

    #[test]
    fn test_override_redirect_and_duplicates_are_ignored() {
        let mut wm = manager();
        wm.display.add_window(A, Rect::new(0, 0, 10, 10));
        if let Some(w) = wm.display.windows.get_mut(&A) {
            w.attributes.override_redirect = true;
        }
        wm.manage(A, false).unwrap();
        assert!(wm.clients.is_empty());

        manage_all(&mut wm, &[B]);
        wm.manage(B, false).unwrap();
        assert_eq!(wm.clients.len(), 1);
        wm.manage(404, false).unwrap();
        assert_eq!(wm.clients.len(), 1);
    }

    #[test]
    fn test_fullscreen_and_tiled_never_both_set() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B]);
        for _ in 0..3 {
            wm.toggle_fullscreen(A).unwrap();
            wm.toggle_floating(A).unwrap();
            wm.toggle_maximize(A).unwrap();
            for client in wm.clients.iter() {
                assert!(!(client.is_fullscreen() && client.is_tiled()));
            }
        }
    }

    #[test]
    fn test_focus_refuses_hidden_client() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B]);
        wm.set_tag(A, 1).unwrap();
        wm.focus(Some(A)).unwrap();
        assert_eq!(wm.clients.selected(), None);
        assert!(wm.display.has(&Request::Focus(None)));
    }

    #[test]
    fn test_focus_recolors_old_and_new() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B]);
        wm.renderer.colors.clear();
        wm.focus(Some(A)).unwrap();
        assert_eq!(
            wm.renderer.colors,
            vec![(B, DecorationState::Normal), (A, DecorationState::Focused)]
        );
        assert!(wm.display.has(&Request::GrabButtons { window: A, focused: true }));
        assert!(wm.display.has(&Request::GrabButtons { window: B, focused: false }));
    }

    #[test]
    fn test_swap_and_tile_switch() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B, C]);
        wm.focus(Some(C)).unwrap();
        wm.execute(&Command::TileSwitch).unwrap();
        assert_eq!(geo(&wm, C), Rect::new(0, 0, 600, 800));
        assert_eq!(geo(&wm, A), Rect::new(600, 400, 400, 400));

        wm.execute(&Command::ClientSwapNext).unwrap();
        assert_eq!(geo(&wm, C), Rect::new(600, 0, 400, 400));
        assert_eq!(geo(&wm, B), Rect::new(0, 0, 600, 800));
    }

    #[test]
    fn test_client_next_follows_layout_order() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B, C]);
        wm.focus(Some(A)).unwrap();
        wm.execute(&Command::ClientNext).unwrap();
        assert_eq!(wm.clients.selected(), Some(B));
        wm.execute(&Command::ClientPrev).unwrap();
        wm.execute(&Command::ClientPrev).unwrap();
        assert_eq!(wm.clients.selected(), Some(C));
    }

    #[test]
    fn test_layout_and_parameter_commands() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B]);

        wm.execute(&Command::SetMwfact(0.2)).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 800, 800));
        wm.execute(&Command::SetMwfact(5.0)).unwrap();
        assert_eq!(wm.screens.current().tags.current().params.mwfact, crate::layout::MWFACT_MAX);

        wm.execute(&Command::SetNmaster(-3)).unwrap();
        assert_eq!(wm.screens.current().tags.current().params.nmaster, 0);

        wm.execute(&Command::SetLayout(Layout::Max)).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 800));
        assert_eq!(geo(&wm, B), Rect::new(0, 0, 1000, 800));
        wm.execute(&Command::LayoutNext).unwrap();
        assert_eq!(wm.screens.current().tags.current().layout, Layout::Free);
    }

    #[test]
    fn test_each_instance_publishes_desktops() {
        let mut config = test_config();
        config.tags.truncate(2);
        let display = MockDisplay::new(vec![Rect::new(0, 0, 1000, 800)]);
        let wm = WindowManager::new(display, RecordingRenderer::default(), config).unwrap();
        assert!(wm.display.has(&Request::DesktopCount(2)));
        assert!(wm.display.has(&Request::CurrentDesktop(0)));

        let wm = WindowManager::new(wm.display, RecordingRenderer::default(), test_config()).unwrap();
        assert!(wm.display.has(&Request::DesktopCount(3)));
    }

    #[test]
    fn test_quit_and_reload_set_exit() {
        let mut wm = manager();
        wm.execute(&Command::Reload).unwrap();
        assert_eq!(wm.exit, Some(RunOutcome::Reload));
        wm.execute(&Command::Quit).unwrap();
        assert_eq!(wm.exit, Some(RunOutcome::Quit));
    }

    #[test]
    fn test_infobar_shrinks_usable_area_and_counts_clients() {
        let mut config = test_config();
        config.bar.position = BarPosition::Top;
        config.bar.height = 20;
        let display = MockDisplay::new(vec![Rect::new(0, 0, 1000, 800)]);
        let mut wm = WindowManager::new(display, RecordingRenderer::default(), config).unwrap();
        manage_all(&mut wm, &[A]);

        assert_eq!(geo(&wm, A), Rect::new(0, 20, 1000, 780));
        assert_eq!(
            wm.renderer.last_infobar(0),
            Some(&Drawn::Infobar {
                screen: 0,
                tags: vec!["one:1".into(), "two".into(), "three".into()],
                layout: "[]=",
                status: "wmfs-rs".into(),
            })
        );

        wm.execute(&Command::InfobarTogglepos).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 780));
        wm.execute(&Command::InfobarTogglepos).unwrap();
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 800));
        assert!(wm.screens.current().infobar.window.is_none());
    }

    #[test]
    fn test_screen_loss_moves_clients_to_first_screen() {
        let display = MockDisplay::new(vec![Rect::new(0, 0, 1000, 800), Rect::new(1000, 0, 800, 600)]);
        let mut wm = WindowManager::new(display, RecordingRenderer::default(), test_config()).unwrap();
        wm.screen_set(1).unwrap();
        manage_all(&mut wm, &[A]);
        assert_eq!(wm.clients.get(A).unwrap().screen, 1);
        assert_eq!(geo(&wm, A), Rect::new(1000, 0, 800, 600));

        wm.display.screens.truncate(1);
        wm.handle_screen_change().unwrap();
        assert_eq!(wm.screens.len(), 1);
        assert_eq!(wm.clients.get(A).unwrap().screen, 0);
        assert_eq!(geo(&wm, A), Rect::new(0, 0, 1000, 800));
    }

    #[test]
    fn test_scan_adopts_viewable_windows_with_saved_state() {
        let mut wm = manager();
        let saved = SavedState { screen: 0, tag: 2, free: false };
        let props = WindowProperties { saved_state: Some(saved), decorated: true, ..Default::default() };
        wm.display.add_window_with(A, Rect::new(0, 0, 100, 100), props);
        wm.display.add_window(B, Rect::new(0, 0, 100, 100));
        for w in [A, B] {
            if let Some(win) = wm.display.windows.get_mut(&w) {
                win.attributes.viewable = true;
            }
        }
        wm.display.add_window(C, Rect::new(0, 0, 100, 100));

        wm.scan().unwrap();
        assert_eq!(wm.clients.len(), 2);
        assert_eq!(wm.clients.get(A).unwrap().tag, 2);
        assert_eq!(wm.clients.get(B).unwrap().pending_unmaps, 1);
        assert!(!wm.clients.contains(C));
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut wm = manager();
        manage_all(&mut wm, &[A, B]);
        wm.shutdown().unwrap();
        assert!(wm.clients.is_empty());
        assert!(wm.display.has(&Request::DestroyFrame { window: A, restored: true }));
        assert!(wm.display.has(&Request::DestroyFrame { window: B, restored: true }));
    }
}
