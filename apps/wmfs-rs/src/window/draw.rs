use std::rc::Rc;

use anyhow::Result;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ChangeGCAux, ChangeWindowAttributesAux, ConnectionExt, CreateGCAux, Font, Gcontext, Rectangle, Window,
};
use wmfs_rs_config::{parse_color, WmConfig};

use crate::core::context::Context;
use crate::core::event::WindowId;
use crate::geometry::Rect;
use crate::window::client::Client;
use crate::window::frame::FrameLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationState {
    Normal,
    Focused,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagView {
    pub name: String,
    pub clients: usize,
    pub selected: bool,
    pub urgent: bool,
}

impl TagView {
    pub fn label(&self) -> String {
        if self.clients == 0 {
            self.name.clone()
        } else {
            format!("{}:{}", self.name, self.clients)
        }
    }
}

/// Snapshot of one screen's infobar contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfobarView {
    pub screen: usize,
    pub window: WindowId,
    /// Bar size; x/y are root coordinates
    pub geo: Rect,
    pub tags: Vec<TagView>,
    pub layout: &'static str,
    pub status: String,
}

impl InfobarView {
    /// Bar-relative `(x, width)` of each tag cell for a fixed-width font.
    pub fn tag_cells(&self, char_width: u32) -> Vec<(i32, u32)> {
        let mut x = 0;
        self.tags
            .iter()
            .map(|tag| {
                let width = (tag.label().chars().count() as u32 + 2) * char_width;
                let cell = (x, width);
                x += width as i32;
                cell
            })
            .collect()
    }

    /// Tag under bar-relative `x`.
    pub fn hit(&self, x: i32, char_width: u32) -> Option<usize> {
        self.tag_cells(char_width)
            .iter()
            .position(|(start, width)| x >= *start && x < *start + *width as i32)
    }
}

/// What to repaint.
#[derive(Debug, Clone, Copy)]
pub enum Region<'a> {
    Decoration { client: &'a Client, layout: &'a FrameLayout, state: DecorationState },
    Infobar(&'a InfobarView),
}

/// Pixel output for decorations and infobars.
pub trait Renderer {
    fn redraw(&mut self, region: Region<'_>) -> Result<()>;
    fn set_decoration_color(&mut self, client: &Client, state: DecorationState) -> Result<()>;
    /// Tag under a click at bar-relative `x`.
    fn infobar_hit(&self, bar: &InfobarView, x: i32) -> Option<usize>;
}

struct Palette {
    normal: u32,
    focus: u32,
    urgent: u32,
    title: u32,
    bar_bg: u32,
    bar_fg: u32,
    selected_bg: u32,
    selected_fg: u32,
    buttons: Vec<u32>,
}

impl Palette {
    fn from_config(config: &WmConfig) -> Result<Self> {
        Ok(Self {
            normal: parse_color(&config.client.normal_color)?,
            focus: parse_color(&config.client.focus_color)?,
            urgent: parse_color(&config.client.urgent_color)?,
            title: parse_color(&config.client.title_color)?,
            bar_bg: parse_color(&config.bar.background)?,
            bar_fg: parse_color(&config.bar.foreground)?,
            selected_bg: parse_color(&config.bar.selected_background)?,
            selected_fg: parse_color(&config.bar.selected_foreground)?,
            buttons: config
                .client
                .buttons
                .iter()
                .map(|b| parse_color(&b.color))
                .collect::<Result<_, _>>()?,
        })
    }

    fn decoration(&self, state: DecorationState) -> u32 {
        match state {
            DecorationState::Normal => self.normal,
            DecorationState::Focused => self.focus,
            DecorationState::Urgent => self.urgent,
        }
    }
}

/// Core-protocol renderer using one GC and the server's `fixed` font.
pub struct X11Renderer {
    ctx: Rc<Context>,
    gc: Gcontext,
    font: Font,
    char_width: u32,
    ascent: i16,
    palette: Palette,
}

impl X11Renderer {
    pub fn new(ctx: Rc<Context>, config: &WmConfig) -> Result<Self> {
        let palette = Palette::from_config(config)?;

        let font = ctx.conn.generate_id()?;
        ctx.conn.open_font(font, b"fixed")?;
        let info = ctx.conn.query_font(font)?.reply()?;
        let char_width = (info.max_bounds.character_width.max(1)) as u32;
        let ascent = info.font_ascent;

        let gc = ctx.conn.generate_id()?;
        ctx.conn.create_gc(
            gc,
            ctx.root_window,
            &CreateGCAux::new().font(font).foreground(palette.bar_fg).background(palette.bar_bg),
        )?;

        Ok(Self { ctx, gc, font, char_width, ascent, palette })
    }

    fn fill(&self, window: Window, color: u32, rect: Rect) -> Result<()> {
        self.ctx.conn.change_gc(self.gc, &ChangeGCAux::new().foreground(color))?;
        let rect = Rectangle {
            x: rect.x as i16,
            y: rect.y as i16,
            width: rect.width.min(u16::MAX as u32) as u16,
            height: rect.height.min(u16::MAX as u32) as u16,
        };
        self.ctx.conn.poly_fill_rectangle(window, self.gc, &[rect])?;
        Ok(())
    }

    /// Draw `text` on a `background` strip of height `height`.
    fn text(&self, window: Window, x: i32, height: u32, text: &str, fg: u32, bg: u32) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.ctx.conn.change_gc(self.gc, &ChangeGCAux::new().foreground(fg).background(bg))?;
        let y = ((height as i32 - self.ascent as i32) / 2 + self.ascent as i32).max(self.ascent as i32);
        // image_text8 takes at most 255 bytes
        let bytes: Vec<u8> = text.bytes().take(255).collect();
        self.ctx.conn.image_text8(window, self.gc, x as i16, y as i16, &bytes)?;
        Ok(())
    }

    fn draw_decoration(&self, client: &Client, layout: &FrameLayout, state: DecorationState) -> Result<()> {
        let color = self.palette.decoration(state);
        if let (Some(window), Some(rect)) = (client.frame.titlebar, layout.titlebar) {
            let local = Rect::new(0, 0, rect.width, rect.height);
            self.fill(window, color, local)?;
            self.text(window, self.char_width as i32, rect.height, &client.title, self.palette.title, color)?;
        }
        for (i, (window, rect)) in client.frame.buttons.iter().zip(&layout.buttons).enumerate() {
            let button_color = self.palette.buttons.get(i).copied().unwrap_or(self.palette.title);
            self.fill(*window, button_color, Rect::new(0, 0, rect.width, rect.height))?;
        }
        Ok(())
    }

    fn draw_infobar(&self, bar: &InfobarView) -> Result<()> {
        let window = bar.window;
        let height = bar.geo.height;
        self.fill(window, self.palette.bar_bg, Rect::new(0, 0, bar.geo.width, height))?;

        let cells = bar.tag_cells(self.char_width);
        for (tag, (x, width)) in bar.tags.iter().zip(&cells) {
            let (fg, bg) = match (tag.selected, tag.urgent) {
                (true, _) => (self.palette.selected_fg, self.palette.selected_bg),
                (false, true) => (self.palette.bar_bg, self.palette.urgent),
                (false, false) => (self.palette.bar_fg, self.palette.bar_bg),
            };
            self.fill(window, bg, Rect::new(*x, 0, *width, height))?;
            self.text(window, x + self.char_width as i32, height, &tag.label(), fg, bg)?;
        }

        let layout_x = cells.last().map(|(x, w)| x + *w as i32).unwrap_or(0) + self.char_width as i32;
        self.text(window, layout_x, height, bar.layout, self.palette.bar_fg, self.palette.bar_bg)?;

        let status_width = (bar.status.chars().count() as u32 + 1) * self.char_width;
        let status_x = (bar.geo.width as i32 - status_width as i32).max(layout_x);
        self.text(window, status_x, height, &bar.status, self.palette.bar_fg, self.palette.bar_bg)?;
        Ok(())
    }
}

impl Renderer for X11Renderer {
    fn redraw(&mut self, region: Region<'_>) -> Result<()> {
        match region {
            Region::Decoration { client, layout, state } => self.draw_decoration(client, layout, state),
            Region::Infobar(bar) => self.draw_infobar(bar),
        }
    }

    fn set_decoration_color(&mut self, client: &Client, state: DecorationState) -> Result<()> {
        let color = self.palette.decoration(state);
        let aux = ChangeWindowAttributesAux::new().background_pixel(color);
        let windows = std::iter::once(client.frame.frame).chain(client.frame.titlebar);
        for window in windows {
            self.ctx.conn.change_window_attributes(window, &aux)?;
            self.ctx.conn.clear_area(false, window, 0, 0, 0, 0)?;
        }
        Ok(())
    }

    fn infobar_hit(&self, bar: &InfobarView, x: i32) -> Option<usize> {
        bar.hit(x, self.char_width)
    }
}

impl Drop for X11Renderer {
    fn drop(&mut self) {
        let _ = self.ctx.conn.free_gc(self.gc);
        let _ = self.ctx.conn.close_font(self.font);
        debug!("Released renderer resources");
    }
}
