use anyhow::{anyhow, Result};
use tracing::info;
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::randr::{ConnectionExt as _, NotifyMask};
use x11rb::protocol::xproto::{ChangeWindowAttributesAux, ConnectionExt, CreateWindowAux, EventMask, WindowClass};
use x11rb::rust_connection::RustConnection;

use crate::ewmh::atoms::AtomCollection;

/// The X connection and the per-screen constants every X-side component needs.
pub struct Context {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub root_window: u32,
    pub root_depth: u8,
    pub atoms: AtomCollection,
    pub screen_width: u16,
    pub screen_height: u16,
}

impl Context {
    pub fn new() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)?;
        let screen = &conn.setup().roots[screen_num];
        let root_window = screen.root;
        let root_depth = screen.root_depth;
        let screen_width = screen.width_in_pixels;
        let screen_height = screen.height_in_pixels;

        let atoms = AtomCollection::new(&conn)?.reply()?;

        Ok(Self { conn, screen_num, root_window, root_depth, atoms, screen_width, screen_height })
    }

    /// Take over the root window. Fails when another manager already redirects it.
    pub fn become_wm(&self) -> Result<()> {
        let mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::STRUCTURE_NOTIFY
            | EventMask::PROPERTY_CHANGE
            | EventMask::BUTTON_PRESS
            | EventMask::ENTER_WINDOW;
        self.conn
            .change_window_attributes(self.root_window, &ChangeWindowAttributesAux::new().event_mask(mask))?
            .check()
            .map_err(|e| anyhow!("another window manager is redirecting the root window: {}", e))?;

        if self.conn.extension_information(x11rb::protocol::randr::X11_EXTENSION_NAME)?.is_some() {
            self.conn.randr_select_input(self.root_window, NotifyMask::SCREEN_CHANGE)?;
        }
        Ok(())
    }

    /// ICCCM manager selection `WM_S{n}`.
    pub fn acquire_wm_selection(&self, replace: bool) -> Result<()> {
        let atom_name = format!("WM_S{}", self.screen_num);
        let wm_sn_atom = self.conn.intern_atom(false, atom_name.as_bytes())?.reply()?.atom;

        let owner = self.conn.get_selection_owner(wm_sn_atom)?.reply()?.owner;
        if owner != x11rb::NONE {
            if !replace {
                return Err(anyhow!(
                    "Another window manager is already running on screen {}. Use --replace to replace it.",
                    self.screen_num
                ));
            }
            info!("Another WM is running (Window {}), replacing", owner);
        }

        let selection_win = self.conn.generate_id()?;
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            selection_win,
            self.root_window,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
        )?;
        self.conn.set_selection_owner(selection_win, wm_sn_atom, x11rb::CURRENT_TIME)?;

        let new_owner = self.conn.get_selection_owner(wm_sn_atom)?.reply()?.owner;
        if new_owner != selection_win {
            return Err(anyhow!("Failed to acquire WM selection."));
        }

        info!("Acquired WM selection: {}", atom_name);
        Ok(())
    }
}
