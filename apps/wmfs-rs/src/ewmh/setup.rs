use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, CreateWindowAux, PropMode, Window, WindowClass};
use x11rb::wrapper::ConnectionExt as _;

use crate::core::context::Context;

pub const WM_NAME: &str = "wmfs-rs";

/// Announce the manager through `_NET_SUPPORTING_WM_CHECK` and list the
/// hints it keeps up to date. Returns the check window.
pub fn setup_hints(ctx: &Context) -> Result<Window> {
    let check_win = ctx.conn.generate_id()?;
    ctx.conn.create_window(
        x11rb::COPY_DEPTH_FROM_PARENT,
        check_win,
        ctx.root_window,
        -1,
        -1,
        1,
        1,
        0,
        WindowClass::INPUT_OUTPUT,
        0,
        &CreateWindowAux::new(),
    )?;

    for window in [check_win, ctx.root_window] {
        ctx.conn.change_property32(
            PropMode::REPLACE,
            window,
            ctx.atoms._NET_SUPPORTING_WM_CHECK,
            AtomEnum::WINDOW,
            &[check_win],
        )?;
    }

    ctx.conn.change_property8(
        PropMode::REPLACE,
        check_win,
        ctx.atoms._NET_WM_NAME,
        ctx.atoms.UTF8_STRING,
        WM_NAME.as_bytes(),
    )?;

    let supported = [
        ctx.atoms._NET_SUPPORTED,
        ctx.atoms._NET_SUPPORTING_WM_CHECK,
        ctx.atoms._NET_WM_NAME,
        ctx.atoms._NET_WM_STATE,
        ctx.atoms._NET_WM_STATE_FULLSCREEN,
        ctx.atoms._NET_WM_DESKTOP,
        ctx.atoms._NET_NUMBER_OF_DESKTOPS,
        ctx.atoms._NET_CURRENT_DESKTOP,
        ctx.atoms._NET_ACTIVE_WINDOW,
    ];
    ctx.conn.change_property32(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_SUPPORTED,
        AtomEnum::ATOM,
        &supported,
    )?;

    Ok(check_win)
}

pub fn set_desktop_count(ctx: &Context, count: u32) -> Result<()> {
    ctx.conn.change_property32(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_NUMBER_OF_DESKTOPS,
        AtomEnum::CARDINAL,
        &[count],
    )?;
    Ok(())
}

pub fn set_current_desktop(ctx: &Context, desktop: u32) -> Result<()> {
    ctx.conn.change_property32(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_CURRENT_DESKTOP,
        AtomEnum::CARDINAL,
        &[desktop],
    )?;
    Ok(())
}

pub fn set_active_window(ctx: &Context, window: Option<Window>) -> Result<()> {
    ctx.conn.change_property32(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._NET_ACTIVE_WINDOW,
        AtomEnum::WINDOW,
        &[window.unwrap_or(x11rb::NONE)],
    )?;
    Ok(())
}

/// Publish the infobar status text; a running manager picks it up from the
/// property change.
pub fn set_status_text(ctx: &Context, text: &str) -> Result<()> {
    ctx.conn.change_property8(
        PropMode::REPLACE,
        ctx.root_window,
        ctx.atoms._WMFS_STATUSTEXT,
        ctx.atoms.UTF8_STRING,
        text.as_bytes(),
    )?;
    ctx.conn.flush()?;
    Ok(())
}
