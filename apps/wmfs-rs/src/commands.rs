//! User commands and the key/mouse bindings that trigger them.

use std::collections::HashMap;

use thiserror::Error;
use wmfs_rs_config::{modifier_mask, ConfigError, MouseContext, WmConfig};

use crate::layout::Layout;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("unknown function {name:?}")]
    Unbound { name: String },

    #[error("{func}: missing argument")]
    MissingArgument { func: String },

    #[error("{func}: bad argument {value:?}")]
    BadArgument { func: String, value: String },

    #[error("unknown key {name:?}")]
    UnknownKey { name: String },

    #[error(transparent)]
    Modifier(#[from] ConfigError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Spawn(String),
    Quit,
    Reload,
    ClientKill,
    ClientNext,
    ClientPrev,
    ClientRaise,
    ClientSwapNext,
    ClientSwapPrev,
    /// Swap the selected client with the master
    TileSwitch,
    ToggleFree,
    ToggleMax,
    ToggleFullscreen,
    ToggleSticky,
    /// Select a tag by 0-based index
    Tag(usize),
    TagNext,
    TagPrev,
    /// Send the selected client to a tag, 0-based
    TagTransfert(usize),
    ScreenSelect(usize),
    ScreenNext,
    ScreenPrev,
    LayoutNext,
    LayoutPrev,
    SetLayout(Layout),
    /// Relative change
    SetMwfact(f64),
    /// Relative change
    SetNmaster(i32),
    ToggleResizehint,
    ToggleMirror,
    InfobarTogglepos,
    MouseMove,
    MouseResize,
}

impl Command {
    /// Build a command from its configured function name and argument.
    pub fn parse(func: &str, cmd: Option<&str>) -> Result<Self, CommandError> {
        let arg = || {
            cmd.map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| CommandError::MissingArgument { func: func.to_string() })
        };
        let bad = |value: &str| CommandError::BadArgument { func: func.to_string(), value: value.to_string() };
        // User-facing numbers are 1-based.
        let index = |value: &str| -> Result<usize, CommandError> {
            value
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .ok_or_else(|| bad(value))
        };

        let command = match func {
            "spawn" => Command::Spawn(arg()?.to_string()),
            "quit" => Command::Quit,
            "reload" => Command::Reload,
            "client_kill" => Command::ClientKill,
            "client_next" => Command::ClientNext,
            "client_prev" => Command::ClientPrev,
            "client_raise" => Command::ClientRaise,
            "client_swap_next" => Command::ClientSwapNext,
            "client_swap_prev" => Command::ClientSwapPrev,
            "tile_switch" => Command::TileSwitch,
            "toggle_free" => Command::ToggleFree,
            "toggle_max" => Command::ToggleMax,
            "toggle_fullscreen" => Command::ToggleFullscreen,
            "toggle_sticky" => Command::ToggleSticky,
            "tag" => Command::Tag(index(arg()?)?),
            "tag_next" => Command::TagNext,
            "tag_prev" => Command::TagPrev,
            "tag_transfert" => Command::TagTransfert(index(arg()?)?),
            "screen_select" => Command::ScreenSelect(index(arg()?)?),
            "screen_next" => Command::ScreenNext,
            "screen_prev" => Command::ScreenPrev,
            "layout_next" => Command::LayoutNext,
            "layout_prev" => Command::LayoutPrev,
            "set_layout" => {
                let name = arg()?;
                Command::SetLayout(Layout::from_name(name).ok_or_else(|| bad(name))?)
            }
            "set_mwfact" => {
                let value = arg()?;
                Command::SetMwfact(value.parse().map_err(|_| bad(value))?)
            }
            "set_nmaster" => {
                let value = arg()?;
                Command::SetNmaster(value.parse().map_err(|_| bad(value))?)
            }
            "toggle_resizehint" => Command::ToggleResizehint,
            "toggle_mirror" => Command::ToggleMirror,
            "infobar_togglepos" => Command::InfobarTogglepos,
            "mouse_move" => Command::MouseMove,
            "mouse_resize" => Command::MouseResize,
            _ => return Err(CommandError::Unbound { name: func.to_string() }),
        };
        Ok(command)
    }
}

/// X keysym for a key name: letters, digits and the usual named keys.
pub fn keysym_from_name(name: &str) -> Option<u32> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() || c.is_ascii_punctuation() {
            return Some(c.to_ascii_lowercase() as u32);
        }
    }
    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=35).contains(&n) {
            return Some(0xffbe + n - 1);
        }
    }
    let keysym = match name {
        "space" => 0x0020,
        "BackSpace" => 0xff08,
        "Tab" => 0xff09,
        "Return" => 0xff0d,
        "Pause" => 0xff13,
        "Escape" => 0xff1b,
        "Home" => 0xff50,
        "Left" => 0xff51,
        "Up" => 0xff52,
        "Right" => 0xff53,
        "Down" => 0xff54,
        "Prior" | "Page_Up" => 0xff55,
        "Next" | "Page_Down" => 0xff56,
        "End" => 0xff57,
        "Print" => 0xff61,
        "Insert" => 0xff63,
        "Menu" => 0xff67,
        "Delete" => 0xffff,
        _ => return None,
    };
    Some(keysym)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseBinding {
    pub context: MouseContext,
    pub button: u8,
    pub mods: u16,
    pub command: Command,
}

/// Every binding, resolved once from configuration.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    keys: HashMap<(u16, u32), Command>,
    mouse: Vec<MouseBinding>,
    /// Indexed like the decoration buttons
    buttons: Vec<Command>,
}

impl Bindings {
    /// Resolve all bindings. Invalid entries are skipped and returned alongside.
    pub fn from_config(config: &WmConfig) -> (Self, Vec<CommandError>) {
        let mut bindings = Self::default();
        let mut errors = Vec::new();

        for key in &config.keys {
            let resolved = modifier_mask(key.mods.as_slice())
                .map_err(CommandError::from)
                .and_then(|mods| {
                    let keysym = keysym_from_name(&key.key)
                        .ok_or_else(|| CommandError::UnknownKey { name: key.key.clone() })?;
                    Ok((mods, keysym, Command::parse(&key.func, key.cmd.as_deref())?))
                });
            match resolved {
                Ok((mods, keysym, command)) => {
                    bindings.keys.insert((mods, keysym), command);
                }
                Err(e) => errors.push(e),
            }
        }

        for mouse in &config.mouse {
            let resolved = modifier_mask(mouse.mods.as_slice())
                .map_err(CommandError::from)
                .and_then(|mods| Ok((mods, Command::parse(&mouse.func, mouse.cmd.as_deref())?)));
            match resolved {
                Ok((mods, command)) => bindings.mouse.push(MouseBinding {
                    context: mouse.context,
                    button: mouse.button,
                    mods,
                    command,
                }),
                Err(e) => errors.push(e),
            }
        }

        for button in &config.client.buttons {
            // Keep indices aligned with the drawn buttons even when one is invalid.
            match Command::parse(&button.func, button.cmd.as_deref()) {
                Ok(command) => bindings.buttons.push(command),
                Err(e) => {
                    errors.push(e);
                    bindings.buttons.push(Command::ClientRaise);
                }
            }
        }

        (bindings, errors)
    }

    pub fn key(&self, mods: u16, keysym: u32) -> Option<&Command> {
        self.keys.get(&(mods, keysym))
    }

    /// `(modifiers, keysym)` pairs to grab on the root window.
    pub fn grabbed_keys(&self) -> Vec<(u16, u32)> {
        self.keys.keys().copied().collect()
    }

    pub fn mouse(&self, context: MouseContext, button: u8, mods: u16) -> Option<&Command> {
        self.mouse
            .iter()
            .find(|b| b.context == context && b.button == button && b.mods == mods)
            .map(|b| &b.command)
    }

    /// `(modifiers, button)` pairs grabbed on focused clients.
    pub fn client_buttons(&self) -> Vec<(u16, u8)> {
        self.mouse
            .iter()
            .filter(|b| b.context == MouseContext::Client)
            .map(|b| (b.mods, b.button))
            .collect()
    }

    pub fn button(&self, index: usize) -> Option<&Command> {
        self.buttons.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wmfs_rs_config::{KeyConfig, MOD_1, MOD_SHIFT};

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("spawn", Some("xterm -e top")).unwrap(), Command::Spawn("xterm -e top".into()));
        assert_eq!(Command::parse("tag", Some("3")).unwrap(), Command::Tag(2));
        assert_eq!(Command::parse("set_mwfact", Some("-0.025")).unwrap(), Command::SetMwfact(-0.025));
        assert_eq!(Command::parse("set_nmaster", Some("+1")).unwrap(), Command::SetNmaster(1));
        assert_eq!(Command::parse("set_layout", Some("grid")).unwrap(), Command::SetLayout(Layout::Grid));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Command::parse("fly", None), Err(CommandError::Unbound { .. })));
        assert!(matches!(Command::parse("spawn", None), Err(CommandError::MissingArgument { .. })));
        assert!(matches!(Command::parse("tag", Some("0")), Err(CommandError::BadArgument { .. })));
        assert!(matches!(Command::parse("set_layout", Some("spiral")), Err(CommandError::BadArgument { .. })));
    }

    #[test]
    fn test_keysym_names() {
        assert_eq!(keysym_from_name("a"), Some(0x61));
        assert_eq!(keysym_from_name("Q"), Some(0x71));
        assert_eq!(keysym_from_name("1"), Some(0x31));
        assert_eq!(keysym_from_name("F1"), Some(0xffbe));
        assert_eq!(keysym_from_name("F12"), Some(0xffc9));
        assert_eq!(keysym_from_name("Return"), Some(0xff0d));
        assert_eq!(keysym_from_name("Hyper_Q"), None);
    }

    #[test]
    fn test_default_bindings_resolve() {
        let (bindings, errors) = Bindings::from_config(&WmConfig::default());
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(bindings.key(MOD_1, 0xff0d), Some(&Command::Spawn("xterm".into())));
        assert_eq!(bindings.key(MOD_1 | MOD_SHIFT, 0xffbe), Some(&Command::TagTransfert(0)));
        assert_eq!(bindings.mouse(MouseContext::Client, 1, MOD_1), Some(&Command::MouseMove));
        assert_eq!(bindings.mouse(MouseContext::Client, 1, 0), None);
        assert_eq!(bindings.button(0), Some(&Command::ClientKill));
        assert!(bindings.client_buttons().contains(&(MOD_1, 3)));
    }

    #[test]
    fn test_invalid_binding_is_reported_and_skipped() {
        let mut config = WmConfig::default();
        config.keys = vec![
            KeyConfig { mods: vec!["Hyper".into()], key: "a".into(), func: "quit".into(), cmd: None },
            KeyConfig { mods: vec![], key: "Nope".into(), func: "quit".into(), cmd: None },
            KeyConfig { mods: vec![], key: "a".into(), func: "dance".into(), cmd: None },
            KeyConfig { mods: vec!["Super".into()], key: "a".into(), func: "quit".into(), cmd: None },
        ];
        let (bindings, errors) = Bindings::from_config(&config);
        assert_eq!(errors.len(), 3);
        assert_eq!(bindings.grabbed_keys().len(), 1);
    }
}
