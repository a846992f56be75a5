use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Error types for configuration operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {reason}")]
    InvalidFormat { reason: String },

    #[error("Invalid color {value:?}: expected #rrggbb")]
    InvalidColor { value: String },

    #[error("Unknown modifier {name:?}")]
    UnknownModifier { name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// X11 modifier mask bits, kept numeric so this crate stays display-agnostic.
pub const MOD_SHIFT: u16 = 1 << 0;
pub const MOD_LOCK: u16 = 1 << 1;
pub const MOD_CONTROL: u16 = 1 << 2;
pub const MOD_1: u16 = 1 << 3;
pub const MOD_2: u16 = 1 << 4;
pub const MOD_3: u16 = 1 << 5;
pub const MOD_4: u16 = 1 << 6;
pub const MOD_5: u16 = 1 << 7;

/// Where the infobar sits on its screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BarPosition {
    #[default]
    Top,
    Bottom,
    Hidden,
}

/// Which surface a mouse binding applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MouseContext {
    Root,
    Client,
    Titlebar,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ButtonConfig {
    pub func: String,
    pub cmd: Option<String>,
    pub color: String,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self { func: "client_kill".into(), cmd: None, color: "#bb4444".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub border_width: u16,
    pub titlebar_height: u16,
    /// Modifier used by client mouse bindings and passive button grabs.
    pub modifier: String,
    pub focus_follows_pointer: bool,
    pub normal_color: String,
    pub focus_color: String,
    pub urgent_color: String,
    pub title_color: String,
    pub buttons: Vec<ButtonConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            border_width: 1,
            titlebar_height: 12,
            modifier: "Alt".into(),
            focus_follows_pointer: true,
            normal_color: "#354b5c".into(),
            focus_color: "#6d8fbb".into(),
            urgent_color: "#c4472f".into(),
            title_color: "#d0d0d0".into(),
            buttons: vec![ButtonConfig::default()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BarConfig {
    pub height: u16,
    pub position: BarPosition,
    pub background: String,
    pub foreground: String,
    pub selected_background: String,
    pub selected_foreground: String,
    pub status: String,
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            height: 16,
            position: BarPosition::Top,
            background: "#090909".into(),
            foreground: "#b4b4b4".into(),
            selected_background: "#354b5c".into(),
            selected_foreground: "#ffffff".into(),
            status: "wmfs-rs".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TagConfig {
    pub name: String,
    /// One of `tile_left`, `tile_right`, `tile_top`, `tile_bottom`, `grid`, `max`, `free`.
    pub layout: String,
    pub mwfact: f64,
    pub nmaster: u32,
    pub mirror: bool,
    pub resizehint: bool,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            name: "tag".into(),
            layout: "tile_left".into(),
            mwfact: 0.65,
            nmaster: 1,
            mirror: false,
            resizehint: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyConfig {
    #[serde(default)]
    pub mods: Vec<String>,
    pub key: String,
    pub func: String,
    #[serde(default)]
    pub cmd: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MouseConfig {
    pub context: MouseContext,
    pub button: u8,
    #[serde(default)]
    pub mods: Vec<String>,
    pub func: String,
    #[serde(default)]
    pub cmd: Option<String>,
}

/// Read-only snapshot of everything the window manager consumes at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WmConfig {
    pub client: ClientConfig,
    pub bar: BarConfig,
    pub tags: Vec<TagConfig>,
    pub keys: Vec<KeyConfig>,
    pub mouse: Vec<MouseConfig>,
}

fn key(mods: &[&str], key: &str, func: &str, cmd: Option<&str>) -> KeyConfig {
    KeyConfig {
        mods: mods.iter().map(|m| m.to_string()).collect(),
        key: key.into(),
        func: func.into(),
        cmd: cmd.map(str::to_string),
    }
}

fn mouse(context: MouseContext, button: u8, mods: &[&str], func: &str, cmd: Option<&str>) -> MouseConfig {
    MouseConfig {
        context,
        button,
        mods: mods.iter().map(|m| m.to_string()).collect(),
        func: func.into(),
        cmd: cmd.map(str::to_string),
    }
}

impl Default for WmConfig {
    fn default() -> Self {
        let tags = (1..=9)
            .map(|i| TagConfig { name: i.to_string(), ..TagConfig::default() })
            .collect();

        let mut keys = vec![
            key(&["Control", "Alt"], "r", "reload", None),
            key(&["Control", "Alt"], "q", "quit", None),
            key(&["Alt"], "Return", "spawn", Some("xterm")),
            key(&["Alt"], "q", "client_kill", None),
            key(&["Alt"], "Tab", "client_next", None),
            key(&["Alt", "Shift"], "Tab", "client_prev", None),
            key(&["Alt"], "j", "client_swap_next", None),
            key(&["Alt"], "k", "client_swap_prev", None),
            key(&["Alt"], "z", "tile_switch", None),
            key(&["Alt"], "m", "toggle_max", None),
            key(&["Alt"], "f", "toggle_free", None),
            key(&["Alt", "Shift"], "f", "toggle_fullscreen", None),
            key(&["Alt"], "s", "toggle_sticky", None),
            key(&["Alt"], "l", "set_mwfact", Some("+0.025")),
            key(&["Alt"], "h", "set_mwfact", Some("-0.025")),
            key(&["Alt"], "d", "set_nmaster", Some("+1")),
            key(&["Alt", "Shift"], "d", "set_nmaster", Some("-1")),
            key(&["Alt"], "space", "layout_next", None),
            key(&["Alt", "Shift"], "space", "layout_prev", None),
            key(&["Alt"], "r", "toggle_resizehint", None),
            key(&["Alt", "Shift"], "m", "toggle_mirror", None),
            key(&["Alt"], "b", "infobar_togglepos", None),
            key(&["Alt"], "Right", "tag_next", None),
            key(&["Alt"], "Left", "tag_prev", None),
            key(&["Alt", "Shift"], "Right", "screen_next", None),
            key(&["Alt", "Shift"], "Left", "screen_prev", None),
        ];
        for i in 1..=9 {
            let n = i.to_string();
            let f = format!("F{}", i);
            keys.push(key(&["Alt"], &f, "tag", Some(&n)));
            keys.push(key(&["Alt", "Shift"], &f, "tag_transfert", Some(&n)));
        }

        let mouse = vec![
            mouse(MouseContext::Root, 4, &[], "tag_next", None),
            mouse(MouseContext::Root, 5, &[], "tag_prev", None),
            mouse(MouseContext::Client, 1, &["Alt"], "mouse_move", None),
            mouse(MouseContext::Client, 3, &["Alt"], "mouse_resize", None),
            mouse(MouseContext::Titlebar, 1, &[], "mouse_move", None),
            mouse(MouseContext::Titlebar, 3, &[], "mouse_resize", None),
        ];

        Self {
            client: ClientConfig::default(),
            bar: BarConfig::default(),
            tags,
            keys,
            mouse,
        }
    }
}

impl WmConfig {
    /// Load configuration from file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded configuration from {} ({} tags, {} keys)", path.display(), config.tags.len(), config.keys.len());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: WmConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.is_empty() {
            return Err(ConfigError::InvalidFormat { reason: "at least one tag is required".into() });
        }
        for tag in &self.tags {
            if !(0.0..1.0).contains(&tag.mwfact) || tag.mwfact == 0.0 {
                return Err(ConfigError::InvalidFormat {
                    reason: format!("tag {:?}: mwfact {} is outside (0, 1)", tag.name, tag.mwfact),
                });
            }
        }
        for color in [
            &self.client.normal_color,
            &self.client.focus_color,
            &self.client.urgent_color,
            &self.client.title_color,
            &self.bar.background,
            &self.bar.foreground,
            &self.bar.selected_background,
            &self.bar.selected_foreground,
        ] {
            parse_color(color)?;
        }
        modifier_mask(std::slice::from_ref(&self.client.modifier))?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wmfs-rs")
            .join("config.toml")
    }
}

/// Parse `#rrggbb` into a 24-bit pixel value.
pub fn parse_color(value: &str) -> Result<u32, ConfigError> {
    let hex = value
        .strip_prefix('#')
        .filter(|h| h.len() == 6)
        .ok_or_else(|| ConfigError::InvalidColor { value: value.to_string() })?;
    u32::from_str_radix(hex, 16).map_err(|_| ConfigError::InvalidColor { value: value.to_string() })
}

/// Combine modifier names into an X11 modifier mask.
pub fn modifier_mask<S: AsRef<str>>(names: &[S]) -> Result<u16, ConfigError> {
    names.iter().try_fold(0u16, |mask, name| {
        let bit = match name.as_ref().to_ascii_lowercase().as_str() {
            "shift" => MOD_SHIFT,
            "lock" => MOD_LOCK,
            "control" | "ctrl" => MOD_CONTROL,
            "alt" | "mod1" => MOD_1,
            "mod2" => MOD_2,
            "mod3" => MOD_3,
            "super" | "mod4" => MOD_4,
            "mod5" => MOD_5,
            _ => return Err(ConfigError::UnknownModifier { name: name.as_ref().to_string() }),
        };
        Ok(mask | bit)
    })
}
