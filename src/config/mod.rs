//! Configuration file management
//!
//! Loads TOML configuration files and provides session settings.
//! Default config path: ~/.config/monopal/config.toml

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_QUEUE_CAPACITY, DEFAULT_REPEAT_DELAY_MS, DEFAULT_REPEAT_RATE_MS, INK_ARGB,
    MIN_QUEUE_CAPACITY, PAPER_ARGB,
};
use crate::frame::Palette;
use crate::host::{HostKey, HostMods};
use crate::input::ButtonCodes;
use crate::utils::{format_hex_color, parse_hex_argb};

/// Session settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display settings
    pub display: DisplayConfig,
    /// Input translation settings
    pub input: InputConfig,
    /// Keyboard settings (console host)
    pub keyboard: KeyboardInputConfig,
}

/// Display output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// DRM device path (empty = first /dev/dri/card* with a connected output)
    pub device: String,
    /// Prefer external monitors over internal (eDP) display
    pub prefer_external: bool,
    /// Color of set framebuffer bits (RRGGBB)
    pub ink: String,
    /// Color of clear framebuffer bits (RRGGBB)
    pub paper: String,
    /// Convert only the areas reported through `update_area`
    pub partial_updates: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            prefer_external: true,
            ink: format_hex_color(INK_ARGB),
            paper: format_hex_color(PAPER_ARGB),
            partial_updates: false,
        }
    }
}

/// Input translation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Event queue capacity in words
    pub queue_capacity: usize,
    /// Hotkey(s) that end the session (default: "ctrl+q")
    #[serde(deserialize_with = "deserialize_keybind")]
    pub terminate: Vec<String>,
    /// Post middle=129 / right=128 like older hosts did
    pub legacy_button_codes: bool,
    /// Debug-log every posted event
    pub log_events: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            terminate: vec!["ctrl+q".to_string()],
            legacy_button_codes: false,
            log_events: false,
        }
    }
}

/// Keyboard input settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardInputConfig {
    /// Key repeat delay in milliseconds (default: 400)
    pub repeat_delay: u64,
    /// Key repeat rate in milliseconds (default: 30)
    pub repeat_rate: u64,
    /// XKB keyboard model (empty = default)
    pub xkb_model: String,
    /// XKB keyboard layout (e.g., "us", "jp", empty = default)
    pub xkb_layout: String,
    /// XKB keyboard variant (empty = default)
    pub xkb_variant: String,
    /// XKB keyboard options (e.g., "ctrl:nocaps", empty = default)
    pub xkb_options: String,
}

impl Default for KeyboardInputConfig {
    fn default() -> Self {
        Self {
            repeat_delay: DEFAULT_REPEAT_DELAY_MS,
            repeat_rate: DEFAULT_REPEAT_RATE_MS,
            xkb_model: String::new(),
            xkb_layout: String::new(),
            xkb_variant: String::new(),
            xkb_options: String::new(),
        }
    }
}

/// Keybind deserializer: accepts string or array
fn deserialize_keybind<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct KeybindVisitor;

    impl<'de> Visitor<'de> for KeybindVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or array of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(vec![value.to_string()])
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: de::SeqAccess<'de>,
        {
            let mut keys = Vec::new();
            while let Some(key) = seq.next_element::<String>()? {
                keys.push(key);
            }
            Ok(keys)
        }
    }

    deserializer.deserialize_any(KeybindVisitor)
}

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/monopal/config.toml";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. MONOPAL_CONFIG environment variable
        if let Ok(path) = std::env::var("MONOPAL_CONFIG") {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/monopal/config.toml
        if let Some(path) = default_config_path() {
            if path.exists() {
                return Some(path);
            }
        }

        // 3. System config: /etc/monopal/config.toml
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. MONOPAL_CONFIG environment variable
    /// 2. ~/.config/monopal/config.toml (user config)
    /// 3. /etc/monopal/config.toml (system config)
    /// 4. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Write the default config template
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn write_default_config(force: bool) -> Result<PathBuf> {
        let config_path =
            default_config_path().ok_or_else(|| anyhow::anyhow!("Config directory not found"))?;
        Self::write_default_config_to(&config_path, force)?;
        Ok(config_path)
    }

    /// Write the default config template to `path`
    pub fn write_default_config_to(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        std::fs::write(path, Self::default_template())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Default config as commented TOML
    pub fn default_template() -> String {
        let d = Self::default();
        format!(
            r#"# monopal configuration

[display]
# DRM device (empty = first /dev/dri/card* with a connected output)
device = "{device}"
# Prefer HDMI/DisplayPort/DVI/VGA over the internal panel
prefer_external = {prefer_external}
# Colors for set (ink) and clear (paper) framebuffer bits
ink = "{ink}"
paper = "{paper}"
# Convert only regions reported with update_area
partial_updates = {partial_updates}

[input]
# Event queue capacity in words (minimum {min_capacity})
queue_capacity = {queue_capacity}
# Hotkey that ends the session (string or array)
terminate = "{terminate}"
# Swap middle/right button codes (128/129) for older images
legacy_button_codes = {legacy}
# Log every posted event at debug level
log_events = {log_events}

[keyboard]
repeat_delay = {repeat_delay}
repeat_rate = {repeat_rate}
xkb_model = ""
xkb_layout = ""
xkb_variant = ""
xkb_options = ""
"#,
            device = d.display.device,
            prefer_external = d.display.prefer_external,
            ink = d.display.ink,
            paper = d.display.paper,
            partial_updates = d.display.partial_updates,
            min_capacity = MIN_QUEUE_CAPACITY,
            queue_capacity = d.input.queue_capacity,
            terminate = d.input.terminate.join(","),
            legacy = d.input.legacy_button_codes,
            log_events = d.input.log_events,
            repeat_delay = d.keyboard.repeat_delay,
            repeat_rate = d.keyboard.repeat_rate,
        )
    }

    /// Ink/paper palette; unparsable colors fall back to black on white
    pub fn palette(&self) -> Palette {
        let ink = parse_hex_argb(&self.display.ink).unwrap_or_else(|| {
            warn!("Invalid ink color {:?}, using default", self.display.ink);
            INK_ARGB
        });
        let paper = parse_hex_argb(&self.display.paper).unwrap_or_else(|| {
            warn!("Invalid paper color {:?}, using default", self.display.paper);
            PAPER_ARGB
        });
        Palette { ink, paper }
    }

    /// Mouse button codes selected by `input.legacy_button_codes`
    pub fn button_codes(&self) -> ButtonCodes {
        if self.input.legacy_button_codes {
            ButtonCodes::legacy_swapped()
        } else {
            ButtonCodes::standard()
        }
    }

    /// Parsed terminate hotkeys
    pub fn terminate_keys(&self) -> ParsedKeybinds {
        ParsedKeybinds::parse(&self.input.terminate)
    }
}

/// Get default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("monopal").join("config.toml"))
}

/// Parse multiple keybindings
#[derive(Debug, Clone, Default)]
pub struct ParsedKeybinds {
    pub bindings: Vec<ParsedKeybind>,
}

impl ParsedKeybinds {
    /// Parse from string array
    pub fn parse(keys: &[String]) -> Self {
        Self {
            bindings: keys.iter().map(|s| ParsedKeybind::parse(s)).collect(),
        }
    }

    /// Check if any keybind matches
    pub fn matches(&self, key: HostKey, mods: HostMods) -> bool {
        self.bindings.iter().any(|kb| kb.matches(key, mods))
    }
}

/// Parse keybind string
/// Example: "ctrl+shift+c" -> (ctrl: true, shift: true, key: "c")
#[derive(Debug, Clone, Default)]
pub struct ParsedKeybind {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: String,
}

impl ParsedKeybind {
    pub fn parse(s: &str) -> Self {
        let lowercase = s.trim().to_lowercase();
        let mut result = Self::default();

        for part in lowercase.split('+') {
            match part {
                "ctrl" | "control" => result.ctrl = true,
                "shift" => result.shift = true,
                "alt" => result.alt = true,
                other => result.key = other.to_string(),
            }
        }

        result
    }

    /// Check against a host key and the modifiers held with it
    pub fn matches(&self, key: HostKey, mods: HostMods) -> bool {
        if self.ctrl != mods.contains(HostMods::CTRL)
            || self.shift != mods.contains(HostMods::SHIFT)
            || self.alt != mods.contains(HostMods::ALT)
        {
            return false;
        }
        self.host_key() == Some(key)
    }

    /// Host key named by the binding
    fn host_key(&self) -> Option<HostKey> {
        let key = match self.key.as_str() {
            "space" => HostKey::Space,
            "plus" => HostKey::Char('='),
            "minus" => HostKey::Char('-'),
            "enter" | "return" => HostKey::Return,
            "tab" => HostKey::Tab,
            "escape" | "esc" => HostKey::Escape,
            "backspace" => HostKey::Backspace,
            "delete" | "del" => HostKey::Delete,
            "up" => HostKey::Up,
            "down" => HostKey::Down,
            "left" => HostKey::Left,
            "right" => HostKey::Right,
            k => {
                let mut chars = k.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_graphic() => HostKey::Char(c),
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.input.queue_capacity, 100);
        assert_eq!(config.palette(), Palette::default());
        assert_eq!(config.button_codes(), ButtonCodes::standard());
        assert!(!config.display.partial_updates);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r##"
            [display]
            ink = "#00ff00"

            [input]
            legacy_button_codes = true
            terminate = ["ctrl+q", "ctrl+shift+escape"]
            "##,
        )
        .unwrap();
        assert_eq!(config.palette().ink, 0xFF00_FF00);
        assert_eq!(config.palette().paper, PAPER_ARGB);
        assert_eq!(config.button_codes(), ButtonCodes::legacy_swapped());
        assert_eq!(config.input.terminate.len(), 2);
        assert_eq!(config.keyboard.repeat_delay, 400);
    }

    #[test]
    fn test_bad_color_falls_back() {
        let mut config = Config::default();
        config.display.paper = "nope".into();
        assert_eq!(config.palette().paper, PAPER_ARGB);
    }

    #[test]
    fn test_default_template_parses_back() {
        let config = Config::from_toml(&Config::default_template()).unwrap();
        assert_eq!(config.input.terminate, vec!["ctrl+q".to_string()]);
        assert_eq!(config.palette(), Palette::default());
        assert_eq!(config.input.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_write_default_config_respects_force() {
        let dir = std::env::temp_dir().join(format!("monopal-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = std::fs::remove_file(&path);

        Config::write_default_config_to(&path, false).unwrap();
        assert!(Config::write_default_config_to(&path, false).is_err());
        Config::write_default_config_to(&path, true).unwrap();
        assert!(Config::load_from_file(&path).is_ok());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_parse_keybind() {
        let kb = ParsedKeybind::parse("ctrl+shift+c");
        assert!(kb.ctrl);
        assert!(kb.shift);
        assert_eq!(kb.key, "c");
    }

    #[test]
    fn test_keybind_matches_host_key() {
        let kb = ParsedKeybind::parse("Ctrl+Q");
        assert!(kb.matches(HostKey::Char('q'), HostMods::CTRL));
        assert!(!kb.matches(HostKey::Char('q'), HostMods::CTRL | HostMods::SHIFT));
        assert!(!kb.matches(HostKey::Char('q'), HostMods::empty()));
        assert!(!kb.matches(HostKey::Char('w'), HostMods::CTRL));

        let esc = ParsedKeybinds::parse(&["alt+escape".to_string(), "ctrl+minus".to_string()]);
        assert!(esc.matches(HostKey::Escape, HostMods::ALT));
        assert!(esc.matches(HostKey::Char('-'), HostMods::CTRL));
        assert!(!ParsedKeybind::parse("ctrl+f13").matches(HostKey::Other(183), HostMods::CTRL));
    }
}
