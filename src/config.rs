//! Configuration for the notification server
//!
//! Loads configuration from TOML file at `~/.config/area/notify.toml`
//! Auto-generates default config file on first run if missing.
//!
//! The file holds raw user values. [`NotifierConfig::validate`] turns them
//! into a [`Style`]; bad values are reported once and replaced by defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::notification::Urgency;
use crate::server::text;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notifier: NotifierConfig,
}

impl Config {
    /// Load configuration from the default path, or use defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Load from `path` (or the default location), falling back to
    /// defaults with a warning when the file cannot be read or parsed
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let loaded = match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        };
        loaded.unwrap_or_else(|e| {
            warn!("Failed to load config: {:#}, using defaults", e);
            Self::default()
        })
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area");

        Ok(config_dir.join("notify.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// A value given either once for all urgencies or as a low/normal/critical triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PerUrgency<T> {
    All(T),
    Each([T; 3]),
}

impl<T: Clone> PerUrgency<T> {
    pub fn get(&self, urgency: Urgency) -> T {
        match self {
            Self::All(value) => value.clone(),
            Self::Each(values) => values[urgency.index()].clone(),
        }
    }
}

/// `[notifier]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Text template; placeholders: {summary}, {body}, {app_name}
    pub format: String,
    /// Text colour, "#rrggbb"
    pub foreground: PerUrgency<String>,
    /// Background colour, "#rrggbb"
    pub background: PerUrgency<String>,
    /// Border colour, "#rrggbb"
    pub border: PerUrgency<String>,
    /// Millisecond timeout, 0 = stay until closed
    pub timeout: PerUrgency<i32>,
    /// Maximum number of popups on screen at once
    pub max_windows: usize,
    /// Vertical gap between stacked popups
    pub gap: u16,
    /// Pixel size of icons
    pub icon_size: u32,
    /// Disable timeout while browsing history
    pub sticky_history: bool,
    /// What to do while a fullscreen window is focused: "show", "hide" or "queue"
    pub fullscreen: String,
    /// Position of the topmost popup
    pub x: i16,
    pub y: i16,
    /// Popup size
    pub width: u16,
    pub height: u16,
    pub border_width: u16,
    /// Popup opacity (0.0-1.0)
    pub opacity: f32,
    /// X core font family
    pub font: String,
    pub fontsize: u16,
    /// "left", "center" or "right"
    pub text_alignment: String,
    /// Padding at the sides of text, defaults to half the font size
    pub horizontal_padding: Option<u16>,
    /// Padding above the first line, defaults to half the font size
    pub vertical_padding: Option<u16>,
    /// Space between lines
    pub line_spacing: u16,
}

const DEFAULT_FORMAT: &str = "{summary}\n{body}";
const DEFAULT_FOREGROUND: u32 = 0xffffff;
const DEFAULT_BACKGROUND: u32 = 0x111111;
const DEFAULT_BORDER: u32 = 0x111111;
const DEFAULT_TIMEOUT: [i32; 3] = [5000, 5000, 0];

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            foreground: PerUrgency::All("#ffffff".to_string()),
            background: PerUrgency::All("#111111".to_string()),
            border: PerUrgency::All("#111111".to_string()),
            timeout: PerUrgency::Each(DEFAULT_TIMEOUT),
            max_windows: 2,
            gap: 12,
            icon_size: 36,
            sticky_history: true,
            fullscreen: "show".to_string(),
            x: 50,
            y: 50,
            width: 256,
            height: 64,
            border_width: 4,
            opacity: 1.0,
            font: "fixed".to_string(),
            fontsize: 14,
            text_alignment: "left".to_string(),
            horizontal_padding: None,
            vertical_padding: None,
            line_spacing: 4,
        }
    }
}

/// Invalid configuration values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid colour {0:?}, expected #rrggbb")]
    InvalidColor(String),
    #[error("invalid format {format:?}: {reason}")]
    InvalidFormat { format: String, reason: String },
    #[error("invalid fullscreen policy {0:?}, expected show, hide or queue")]
    InvalidPolicy(String),
    #[error("invalid text alignment {0:?}, expected left, center or right")]
    InvalidAlignment(String),
}

/// What to do with notifications while a fullscreen window is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenPolicy {
    Show,
    Hide,
    Queue,
}

impl std::str::FromStr for FullscreenPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show" => Ok(Self::Show),
            "hide" => Ok(Self::Hide),
            "queue" => Ok(Self::Queue),
            other => Err(ConfigError::InvalidPolicy(other.to_string())),
        }
    }
}

/// Horizontal text alignment inside a popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl std::str::FromStr for Alignment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(ConfigError::InvalidAlignment(other.to_string())),
        }
    }
}

/// Parse "#rrggbb" or "#rgb" into 0xRRGGBB
pub fn parse_color(value: &str) -> Result<u32, ConfigError> {
    let invalid = || ConfigError::InvalidColor(value.to_string());
    let hex = value.strip_prefix('#').unwrap_or(value);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    match hex.len() {
        6 => u32::from_str_radix(hex, 16).map_err(|_| invalid()),
        3 => {
            let short = u32::from_str_radix(hex, 16).map_err(|_| invalid())?;
            let (r, g, b) = ((short >> 8) & 0xf, (short >> 4) & 0xf, short & 0xf);
            Ok((r * 0x11) << 16 | (g * 0x11) << 8 | b * 0x11)
        }
        _ => Err(invalid()),
    }
}

/// Validated, ready-to-use popup settings
#[derive(Debug, Clone)]
pub struct Style {
    pub format: String,
    pub foreground: [u32; 3],
    pub background: [u32; 3],
    pub border: [u32; 3],
    pub timeout: [i32; 3],
    pub max_windows: usize,
    pub gap: i32,
    pub icon_size: u32,
    pub sticky_history: bool,
    pub fullscreen: FullscreenPolicy,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub border_width: u32,
    pub opacity: f32,
    pub font: String,
    pub fontsize: u16,
    pub alignment: Alignment,
    pub horizontal_padding: u32,
    pub vertical_padding: u32,
    pub line_spacing: u32,
}

impl Default for Style {
    fn default() -> Self {
        NotifierConfig::default().validate()
    }
}

impl NotifierConfig {
    /// Resolve raw values into a [`Style`], logging and replacing anything invalid
    pub fn validate(&self) -> Style {
        let format = match text::validate_format(&self.format) {
            Ok(()) => self.format.clone(),
            Err(e) => {
                warn!("{}; using {:?}", e, DEFAULT_FORMAT);
                DEFAULT_FORMAT.to_string()
            }
        };

        let fullscreen = self.fullscreen.parse().unwrap_or_else(|e| {
            warn!("{}; using show", e);
            FullscreenPolicy::Show
        });

        let alignment = self.text_alignment.parse().unwrap_or_else(|e| {
            warn!("{}; using left", e);
            Alignment::Left
        });

        let max_windows = if self.max_windows == 0 {
            warn!("max_windows must be at least 1; using 1");
            1
        } else {
            self.max_windows
        };

        let opacity = if (0.0..=1.0).contains(&self.opacity) {
            self.opacity
        } else {
            warn!("opacity {} out of range 0.0-1.0; clamping", self.opacity);
            self.opacity.clamp(0.0, 1.0)
        };

        let half_font = u32::from(self.fontsize / 2);

        Style {
            format,
            foreground: colors(&self.foreground, DEFAULT_FOREGROUND),
            background: colors(&self.background, DEFAULT_BACKGROUND),
            border: colors(&self.border, DEFAULT_BORDER),
            timeout: [
                self.timeout.get(Urgency::Low),
                self.timeout.get(Urgency::Normal),
                self.timeout.get(Urgency::Critical),
            ],
            max_windows,
            gap: i32::from(self.gap),
            icon_size: self.icon_size,
            sticky_history: self.sticky_history,
            fullscreen,
            x: i32::from(self.x),
            y: i32::from(self.y),
            width: u32::from(self.width.max(1)),
            height: u32::from(self.height.max(1)),
            border_width: u32::from(self.border_width),
            opacity,
            font: self.font.clone(),
            fontsize: self.fontsize,
            alignment,
            horizontal_padding: self.horizontal_padding.map(u32::from).unwrap_or(half_font),
            vertical_padding: self.vertical_padding.map(u32::from).unwrap_or(half_font),
            line_spacing: u32::from(self.line_spacing),
        }
    }
}

fn colors(values: &PerUrgency<String>, fallback: u32) -> [u32; 3] {
    [Urgency::Low, Urgency::Normal, Urgency::Critical].map(|urgency| {
        parse_color(&values.get(urgency)).unwrap_or_else(|e| {
            warn!("{}; using #{:06x}", e, fallback);
            fallback
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff0080"), Ok(0xff0080));
        assert_eq!(parse_color("112233"), Ok(0x112233));
        assert_eq!(parse_color("#fa0"), Ok(0xffaa00));
        assert!(matches!(parse_color("#12345"), Err(ConfigError::InvalidColor(_))));
        assert!(matches!(parse_color("red"), Err(ConfigError::InvalidColor(_))));
        assert!(matches!(parse_color("#+12345"), Err(ConfigError::InvalidColor(_))));
    }

    #[test]
    fn test_malformed_explicit_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[notifier\nmax_windows = ").unwrap();

        let config = Config::load_or_default(Some(file.path()));
        assert_eq!(config.notifier.max_windows, NotifierConfig::default().max_windows);
        assert_eq!(config.notifier.format, NotifierConfig::default().format);
    }

    #[test]
    fn test_default_style() {
        let style = Style::default();
        assert_eq!(style.format, "{summary}\n{body}");
        assert_eq!(style.foreground, [0xffffff; 3]);
        assert_eq!(style.timeout, [5000, 5000, 0]);
        assert_eq!(style.max_windows, 2);
        assert_eq!(style.horizontal_padding, 7);
        assert_eq!(style.vertical_padding, 7);
        assert_eq!(style.fullscreen, FullscreenPolicy::Show);
        assert!(style.sticky_history);
    }

    #[test]
    fn test_scalar_or_triple_values() {
        let config: Config = toml::from_str(
            r##"
            [notifier]
            foreground = "#000000"
            background = ["#010101", "#020202", "#030303"]
            timeout = 3000
            "##,
        )
        .unwrap();
        let style = config.notifier.validate();
        assert_eq!(style.foreground, [0, 0, 0]);
        assert_eq!(style.background, [0x010101, 0x020202, 0x030303]);
        assert_eq!(style.timeout, [3000, 3000, 3000]);
        // Untouched keys keep their defaults
        assert_eq!(style.gap, 12);
        assert_eq!(style.icon_size, 36);
    }

    #[test]
    fn test_invalid_values_degrade_to_defaults() {
        let config = NotifierConfig {
            format: "{summary} {nope}".to_string(),
            border: PerUrgency::Each(["#ff0000".into(), "bogus".into(), "#00ff00".into()]),
            fullscreen: "sometimes".to_string(),
            text_alignment: "justify".to_string(),
            max_windows: 0,
            opacity: 3.0,
            ..NotifierConfig::default()
        };
        let style = config.validate();
        assert_eq!(style.format, DEFAULT_FORMAT);
        assert_eq!(style.border, [0xff0000, DEFAULT_BORDER, 0x00ff00]);
        assert_eq!(style.fullscreen, FullscreenPolicy::Show);
        assert_eq!(style.alignment, Alignment::Left);
        assert_eq!(style.max_windows, 1);
        assert_eq!(style.opacity, 1.0);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("queue".parse(), Ok(FullscreenPolicy::Queue));
        assert_eq!("hide".parse(), Ok(FullscreenPolicy::Hide));
        assert_eq!(
            "loud".parse::<FullscreenPolicy>(),
            Err(ConfigError::InvalidPolicy("loud".into()))
        );
        assert_eq!("center".parse(), Ok(Alignment::Center));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[notifier]\nmax_windows = 4\nfullscreen = \"queue\"\nsticky_history = false"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.notifier.max_windows, 4);
        let style = config.notifier.validate();
        assert_eq!(style.fullscreen, FullscreenPolicy::Queue);
        assert!(!style.sticky_history);
    }

    #[test]
    fn test_load_from_rejects_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[notifier\nmax_windows = ").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.notifier.timeout, PerUrgency::Each(DEFAULT_TIMEOUT));
        assert_eq!(parsed.notifier.format, DEFAULT_FORMAT);
    }
}
