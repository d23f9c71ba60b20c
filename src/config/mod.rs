//! Application Configuration
//!
//! User settings stored in TOML format. Every field has a default, so a
//! partial file only overrides what it names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::display::{Rgb, DEFAULT_MAX_SCREENS};
use crate::notification::NotificationState;

/// File name looked up in every configuration directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Socket the usage monitor listens on
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/usage-bar.sock";

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Upstream socket settings
    pub connection: ConnectionSettings,
    /// Overlay geometry and text settings
    pub overlay: OverlaySettings,
    /// Fill color for each state
    pub colors: StateColors,
    /// Text shown on the large overlays
    pub labels: StateLabels,
}

/// Upstream socket settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Path of the monitor's Unix socket
    pub socket_path: PathBuf,
    /// Delay before retrying a failed connect
    pub connect_retry_secs: u64,
    /// Delay before reconnecting after the stream closed
    pub reconnect_delay_secs: u64,
    /// Size of the read buffer in bytes
    pub read_buffer_size: usize,
    /// Read timeout used to notice shutdown requests while idle
    pub read_poll_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            connect_retry_secs: 5,
            reconnect_delay_secs: 1,
            read_buffer_size: 256,
            read_poll_ms: 250,
        }
    }
}

impl ConnectionSettings {
    pub fn connect_retry(&self) -> Duration {
        Duration::from_secs(self.connect_retry_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn read_poll(&self) -> Duration {
        Duration::from_millis(self.read_poll_ms.max(1))
    }
}

/// Overlay geometry and text settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// Width of the large centered overlay
    pub large_width: u32,
    /// Height of the large centered overlay
    pub large_height: u32,
    /// Side of the small corner indicator
    pub small_size: u32,
    /// Maximum number of screens that get an overlay
    pub max_screens: usize,
    /// Label text color
    #[serde(with = "rgb_hex")]
    pub text_color: Rgb,
    /// Preferred X logical font description for labels
    pub font: String,
    /// Font used when the preferred one is not installed
    pub fallback_font: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            large_width: 192,
            large_height: 108,
            small_size: 20,
            max_screens: DEFAULT_MAX_SCREENS,
            text_color: Rgb(0x7C7C7C),
            font: "-*-helvetica-bold-r-*-*-32-*-*-*-*-*-*-*".to_string(),
            fallback_font: "fixed".to_string(),
        }
    }
}

/// Fill color for each notification state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateColors {
    #[serde(with = "rgb_hex")]
    pub unknown: Rgb,
    #[serde(with = "rgb_hex")]
    pub break_over: Rgb,
    #[serde(with = "rgb_hex", rename = "break")]
    pub on_break: Rgb,
    #[serde(with = "rgb_hex")]
    pub typing: Rgb,
    #[serde(with = "rgb_hex")]
    pub overspeed: Rgb,
    #[serde(with = "rgb_hex")]
    pub break_due: Rgb,
}

impl Default for StateColors {
    fn default() -> Self {
        Self {
            unknown: Rgb::BLACK,
            break_over: Rgb(0x007051),
            on_break: Rgb(0x142F8C),
            typing: Rgb(0x8C4914),
            overspeed: Rgb(0xB70000),
            break_due: Rgb(0xFF6D00),
        }
    }
}

impl StateColors {
    pub fn for_state(&self, state: NotificationState) -> Rgb {
        match state {
            NotificationState::Unknown => self.unknown,
            NotificationState::BreakOver => self.break_over,
            NotificationState::Break => self.on_break,
            NotificationState::Typing => self.typing,
            NotificationState::Overspeed => self.overspeed,
            NotificationState::BreakDue => self.break_due,
        }
    }
}

/// Labels drawn on the large overlays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateLabels {
    pub overspeed: String,
    pub break_due: String,
}

impl Default for StateLabels {
    fn default() -> Self {
        Self {
            overspeed: "OVERSPEED".to_string(),
            break_due: "BREAK".to_string(),
        }
    }
}

/// Colors are written as `"#RRGGBB"` strings
mod rgb_hex {
    use crate::display::Rgb;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(color: &Rgb, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&color.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Rgb, D::Error> {
        let value = String::deserialize(deserializer)?;
        Rgb::try_from(value).map_err(D::Error::custom)
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: AppConfig =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Directories searched for a configuration file, most specific first
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dirs) = directories::ProjectDirs::from("", "", "usage-bar") {
        paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }
    paths.push(Path::new("/etc/usage-bar").join(CONFIG_FILE_NAME));
    paths.push(PathBuf::from(CONFIG_FILE_NAME));
    paths
}

/// Load the first readable file among `candidates`, or the defaults.
///
/// A file that exists but does not parse is skipped with a warning.
pub fn load_first_existing(candidates: &[PathBuf]) -> AppConfig {
    for path in candidates {
        if !path.exists() {
            continue;
        }
        match load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => warn!("Ignoring configuration {:?}: {:#}", path, e),
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Load the configuration named on the command line, or search the
/// standard locations. An explicitly named file must load.
pub fn load_or_default(explicit: Option<&Path>) -> Result<AppConfig> {
    match explicit {
        Some(path) => {
            let config = load_config(path)?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        None => Ok(load_first_existing(&config_search_paths())),
    }
}
