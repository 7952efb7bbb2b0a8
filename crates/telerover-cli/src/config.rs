//! Server configuration – reads/writes `~/.telerover/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use telerover_hal::RoverLayout;
use telerover_middleware::DEFAULT_CAPACITY;
use telerover_server::{DEFAULT_BIND_ADDRESS, DEFAULT_PORT};

/// Persisted server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Interface the WebSocket server binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Frames buffered per channel before a slow peer starts missing them.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Peripherals announced to Control on every connect.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub announce_peripherals: Vec<String>,

    /// Rover layout; the stock rover when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rover: Option<RoverLayout>,
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_channel_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            channel_capacity: default_channel_capacity(),
            announce_peripherals: Vec::new(),
            rover: None,
        }
    }
}

impl Config {
    /// The configured layout, or the stock rover.
    pub fn layout(&self) -> RoverLayout {
        self.rover.clone().unwrap_or_default()
    }
}

/// Return the config path: `TELEROVER_CONFIG` if set, else
/// `~/.telerover/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("TELEROVER_CONFIG") {
        return PathBuf::from(path);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".telerover").join("config.toml")
}

/// Load the config from `path`. Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `TELEROVER_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `TELEROVER_BIND_ADDRESS` | `bind_address` |
/// | `TELEROVER_PORT` | `port` |
///
/// Unparsable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TELEROVER_BIND_ADDRESS") {
        cfg.bind_address = v;
    }
    if let Some(v) = lookup("TELEROVER_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.port = port;
    }
}

/// Save the config to `path`, creating parent directories.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
