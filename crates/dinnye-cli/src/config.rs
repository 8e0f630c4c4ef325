//! CLI configuration – reads/writes `~/.dinnye/config.toml`.
//!
//! ```toml
//! board_id = "AB-12"
//!
//! [gateway]
//! base_url = "http://192.168.4.1"
//! timeout_ms = 1000
//! ```

use dinnye_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Board to bind at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Return the path to `~/.dinnye/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".dinnye").join("config.toml")
}

/// Load the config, falling back to defaults when the file is absent.
/// Environment overrides are applied either way.
pub fn load() -> Result<Config, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Config, String> {
    let mut cfg = if path.exists() {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?
    } else {
        Config::default()
    };
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Apply `DINNYE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `DINNYE_BASE_URL` | `gateway.base_url` |
/// | `DINNYE_BOARD` | `board_id` |
/// | `DINNYE_TIMEOUT_MS` | `gateway.timeout_ms` (ignored unless a number) |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("DINNYE_BASE_URL") {
        cfg.gateway.base_url = v;
    }
    if let Ok(v) = std::env::var("DINNYE_BOARD") {
        cfg.board_id = Some(v);
    }
    if let Ok(v) = std::env::var("DINNYE_TIMEOUT_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.gateway.timeout_ms = ms;
    }
}

/// Save the config, creating `~/.dinnye/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
