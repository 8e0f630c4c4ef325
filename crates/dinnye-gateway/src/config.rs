//! Gateway timing and addressing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration bundle for [`Gateway`][crate::Gateway].
///
/// Every field has a default, so an empty TOML table or JSON object
/// deserializes to [`GatewayConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Board server base URL; board id and command path are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound for every single GET.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Wait between the sample trigger and the response fetch.
    #[serde(default = "default_settling_delay_ms")]
    pub settling_delay_ms: u64,

    /// How long a successful reading is served without touching the board.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Serialise whole trigger/fetch exchanges across channels so two
    /// channels never race on the board's single sample register.
    #[serde(default)]
    pub exclusive_exchange: bool,
}

fn default_base_url() -> String {
    "http://192.168.4.1".to_string()
}
fn default_timeout_ms() -> u64 {
    1000
}
fn default_settling_delay_ms() -> u64 {
    200
}
fn default_cache_ttl_ms() -> u64 {
    100
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            settling_delay_ms: default_settling_delay_ms(),
            cache_ttl_ms: default_cache_ttl_ms(),
            exclusive_exchange: false,
        }
    }
}

impl GatewayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settling_delay(&self) -> Duration {
        Duration::from_millis(self.settling_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_board_protocol() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.timeout(), Duration::from_secs(1));
        assert_eq!(cfg.settling_delay(), Duration::from_millis(200));
        assert_eq!(cfg.cache_ttl(), Duration::from_millis(100));
        assert!(!cfg.exclusive_exchange);
    }

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let cfg: GatewayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, GatewayConfig::default());
    }

    #[test]
    fn partial_object_keeps_other_defaults() {
        let cfg: GatewayConfig =
            serde_json::from_str(r#"{"base_url":"http://board.local","cache_ttl_ms":250}"#).unwrap();
        assert_eq!(cfg.base_url, "http://board.local");
        assert_eq!(cfg.cache_ttl(), Duration::from_millis(250));
        assert_eq!(cfg.timeout_ms, 1000);
    }
}
