//! Cache configuration.
//!
//! Controls the freshness window and start-up preload via `folio.toml`.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 5 * 60;

/// Collection cache configuration from `folio.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum age of a populated entry before it must be re-fetched.
    pub freshness_window_seconds: u64,
    /// Warm all collections once the listener is bound.
    pub preload_on_startup: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            freshness_window_seconds: DEFAULT_FRESHNESS_WINDOW_SECS,
            preload_on_startup: true,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            freshness_window_seconds: settings.freshness_window.as_secs(),
            preload_on_startup: settings.preload_on_startup,
        }
    }
}

impl CacheConfig {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.freshness_window(), Duration::from_secs(300));
        assert!(config.preload_on_startup);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: CacheConfig =
            serde_json::from_str(r#"{ "preload_on_startup": false }"#).expect("valid config");
        assert_eq!(config.freshness_window_seconds, 300);
        assert!(!config.preload_on_startup);
    }
}
