use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::scroll::DEFAULT_LEAD_ROWS;

/// Overrides `api.base_url`.
pub const ENV_API_URL: &str = "READLOG_API_URL";
/// Overrides `api.catalog_url`.
pub const ENV_CATALOG_URL: &str = "READLOG_CATALOG_URL";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tui: TuiConfig,
    pub api: ApiConfig,
    pub data: DataConfig,
}

/// TUI-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Tick interval in milliseconds for the event loop.
    pub tick_rate_ms: u64,
    /// Rows below the viewport at which the next page is requested.
    pub scroll_lead_rows: usize,
}

/// Remote endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Collection server (`/api/books`, `/api/search`).
    pub base_url: String,
    /// Catalog used for work summaries.
    pub catalog_url: String,
    /// Cover image host.
    pub covers_url: String,
}

/// Data directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Override the default data directory.
    pub data_dir: Option<PathBuf>,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 50,
            scroll_lead_rows: DEFAULT_LEAD_ROWS,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            catalog_url: "https://openlibrary.org".to_string(),
            covers_url: "https://covers.openlibrary.org".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/readlog/config.toml`, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let mut config = Self::load_from(&Self::config_path());
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Returns `Default` if the file is missing or unparseable.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config at {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v: &String| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_API_URL) {
            log::debug!("{ENV_API_URL} overrides api.base_url");
            self.api.base_url = url;
        }
        if let Some(url) = non_empty(ENV_CATALOG_URL) {
            log::debug!("{ENV_CATALOG_URL} overrides api.catalog_url");
            self.api.catalog_url = url;
        }
    }

    /// Resolved data directory (override or XDG default).
    pub fn data_dir(&self) -> PathBuf {
        self.data.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("readlog"))
                .unwrap_or_else(|| PathBuf::from("data"))
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("readlog").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tui.tick_rate_ms, 50);
        assert_eq!(config.tui.scroll_lead_rows, DEFAULT_LEAD_ROWS);
        assert_eq!(config.api.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.api.catalog_url, "https://openlibrary.org");
        assert!(config.data.data_dir.is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.toml"));
        assert_eq!(config.tui.tick_rate_ms, 50);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://books.local:9000\"\n\n[tui]\nscroll_lead_rows = 4").unwrap();

        let config = AppConfig::load_from(file.path());
        assert_eq!(config.api.base_url, "http://books.local:9000");
        assert_eq!(config.api.covers_url, "https://covers.openlibrary.org");
        assert_eq!(config.tui.scroll_lead_rows, 4);
        assert_eq!(config.tui.tick_rate_ms, 50);
    }

    #[test]
    fn test_load_unparseable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api\nbase_url = ").unwrap();
        let config = AppConfig::load_from(file.path());
        assert_eq!(config.api.base_url, ApiConfig::default().base_url);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "http://override:1"),
            (ENV_CATALOG_URL, "  "),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://override:1");
        // Blank values are ignored.
        assert_eq!(config.api.catalog_url, "https://openlibrary.org");
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = AppConfig::default();
        config.data.data_dir = Some(PathBuf::from("/tmp/custom"));
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/custom"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/custom/logs"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.tui.tick_rate_ms, config.tui.tick_rate_ms);
        assert_eq!(deserialized.api.base_url, config.api.base_url);
    }
}
