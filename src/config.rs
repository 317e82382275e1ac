use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for the demo client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL used when the field is empty. Empty means "no backend configured".
    pub default_base_url: String,
    /// Per-request timeout; `None` waits for the backend indefinitely.
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the persisted key-value slot
    pub path: PathBuf,
    /// Key under which the normalized base URL is stored
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Drive the secondary "generating" indicator while a query is pending
    pub hero_surface: bool,
    /// Clear the query after a failed submission instead of keeping it for retry
    pub clear_query_on_failure: bool,
    /// Preset prompts offered to the user
    pub examples: Vec<String>,
}

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_STORAGE_KEY: &str = "apiBaseUrl";

fn default_examples() -> Vec<String> {
    vec![
        "best vegan tacos".to_string(),
        "a quick high-protein breakfast".to_string(),
        "something warm for a rainy evening".to_string(),
    ]
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            default_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_seconds: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".recommend-demo").join("storage.json"),
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            hero_surface: true,
            clear_query_on_failure: false,
            examples: default_examples(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            storage: StorageConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        for path in ["../.env", ".env"] {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                break;
            }
        }

        let config_path =
            env::var("RECOMMEND_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(Path::new(&config_path));
        config.apply_env_overrides();

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Read a YAML config file, falling back to defaults on any problem
    pub fn from_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::warn!("Config file not found at {} - using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // An explicitly empty value is meaningful here: it unsets the default backend
        if let Ok(url) = env::var("RECOMMEND_BASE_URL") {
            self.backend.default_base_url = url;
        }
        if let Ok(timeout) = env::var("RECOMMEND_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(0) => self.backend.request_timeout_seconds = None,
                Ok(secs) => self.backend.request_timeout_seconds = Some(secs),
                Err(_) => tracing::warn!("Ignoring invalid RECOMMEND_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        if let Ok(path) = env::var("RECOMMEND_STORE_PATH") {
            self.storage.path = PathBuf::from(path);
        }
        if let Ok(key) = env::var("RECOMMEND_STORE_KEY") {
            self.storage.key = key;
        }

        if let Ok(flag) = env::var("RECOMMEND_HERO_SURFACE") {
            if let Some(v) = parse_flag(&flag) {
                self.ui.hero_surface = v;
            }
        }
        if let Ok(flag) = env::var("RECOMMEND_CLEAR_QUERY_ON_FAILURE") {
            if let Some(v) = parse_flag(&flag) {
                self.ui.clear_query_on_failure = v;
            }
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.storage.key.trim().is_empty() {
            return Err("storage.key cannot be empty".into());
        }

        let base = self.backend.default_base_url.trim();
        if !base.is_empty() && !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(format!(
                "backend.default_base_url should start with http:// or https:// (got {base})"
            )
            .into());
        }

        if self.backend.request_timeout_seconds == Some(0) {
            return Err("backend.request_timeout_seconds must be positive when set".into());
        }

        Ok(())
    }

    /// Get the request timeout as Duration
    pub fn request_timeout(&self) -> Option<Duration> {
        self.backend
            .request_timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!("Ignoring unrecognised boolean flag value: {}", other);
            None
        }
    }
}
