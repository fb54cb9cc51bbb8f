//! Application configuration
//!
//! Built-in defaults live in `config/default.toml`. A user file in the
//! platform config directory replaces them when present, and credentials
//! can be supplied through the environment instead of the file.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

pub const ENV_YOUTUBE_KEYS: &str = "NEONTUNES_YOUTUBE_KEYS";
pub const ENV_FIREBASE_API_KEY: &str = "NEONTUNES_FIREBASE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub firebase: FirebaseConfig,
    pub player: PlayerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub region: String,
    pub search_limit: u32,
    pub trending_limit: u32,
    pub next_search_limit: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            region: "US".to_string(),
            search_limit: 20,
            trending_limit: 10,
            next_search_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub database_url: String,
    pub identity_url: String,
    pub token_url: String,
}

impl FirebaseConfig {
    /// Cloud sync needs both an API key and a database.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.database_url.is_empty()
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            database_url: String::new(),
            identity_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
            token_url: "https://securetoken.googleapis.com/v1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub mpv_path: String,
    pub progress_interval_ms: u64,
    pub volume: u8,
    pub seek_step_secs: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            mpv_path: "mpv".to_string(),
            progress_interval_ms: 500,
            volume: 50,
            seek_step_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load config: user file (if exists) over built-in defaults, then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path(), |name| std::env::var(name).ok())
    }

    fn load_from(user_path: &Path, var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config: AppConfig = if user_path.exists() {
            let user_str = std::fs::read_to_string(user_path)?;
            toml::from_str(&user_str)?
        } else {
            toml::from_str(DEFAULT_CONFIG)?
        };
        config.apply_env(var);
        Ok(config)
    }

    /// Write the commented built-in defaults to the user config path, unless
    /// a file is already there.
    pub fn write_default_file() -> Result<Option<PathBuf>, ConfigError> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(None);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, DEFAULT_CONFIG)?;
        Ok(Some(path))
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(keys) = var(ENV_YOUTUBE_KEYS) {
            let keys: Vec<String> = keys
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
            if !keys.is_empty() {
                self.catalog.api_keys = keys;
            }
        }
        if let Some(key) = var(ENV_FIREBASE_API_KEY).filter(|k| !k.is_empty()) {
            self.firebase.api_key = key;
        }
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory for the local store and logs.
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(|| {
            Self::project_dirs()
                .map(|d| d.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".neontunes"))
        })
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "neontunes")
    }
}
