use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::theme::Theme;

/// Looked up in the working directory, first match wins.
pub const CONFIG_FILES: &[&str] = &["chatsvg.toml", "chatsvg.yaml", "chatsvg.yml"];

const LINE_WIDTH: usize = 65;
const API_BASE: &str = "https://discord.com/api/v10";
const PAGE_SIZE: u32 = 100;
const MAX_ATTEMPTS: u32 = 2;
const CACHE_CAPACITY: usize = 256;
const CACHE_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Wrap width in visible characters.
    #[serde(default = "default_line_width")]
    pub line_width: usize,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Messages requested per history page (the API caps this at 100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Render attempts per message before it is reported as failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub image_cache: ImageCacheConfig,
    #[serde(default)]
    pub theme: ThemeSetting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageCacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

/// Either the name of a built-in theme or a full/partial theme table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThemeSetting {
    Named(String),
    Custom(Theme),
}

fn default_line_width() -> usize {
    LINE_WIDTH
}
fn default_api_base() -> String {
    API_BASE.to_string()
}
fn default_page_size() -> u32 {
    PAGE_SIZE
}
fn default_max_attempts() -> u32 {
    MAX_ATTEMPTS
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_cache_capacity() -> usize {
    CACHE_CAPACITY
}
fn default_cache_ttl_secs() -> u64 {
    CACHE_TTL_SECS
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            capacity: CACHE_CAPACITY,
            ttl_secs: CACHE_TTL_SECS,
        }
    }
}

impl ImageCacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ThemeSetting {
    fn default() -> Self {
        ThemeSetting::Custom(Theme::default())
    }
}

impl ThemeSetting {
    pub fn resolve(&self) -> Result<Theme, String> {
        match self {
            ThemeSetting::Named(name) => Theme::from_builtin(name),
            ThemeSetting::Custom(theme) => Ok(theme.clone()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            line_width: LINE_WIDTH,
            api_base: API_BASE.to_string(),
            page_size: PAGE_SIZE,
            max_attempts: MAX_ATTEMPTS,
            output_dir: default_output_dir(),
            image_cache: ImageCacheConfig::default(),
            theme: ThemeSetting::default(),
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse TOML config: {}", e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| format!("Failed to parse YAML config: {}", e))
    }

    /// Loads the first config file found in `dir`, or defaults when none
    /// exists.
    pub fn load(dir: &Path) -> Result<(Self, Option<PathBuf>), String> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
            let config = if name.ends_with(".toml") {
                Self::from_toml(&content)?
            } else {
                Self::from_yaml(&content)?
            };
            config.validate()?;
            return Ok((config, Some(path)));
        }
        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.line_width == 0 {
            return Err("line_width must be at least 1".to_string());
        }
        if !(1..=100).contains(&self.page_size) {
            return Err(format!("page_size must be 1..=100, got {}", self.page_size));
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.image_cache.capacity == 0 {
            return Err("image_cache.capacity must be at least 1".to_string());
        }
        self.theme.resolve().map(|_| ())
    }
}
