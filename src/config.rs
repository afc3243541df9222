use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_ORGANIZATION: &str = "나미나라";
pub const DEFAULT_PHOTO_MAX_WIDTH: u32 = 300;
pub const DEFAULT_PHOTO_QUALITY: u8 = 70;

/// Runtime configuration. Every path field is optional in the file and
/// falls back to the platform data directory.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub storage_dir: Option<PathBuf>,
    pub local_store: Option<PathBuf>,
    pub organization: Option<String>,
    pub photo_max_width: Option<u32>,
    pub photo_quality: Option<u8>,
}

impl Config {
    /// Loads `<config dir>/config.toml` if present, then applies `RECRUIT_*`
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "recruit")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RECRUIT_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("RECRUIT_DB") {
            self.database = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("RECRUIT_STORAGE_DIR") {
            self.storage_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("RECRUIT_LOCAL_STORE") {
            self.local_store = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("RECRUIT_ORGANIZATION") {
            self.organization = Some(v);
        }
        if let Some(v) = lookup("RECRUIT_PHOTO_MAX_WIDTH") {
            match v.parse() {
                Ok(width) => self.photo_max_width = Some(width),
                Err(e) => warn!("Invalid RECRUIT_PHOTO_MAX_WIDTH value '{v}': {e}"),
            }
        }
        if let Some(v) = lookup("RECRUIT_PHOTO_QUALITY") {
            match v.parse() {
                Ok(quality) => self.photo_quality = Some(quality),
                Err(e) => warn!("Invalid RECRUIT_PHOTO_QUALITY value '{v}': {e}"),
            }
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "recruit") {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from(".")
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| self.data_dir().join("recruit.db"))
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("storage"))
    }

    pub fn local_store_path(&self) -> PathBuf {
        self.local_store
            .clone()
            .unwrap_or_else(|| self.data_dir().join("local.json"))
    }

    pub fn organization(&self) -> &str {
        self.organization.as_deref().unwrap_or(DEFAULT_ORGANIZATION)
    }

    pub fn photo_max_width(&self) -> u32 {
        self.photo_max_width.unwrap_or(DEFAULT_PHOTO_MAX_WIDTH).max(1)
    }

    pub fn photo_quality(&self) -> u8 {
        self.photo_quality.unwrap_or(DEFAULT_PHOTO_QUALITY).clamp(1, 100)
    }
}
