use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const KEY_CONSENT: &str = "privacy_consent_status";
pub const KEY_APPLY_NAME: &str = "temp_apply_name";
pub const KEY_SESSION_UID: &str = "session_uid";

/// Client-side key/value storage that never reaches the store. Each write is
/// flushed to a JSON file immediately.
pub struct LocalStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl LocalStore {
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read local storage: {}", path.display()))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)
                    .with_context(|| format!("Corrupt local storage file: {}", path.display()))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write local storage: {}", self.path.display()))?;
        debug!(path = %self.path.display(), "flushed local storage");
        Ok(())
    }
}
