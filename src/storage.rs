use anyhow::{anyhow, Context, Result};
use std::path::{Component, Path, PathBuf};
use tracing::info;

pub const STR_LESSON: &str = "str_lesson";

const URL_SCHEME: &str = "file://";

/// Object storage rooted at a directory. Objects are addressed by
/// slash-separated keys and handed out as `file://` download URLs.
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create storage root {}", root.display()))?;
        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve storage root {}", root.display()))?;
        Ok(Self { root })
    }

    /// Key for a lesson attachment: `str_lesson/{timestamp}_{filename}`.
    pub fn lesson_key(timestamp: i64, filename: &str) -> String {
        format!("{}/{}_{}", STR_LESSON, timestamp, sanitize_filename(filename))
    }

    /// Stores `bytes` under `key` and returns its download URL.
    pub fn upload(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to upload object {}", key))?;
        info!(key, size = bytes.len(), "uploaded object");
        Ok(self.download_url(key))
    }

    pub fn download_url(&self, key: &str) -> String {
        format!("{}{}/{}", URL_SCHEME, self.root.display(), key)
    }

    /// Reads back the object a download URL points to.
    pub fn download(&self, url: &str) -> Result<Vec<u8>> {
        let path = url
            .strip_prefix(URL_SCHEME)
            .ok_or_else(|| anyhow!("Not a storage URL: {}", url))?;
        let key = Path::new(path)
            .strip_prefix(&self.root)
            .map_err(|_| anyhow!("URL is outside this storage root: {}", url))?;
        let key = key.to_string_lossy().replace('\\', "/");
        let path = self.resolve(&key)?;
        std::fs::read(&path).with_context(|| format!("Failed to download object {}", key))
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(anyhow!("Invalid object key: {}", key));
        }
        Ok(self.root.join(relative))
    }
}

/// Keeps the final path segment and replaces separators so a client-chosen
/// name cannot address another object.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "file".to_string()
    } else {
        cleaned
    }
}
