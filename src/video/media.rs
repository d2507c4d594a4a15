//! Local media storage and the media catalog used to resolve `media_id`s.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::VideoError;

pub const CATALOG_FILE: &str = "catalog.json";

/// Where downloaded media ends up.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store `bytes` at `key` (a relative, `/`-separated path) and return
    /// the URL it can be fetched from.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, VideoError>;
}

/// Files under a local directory, exposed below `public_base_url`.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn url_for(&self, key: &str, path: &Path) -> String {
        if self.public_base_url.starts_with("file://") {
            format!("file://{}", path.display())
        } else {
            format!("{}/{}", self.public_base_url.trim_end_matches('/'), key)
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, VideoError> {
        if key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(VideoError::Store {
                path: key.to_string(),
                message: "invalid storage key".to_string(),
            });
        }
        let path = self.root.join(key);
        let store_err = |e: std::io::Error| VideoError::Store {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(store_err)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(store_err)?;
        tracing::info!(key, size = bytes.len(), "stored media");
        Ok(self.url_for(key, &path))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// `media_id` → source URL, kept as JSON next to the stored media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCatalog {
    #[serde(flatten)]
    entries: BTreeMap<String, MediaEntry>,
}

impl MediaCatalog {
    /// Load the catalog; a missing file is an empty catalog.
    pub fn load(path: &Path) -> Result<Self, VideoError> {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).map_err(VideoError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(VideoError::Io(e)),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), VideoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(VideoError::Parse)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn insert(&mut self, media_id: impl Into<String>, entry: MediaEntry) {
        self.entries.insert(media_id.into(), entry);
    }

    pub fn resolve(&self, media_id: &str) -> Option<&str> {
        self.entries.get(media_id).map(|e| e.video_url.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn local_store_writes_nested_key() {
        let dir = tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path(), "https://media.example.com/");
        let url = store
            .put("video-downloads/2026/10/19/a.mp4", b"bytes")
            .await
            .unwrap();
        assert_eq!(url, "https://media.example.com/video-downloads/2026/10/19/a.mp4");
        let written = std::fs::read(dir.path().join("video-downloads/2026/10/19/a.mp4")).unwrap();
        assert_eq!(written, b"bytes");
    }

    #[tokio::test]
    async fn file_base_url_points_at_disk() {
        let dir = tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path(), "file://");
        let url = store.put("a.mp4", b"x").await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("a.mp4"));
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path(), "file://");
        assert!(matches!(
            store.put("../escape.mp4", b"x").await,
            Err(VideoError::Store { .. })
        ));
    }

    #[test]
    fn catalog_roundtrip_and_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CATALOG_FILE);
        assert!(MediaCatalog::load(&path).unwrap().is_empty());

        let mut catalog = MediaCatalog::default();
        catalog.insert(
            "m1",
            MediaEntry {
                video_url: "https://youtu.be/abc".into(),
                title: None,
            },
        );
        catalog.save(&path).unwrap();

        let loaded = MediaCatalog::load(&path).unwrap();
        assert_eq!(loaded.resolve("m1"), Some("https://youtu.be/abc"));
        assert_eq!(loaded.resolve("m2"), None);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""m1""#));
    }
}
