//! Video metadata lookup and downloads through yt-dlp.

mod media;
mod metadata;
mod ytdlp;

pub use media::{CATALOG_FILE, LocalMediaStore, MediaCatalog, MediaEntry, MediaStore};
pub use metadata::{UNKNOWN_UPLOADER, UNTITLED, format_duration, metadata_from_info};
pub use ytdlp::{FORMAT_SELECTOR, YtDlp, classify_stderr};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;
use sitecraft_common::{DownloadResult, VideoMetadata};

use crate::config::SitecraftConfig;
use crate::errors::VideoError;
use crate::util::sanitize_filename;

pub const DOWNLOAD_PREFIX: &str = "video-downloads";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataRequest {
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub media_id: Option<String>,
}

/// Storage key for a downloaded file: `video-downloads/YYYY/MM/DD/<name>`.
pub fn storage_key(date: NaiveDate, filename: &str) -> String {
    format!(
        "{}/{:04}/{:02}/{:02}/{}",
        DOWNLOAD_PREFIX,
        date.year(),
        date.month(),
        date.day(),
        filename
    )
}

pub struct VideoTools {
    ytdlp: YtDlp,
    media: Arc<dyn MediaStore>,
    catalog_path: PathBuf,
}

impl VideoTools {
    pub fn new(ytdlp: YtDlp, media: Arc<dyn MediaStore>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp,
            media,
            catalog_path: catalog_path.into(),
        }
    }

    /// Local media store under the configured storage dir.
    pub fn from_config(config: &SitecraftConfig) -> Self {
        let media_dir = config.media_dir();
        let video = &config.toml.video;
        Self::new(
            YtDlp::new(config.toml.ytdlp_cmd(), video.timeout()),
            Arc::new(LocalMediaStore::new(media_dir.clone(), video.public_base_url.clone())),
            media_dir.join(CATALOG_FILE),
        )
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub async fn metadata(&self, request: &MetadataRequest) -> Result<VideoMetadata, VideoError> {
        let url = non_blank(request.video_url.as_deref()).ok_or(VideoError::MissingInput)?;
        let url = web_url(url)?;
        let stdout = self.ytdlp.dump_json(url).await?;
        // Playlists print one document per line; the first entry is the video
        let first = stdout.lines().find(|l| !l.trim().is_empty()).unwrap_or_default();
        let info: serde_json::Value = serde_json::from_str(first).map_err(VideoError::Parse)?;
        let meta = metadata_from_info(&info, url);
        tracing::info!(title = %meta.title, platform = ?meta.platform, "video metadata");
        Ok(meta)
    }

    pub async fn download(&self, request: &DownloadRequest) -> Result<DownloadResult, VideoError> {
        let url = self.resolve_url(request)?;
        let workdir = tempfile::tempdir()?;
        let template = workdir.path().join("%(title)s.%(ext)s");
        self.ytdlp
            .download(&url, &template.to_string_lossy())
            .await?;

        let downloaded = first_file(workdir.path())?.ok_or(VideoError::NoOutput)?;
        let raw_name = downloaded
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let filename = sanitize_filename(&raw_name);
        let bytes = tokio::fs::read(&downloaded).await?;
        let key = storage_key(Local::now().date_naive(), &filename);
        let download_url = self.media.put(&key, &bytes).await?;

        tracing::info!(%filename, size = bytes.len(), "video downloaded");
        Ok(DownloadResult {
            download_url,
            filename,
            size: bytes.len() as u64,
        })
    }

    fn resolve_url(&self, request: &DownloadRequest) -> Result<String, VideoError> {
        if let Some(url) = non_blank(request.video_url.as_deref()) {
            return web_url(url).map(str::to_string);
        }
        let Some(media_id) = non_blank(request.media_id.as_deref()) else {
            return Err(VideoError::MissingInput);
        };
        let catalog = MediaCatalog::load(&self.catalog_path)?;
        let url = catalog
            .resolve(media_id)
            .ok_or_else(|| VideoError::MediaNotFound {
                media_id: media_id.to_string(),
            })?;
        web_url(url).map(str::to_string)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Only http(s) URLs reach yt-dlp.
fn web_url(url: &str) -> Result<&str, VideoError> {
    let lower = url.to_ascii_lowercase();
    let has_host = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/'));
    if has_host {
        Ok(url)
    } else {
        Err(VideoError::InvalidUrl {
            url: url.to_string(),
        })
    }
}

/// First regular file in `dir`, by name.
fn first_file(dir: &Path) -> Result<Option<PathBuf>, VideoError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Ok(files.into_iter().next())
}
