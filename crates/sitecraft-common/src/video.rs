use serde::{Deserialize, Serialize};

/// Source platform, derived from the video URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    Other,
}

impl Platform {
    pub fn from_url(url: &str) -> Self {
        if url.contains("youtube") || url.contains("youtu.be") {
            Platform::Youtube
        } else if url.contains("instagram") {
            Platform::Instagram
        } else {
            Platform::Other
        }
    }
}

/// Metadata returned for a video URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail: String,
    pub uploader: String,
    /// Whole seconds.
    pub duration: u64,
    pub duration_string: String,
    pub description: String,
    pub view_count: u64,
    pub video_url: String,
    pub platform: Platform,
}

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub download_url: String,
    pub filename: String,
    pub size: u64,
}
