use serde_json::Value;
use sitecraft_common::{Platform, VideoMetadata};

use crate::util::truncate_chars;

pub const UNTITLED: &str = "Sem título";
pub const UNKNOWN_UPLOADER: &str = "Desconhecido";
const DESCRIPTION_MAX: usize = 500;

/// Map a yt-dlp `--dump-json` document to [`VideoMetadata`].
pub fn metadata_from_info(info: &Value, video_url: &str) -> VideoMetadata {
    let text = |key: &str| {
        info.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };

    let thumbnail = info
        .get("thumbnails")
        .and_then(Value::as_array)
        .and_then(|list| {
            list.iter()
                .rev()
                .find_map(|t| t.get("url").and_then(Value::as_str))
        })
        .or_else(|| text("thumbnail"))
        .unwrap_or_default()
        .to_string();

    let uploader = text("uploader")
        .or_else(|| text("channel"))
        .or_else(|| text("creator"))
        .unwrap_or(UNKNOWN_UPLOADER)
        .to_string();

    // yt-dlp reports fractional seconds for some extractors
    let duration = info
        .get("duration")
        .and_then(Value::as_f64)
        .filter(|d| d.is_finite() && *d > 0.0)
        .map_or(0, |d| d as u64);

    VideoMetadata {
        title: text("title").unwrap_or(UNTITLED).to_string(),
        thumbnail,
        uploader,
        duration,
        duration_string: format_duration(duration),
        description: truncate_chars(text("description").unwrap_or_default(), DESCRIPTION_MAX)
            .to_string(),
        view_count: info.get("view_count").and_then(Value::as_u64).unwrap_or(0),
        video_url: video_url.to_string(),
        platform: Platform::from_url(video_url),
    }
}

/// `H:MM:SS` when the video is an hour or longer, else `M:SS`.
pub fn format_duration(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
