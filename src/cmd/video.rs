//! Video commands: `sitecraft video metadata|download`.

use anyhow::Result;
use std::path::Path;

use sitecraft::config::SitecraftConfig;
use sitecraft::errors::VideoError;
use sitecraft::video::{DownloadRequest, MetadataRequest, VideoTools};

use crate::VideoCommands;

pub async fn cmd_video(project_dir: &Path, command: VideoCommands) -> Result<()> {
    let config = SitecraftConfig::new(project_dir.to_path_buf())?;
    let tools = VideoTools::from_config(&config);

    let result = match command {
        VideoCommands::Metadata { url } => tools
            .metadata(&MetadataRequest {
                video_url: Some(url),
            })
            .await
            .map(|meta| serde_json::to_string_pretty(&meta)),
        VideoCommands::Download { url, media_id } => tools
            .download(&DownloadRequest {
                video_url: url,
                media_id,
            })
            .await
            .map(|done| serde_json::to_string_pretty(&done)),
    };

    match result {
        Ok(json) => println!("{}", json?),
        Err(e) => return Err(user_facing(e)),
    }
    Ok(())
}

fn user_facing(e: VideoError) -> anyhow::Error {
    tracing::debug!(error = %e, "video command failed");
    anyhow::anyhow!(e.user_message())
}
