//! yt-dlp child process runner.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::errors::{DownloaderFailure, VideoError, VideoOp};

pub const FORMAT_SELECTOR: &str = "best[ext=mp4]/best[height<=720]/best";

#[derive(Debug, Clone)]
pub struct YtDlp {
    cmd: String,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(cmd: impl Into<String>, timeout: Duration) -> Self {
        Self {
            cmd: cmd.into(),
            timeout,
        }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    /// `--dump-json` for `url`; returns raw stdout.
    pub async fn dump_json(&self, url: &str) -> Result<String, VideoError> {
        self.run(
            VideoOp::Metadata,
            &["--dump-json", "--no-warnings", "--quiet", "--", url],
        )
        .await
    }

    /// Download `url` using `output_template` (an `-o` template).
    pub async fn download(&self, url: &str, output_template: &str) -> Result<(), VideoError> {
        self.run(
            VideoOp::Download,
            &[
                "-f",
                FORMAT_SELECTOR,
                "--no-warnings",
                "--quiet",
                "-o",
                output_template,
                "--",
                url,
            ],
        )
        .await
        .map(|_| ())
    }

    async fn run(&self, op: VideoOp, args: &[&str]) -> Result<String, VideoError> {
        tracing::info!(cmd = %self.cmd, ?op, timeout_secs = self.timeout.as_secs(), "running yt-dlp");

        let child = Command::new(&self.cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| VideoError::Spawn {
                cmd: self.cmd.clone(),
                source,
            })?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(cmd = %self.cmd, ?op, "yt-dlp timed out");
                return Err(VideoError::Downloader {
                    op,
                    kind: DownloaderFailure::Timeout,
                    detail: format!("no result after {}s", self.timeout.as_secs()),
                });
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let kind = classify_stderr(&stderr);
            tracing::warn!(
                ?op,
                ?kind,
                exit_code = output.status.code().unwrap_or(-1),
                stderr = %stderr.trim(),
                "yt-dlp failed"
            );
            return Err(VideoError::Downloader {
                op,
                kind,
                detail: stderr.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Map yt-dlp's error text to a failure kind.
pub fn classify_stderr(stderr: &str) -> DownloaderFailure {
    let lower = stderr.to_lowercase();
    if stderr.contains("Private video") || stderr.contains("Sign in") {
        DownloaderFailure::Private
    } else if lower.contains("unavailable") {
        DownloaderFailure::Unavailable
    } else if lower.contains("region") || lower.contains("country") {
        DownloaderFailure::RegionLocked
    } else if stderr.contains("HTTP Error 401") || stderr.contains("HTTP Error 403") {
        DownloaderFailure::Unauthorized
    } else {
        DownloaderFailure::Other
    }
}
