//! HTTP service command: `sitecraft serve`.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use sitecraft::config::SitecraftConfig;
use sitecraft::context::AppContext;
use sitecraft::server::{ServerConfig, start_server};

pub async fn cmd_serve(project_dir: &Path, port: Option<u16>, dev: bool) -> Result<()> {
    let config = SitecraftConfig::with_cli_args(project_dir.to_path_buf(), port)?;
    for warning in config.validate() {
        tracing::warn!(%warning, "configuration");
    }
    let server_config = ServerConfig {
        port: config.port(),
        dev_mode: dev,
    };
    let ctx = Arc::new(AppContext::new(config)?);
    start_server(ctx, server_config).await
}
