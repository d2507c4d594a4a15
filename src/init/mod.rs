//! `sitecraft init`: create the `.sitecraft/` state directory.
//!
//! ```text
//! .sitecraft/
//! ├── sitecraft.toml   # Configuration (defaults written on first init)
//! ├── projects/        # One JSON document per project
//! ├── logs/            # Daily rolling log files
//! └── media/           # Local media store (downloaded videos)
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{CONFIG_FILE, STATE_DIR, SitecraftToml};

/// Result of initializing a sitecraft workspace.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the .sitecraft directory
    pub state_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
}

/// Initialize the state directory in `project_dir`.
///
/// Re-running completes a partial structure and never overwrites an existing
/// configuration file.
pub fn init_workspace(project_dir: &Path) -> Result<InitResult> {
    let state_dir = project_dir.join(STATE_DIR);
    let created = !state_dir.exists();

    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("Failed to create directory: {}", state_dir.display()))?;
    ensure_directory_structure(&state_dir)?;

    tracing::info!(dir = %state_dir.display(), created, "initialized workspace");
    Ok(InitResult { state_dir, created })
}

fn ensure_directory_structure(state_dir: &Path) -> Result<()> {
    for sub in ["projects", "logs", "media"] {
        let dir = state_dir.join(sub);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {} directory: {}", sub, dir.display()))?;
    }

    let config_file = state_dir.join(CONFIG_FILE);
    if !config_file.exists() {
        SitecraftToml::default()
            .save(&config_file)
            .with_context(|| format!("Failed to write {}", config_file.display()))?;
    }
    Ok(())
}

/// Check if a workspace is already initialized.
pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(STATE_DIR).join(CONFIG_FILE).exists()
}
