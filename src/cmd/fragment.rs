//! Fragment and selection commands: `sitecraft fragment`, `sitecraft select`.

use anyhow::{Context, Result, bail};
use std::path::Path;

use sitecraft::config::SitecraftConfig;
use sitecraft::preview::{ClickAction, ClickTarget, Preview};
use sitecraft::store::ProjectStore;

use crate::FragmentCommands;

pub fn cmd_fragment(project_dir: &Path, project_id: &str, op: FragmentCommands) -> Result<()> {
    let config = SitecraftConfig::new(project_dir.to_path_buf())?;
    let store = ProjectStore::new(config.projects_dir());
    let mut project = store.load(project_id)?;

    match op {
        FragmentCommands::Rm { fragment } => {
            let removed = project
                .page
                .remove_fragment(&fragment)
                .with_context(|| format!("Fragment {} not found in {}", fragment, project_id))?;
            store.save(&mut project)?;
            println!(
                "Removed fragment {} ({}), revision {}",
                removed.id, removed.name, project.revision
            );
        }
        FragmentCommands::Move { fragment, to } => {
            let from = project
                .page
                .fragments()
                .iter()
                .position(|f| f.id == fragment)
                .with_context(|| format!("Fragment {} not found in {}", fragment, project_id))?;
            let len = project.page.len();
            if to == 0 || !project.page.move_fragment(from, to - 1) {
                bail!("Position {} is out of range (1..={})", to, len);
            }
            store.save(&mut project)?;
            println!(
                "Moved fragment {} to position {}, revision {}",
                fragment, to, project.revision
            );
        }
    }
    Ok(())
}

pub fn cmd_select(project_dir: &Path, project_id: &str, data_id: &str) -> Result<()> {
    let config = SitecraftConfig::new(project_dir.to_path_buf())?;
    let store = ProjectStore::new(config.projects_dir());
    let project = store.load(project_id)?;

    let mut preview = Preview::new(project.page, config.toml.preview.lang.clone());
    let action = preview.click(&ClickTarget::DataId(data_id.to_string()));
    if action == ClickAction::Cleared {
        bail!("Element {} is not editable", data_id);
    }
    println!("{}", serde_json::to_string_pretty(&action)?);
    Ok(())
}
