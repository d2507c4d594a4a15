//! Page editing commands: `sitecraft patch`, `sitecraft preview`, `sitecraft crop`.

use anyhow::{Context, Result};
use std::path::Path;

use sitecraft::config::SitecraftConfig;
use sitecraft::patch::{self, Patch};
use sitecraft::preview::render_document;
use sitecraft::region;
use sitecraft::store::ProjectStore;
use sitecraft_common::SelectionRegion;

use crate::PatchCommands;

pub fn cmd_patch(project_dir: &Path, project_id: &str, op: PatchCommands) -> Result<()> {
    let config = SitecraftConfig::new(project_dir.to_path_buf())?;
    let store = ProjectStore::new(config.projects_dir());
    let mut project = store.load(project_id)?;

    let patch = match op {
        PatchCommands::Replace { data_id, html } => Patch::Replace { data_id, html },
        PatchCommands::Remove { data_id } => Patch::Remove { data_id },
        PatchCommands::SetImage { data_id, src } => Patch::SetImage { data_id, src },
    };
    let outcome = patch::apply(&mut project.page, &patch)?;
    store.save(&mut project)?;

    println!(
        "Patched fragment {} (position {}), revision {}",
        outcome.fragment_id,
        outcome.fragment_index + 1,
        project.revision
    );
    Ok(())
}

pub fn cmd_preview(project_dir: &Path, project_id: &str, out: Option<&Path>) -> Result<()> {
    let config = SitecraftConfig::new(project_dir.to_path_buf())?;
    let store = ProjectStore::new(config.projects_dir());
    let project = store.load(project_id)?;
    let html = render_document(&project.page, &config.toml.preview.lang);

    match out {
        Some(path) => {
            std::fs::write(path, html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", html),
    }
    Ok(())
}

/// How `sitecraft crop` picks the area to keep.
pub enum CropSelection {
    /// Relative `x,y,width,height`.
    Region(String),
    /// `x0,y0,x1,y1` in pixels of a `WIDTHxHEIGHT` view showing the image contained.
    Drag { drag: String, view: String },
}

pub async fn cmd_crop(image: &str, selection: CropSelection, out: &Path) -> Result<()> {
    let png = match selection {
        CropSelection::Region(region) => {
            let region: SelectionRegion = region
                .parse()
                .with_context(|| format!("Invalid region '{}'", region))?;
            let bytes = region::load_image_file_or_url(image).await?;
            region::crop_region(&bytes, &region)?
        }
        CropSelection::Drag { drag, view } => {
            let [x0, y0, x1, y1] = parse_drag(&drag)?;
            let view = parse_view(&view)?;
            let bytes = region::load_image_file_or_url(image).await?;
            let region = region::region_for_view_drag(&bytes, view, (x0, y0), (x1, y1))?;
            region::crop_region(&bytes, &region)?
        }
    };
    std::fs::write(out, &png).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("Wrote {} ({} bytes)", out.display(), png.len());
    Ok(())
}

fn parse_drag(drag: &str) -> Result<[f64; 4]> {
    let parts = drag
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid drag '{}'", drag))?;
    <[f64; 4]>::try_from(parts)
        .map_err(|_| anyhow::anyhow!("Invalid drag '{}': expected x0,y0,x1,y1", drag))
}

fn parse_view(view: &str) -> Result<(f64, f64)> {
    let parsed = view
        .split_once(['x', 'X'])
        .and_then(|(w, h)| Some((w.trim().parse::<f64>().ok()?, h.trim().parse::<f64>().ok()?)))
        .filter(|(w, h)| *w > 0.0 && *h > 0.0);
    parsed.with_context(|| format!("Invalid view size '{}': expected WIDTHxHEIGHT", view))
}
