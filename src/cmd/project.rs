//! Workspace and project commands: `sitecraft init`, `sitecraft project`.

use anyhow::Result;
use std::path::Path;

use sitecraft::config::SitecraftConfig;
use sitecraft::init::init_workspace;
use sitecraft::store::ProjectStore;

use crate::ProjectCommands;

pub fn cmd_init(project_dir: &Path) -> Result<()> {
    let result = init_workspace(project_dir)?;
    if result.created {
        println!("Initialized sitecraft workspace at {}", result.state_dir.display());
    } else {
        println!("Workspace already initialized at {}", result.state_dir.display());
    }
    println!();
    println!("Next steps:");
    println!("  1. Set your API key in SITECRAFT_API_KEY (or the env var named in sitecraft.toml)");
    println!("  2. Create a project: sitecraft project new \"Minha landing page\"");
    println!("  3. Start chatting: sitecraft chat <project-id> \"Quero uma landing page de academia\"");
    Ok(())
}

pub fn cmd_project(project_dir: &Path, command: ProjectCommands) -> Result<()> {
    let config = SitecraftConfig::new(project_dir.to_path_buf())?;
    let store = ProjectStore::new(config.projects_dir());

    match command {
        ProjectCommands::New { name } => {
            let project = store.create(name.trim())?;
            println!("{}", project.id);
        }
        ProjectCommands::List => {
            let projects = store.list()?;
            if projects.is_empty() {
                println!("No projects yet. Create one with 'sitecraft project new <name>'.");
                return Ok(());
            }
            for p in projects {
                println!(
                    "{}  {}  {}",
                    p.id,
                    console::style(&p.name).bold(),
                    console::style(format!(
                        "{} fragment(s), rev {}, {}",
                        p.fragments,
                        p.revision,
                        p.updated_at.format("%Y-%m-%d %H:%M")
                    ))
                    .dim()
                );
            }
        }
        ProjectCommands::Show { id } => {
            let project = store.load(&id)?;
            println!("{}", console::style(&project.name).bold().cyan());
            println!();
            println!("Fragments:");
            if project.page.is_empty() {
                println!("  (none)");
            }
            for (i, fragment) in project.page.fragments().iter().enumerate() {
                println!("  {}. {} [{}]", i + 1, fragment.name, fragment.id);
            }
            println!();
            println!("Conversation:");
            for message in project.transcript.visible() {
                let role = if message.is_error {
                    console::style(message.role.to_string()).red()
                } else {
                    console::style(message.role.to_string()).dim()
                };
                println!("  {}: {}", role, message.content);
            }
        }
    }
    Ok(())
}
