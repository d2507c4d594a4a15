//! Configuration view and validation commands: `sitecraft config`.

use anyhow::Result;

use sitecraft::config::SitecraftConfig;

use crate::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    let config = SitecraftConfig::new(project_dir.to_path_buf())?;
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Sitecraft Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No sitecraft.toml found at {}", config_path.display());
                println!("Using defaults. Run 'sitecraft init' to write one.");
            }
            println!();

            let toml = &config.toml;
            println!("[provider]");
            println!("  kind = \"{}\"", toml.provider.kind);
            println!("  api_url = \"{}\"", toml.provider.api_url);
            println!("  model = \"{}\"", toml.provider.model);
            println!(
                "  api_key_env = \"{}\" ({})",
                toml.provider.api_key_env,
                if toml.provider.api_key().is_some() { "set" } else { "not set" }
            );
            println!("  timeout_secs = {}", toml.provider.timeout_secs);
            println!();
            println!("[chat]");
            println!("  approve_keywords = {:?}", toml.chat.approve_keywords);
            println!("  change_keywords = {:?}", toml.chat.change_keywords);
            println!("  generation_verbs = {:?}", toml.chat.generation_verbs);
            println!();
            println!("[preview]");
            println!("  lang = \"{}\"", toml.preview.lang);
            println!();
            println!("[video]");
            println!("  ytdlp_cmd = \"{}\"", toml.ytdlp_cmd());
            println!("  timeout_secs = {}", toml.video.timeout_secs);
            println!("  storage_dir = \"{}\"", config.media_dir().display());
            println!("  public_base_url = \"{}\"", toml.video.public_base_url);
            println!();
            println!("[server]");
            println!("  port = {}", config.port());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
    }

    Ok(())
}
