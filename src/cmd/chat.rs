//! One chat turn from the command line: `sitecraft chat`.

use anyhow::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use sitecraft::chat::TurnOutcome;
use sitecraft::config::SitecraftConfig;
use sitecraft::context::AppContext;

pub async fn cmd_chat(project_dir: &Path, project_id: &str, message: &str) -> Result<()> {
    let config = SitecraftConfig::new(project_dir.to_path_buf())?;
    let ctx = AppContext::new(config)?;
    let project = ctx.store.load(project_id)?;
    let mut session = ctx.session(project);

    // Ctrl+C cancels the in-flight provider call
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let outcome = session.send(message, &cancel).await?;
    match outcome {
        TurnOutcome::Planned { plan } => {
            println!("{}", plan);
            println!();
            println!(
                "{}",
                console::style("Reply with an approval (e.g. \"pode gerar\") to generate.").dim()
            );
        }
        TurnOutcome::Generated {
            fragment_id,
            fragment_name,
            message,
            approved_now,
            renamed_ids,
        } => {
            if approved_now {
                println!("{}", console::style("Plan approved.").green());
            }
            println!("{}", message);
            println!(
                "{} {} [{}]",
                console::style("Added fragment:").green().bold(),
                fragment_name,
                fragment_id
            );
            for renamed in renamed_ids {
                println!(
                    "  {} data-id '{}' renamed to '{}'",
                    console::style("⚠").yellow(),
                    renamed.from,
                    renamed.to
                );
            }
        }
        TurnOutcome::Replied { message, .. } | TurnOutcome::Unprocessable { message } => {
            println!("{}", message);
        }
        TurnOutcome::Failed { error } => {
            anyhow::bail!("AI request failed: {}", error);
        }
        TurnOutcome::Cancelled => {
            println!("{}", console::style("Cancelled.").yellow());
        }
    }
    if let Some(e) = session.take_save_error() {
        anyhow::bail!("Turn was not saved: {}", e);
    }
    Ok(())
}
