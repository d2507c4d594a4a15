use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sitecraft::config::STATE_DIR;
use sitecraft::logging::{self, LogOptions};

mod cmd;

#[derive(Parser)]
#[command(name = "sitecraft")]
#[command(version, about = "Conversational landing page builder")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the .sitecraft directory
    Init,
    /// Create, list or show projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Send one chat message to a project
    Chat {
        /// Project id
        project: String,
        /// Message text
        message: String,
    },
    /// Edit an element of a project page by data-id
    Patch {
        /// Project id
        project: String,
        #[command(subcommand)]
        op: PatchCommands,
    },
    /// Remove or reorder a project's fragments
    Fragment {
        /// Project id
        project: String,
        #[command(subcommand)]
        op: FragmentCommands,
    },
    /// Show what clicking an element opens (inline editor or image bank)
    Select {
        /// Project id
        project: String,
        /// data-id of the clicked element
        data_id: String,
    },
    /// Render a project page as a standalone HTML document
    Preview {
        /// Project id
        project: String,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Crop an image to a relative region or a drag over a displayed view
    Crop {
        /// Image path, http(s) URL or data URL
        image: String,
        /// Relative region as x,y,width,height (each 0..1)
        #[arg(long, required_unless_present = "drag", conflicts_with = "drag")]
        region: Option<String>,
        /// Drag in view pixels as x0,y0,x1,y1
        #[arg(long)]
        drag: Option<String>,
        /// View size the drag was made in, as WIDTHxHEIGHT
        #[arg(long, default_value = "800x600")]
        view: String,
        /// Output PNG path
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Video metadata and downloads via yt-dlp
    Video {
        #[command(subcommand)]
        command: VideoCommands,
    },
    /// Start the HTTP service
    Serve {
        /// Port to serve on (defaults to [server].port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable dev mode (bind all interfaces, permissive CORS)
        #[arg(long)]
        dev: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ProjectCommands {
    /// Create a new project
    New { name: String },
    /// List projects, most recent first
    List,
    /// Show a project's page and conversation
    Show { id: String },
}

#[derive(Subcommand, Clone)]
pub enum PatchCommands {
    /// Replace the inner content of an element
    Replace {
        #[arg(long)]
        data_id: String,
        #[arg(long)]
        html: String,
    },
    /// Remove an element
    Remove {
        #[arg(long)]
        data_id: String,
    },
    /// Point an image at a new source
    SetImage {
        #[arg(long)]
        data_id: String,
        #[arg(long)]
        src: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum FragmentCommands {
    /// Remove a fragment
    Rm {
        /// Fragment id
        fragment: String,
    },
    /// Move a fragment to a 1-based position
    Move {
        /// Fragment id
        fragment: String,
        #[arg(long)]
        to: usize,
    },
}

#[derive(Subcommand, Clone)]
pub enum VideoCommands {
    /// Print metadata for a video URL
    Metadata { url: String },
    /// Download a video into the media store
    Download {
        /// Video URL
        url: Option<String>,
        /// Resolve the URL from the media catalog instead
        #[arg(long)]
        media_id: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let log_dir = project_dir.join(STATE_DIR).join("logs");
    let _log_guard = logging::init(
        LogOptions {
            json: cli.log_json,
            verbose: cli.verbose,
        },
        Some(&log_dir),
    );

    match cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Project { command } => cmd::cmd_project(&project_dir, command)?,
        Commands::Chat { project, message } => {
            cmd::cmd_chat(&project_dir, &project, &message).await?
        }
        Commands::Patch { project, op } => cmd::cmd_patch(&project_dir, &project, op)?,
        Commands::Fragment { project, op } => cmd::cmd_fragment(&project_dir, &project, op)?,
        Commands::Select { project, data_id } => {
            cmd::cmd_select(&project_dir, &project, &data_id)?
        }
        Commands::Preview { project, out } => {
            cmd::cmd_preview(&project_dir, &project, out.as_deref())?
        }
        Commands::Crop {
            image,
            region,
            drag,
            view,
            out,
        } => {
            let selection = match (region, drag) {
                (Some(region), _) => cmd::CropSelection::Region(region),
                (None, Some(drag)) => cmd::CropSelection::Drag { drag, view },
                (None, None) => anyhow::bail!("--region or --drag is required"),
            };
            cmd::cmd_crop(&image, selection, &out).await?
        }
        Commands::Video { command } => cmd::cmd_video(&project_dir, command).await?,
        Commands::Serve { port, dev } => cmd::cmd_serve(&project_dir, port, dev).await?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command)?,
    }

    Ok(())
}
