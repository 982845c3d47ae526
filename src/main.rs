use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "productviz")]
#[command(version, about = "AI product visualiser with a bounded, persistent history")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Maximum number of artifacts kept in history. Overrides productviz.toml.
    #[arg(long, global = true)]
    pub max_history: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new productviz project
    Init,
    /// Manage the base source image
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },
    /// List the built-in marketing scenarios
    Scenarios,
    /// List suggested edit prompts
    Suggestions,
    /// Generate a new image from the source
    Generate {
        #[command(subcommand)]
        command: GenerateCommands,
    },
    /// Inspect and manage generated images
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum SourceCommands {
    /// Use an image file as the base source
    Set {
        /// Path to a PNG, JPEG, WebP or GIF file
        file: PathBuf,
    },
    /// Show the current source image
    Show,
    /// Forget the current source image
    Clear,
}

#[derive(Subcommand, Clone)]
pub enum GenerateCommands {
    /// Render the product in a built-in marketing scenario
    Scenario {
        /// Scenario id (see `productviz scenarios`)
        id: String,
    },
    /// Apply a free-form edit instruction
    Edit {
        prompt: String,
        /// Edit the most recent generated image instead of the source
        #[arg(long)]
        from_latest: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum HistoryCommands {
    /// List generated images, newest first
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Delete an image from history
    Remove {
        /// Artifact id or unique prefix
        id: String,
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Write an image to disk
    Export {
        /// Artifact id or unique prefix
        id: String,
        /// Output file or directory (defaults to .productviz/exports/)
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default productviz.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let log_dir = productviz::init::is_initialized(&project_dir)
        .then(|| productviz::init::get_viz_dir(&project_dir).join("logs"));
    let _log_guard = productviz::logging::init(log_dir.as_deref(), cli.verbose)?;

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Source { command } => {
            cmd::cmd_source(&cli, &project_dir, command.clone()).await?
        }
        Commands::Scenarios => cmd::cmd_scenarios()?,
        Commands::Suggestions => cmd::cmd_suggestions()?,
        Commands::Generate { command } => {
            cmd::cmd_generate(&cli, &project_dir, command.clone()).await?
        }
        Commands::History { command } => {
            cmd::cmd_history(&cli, &project_dir, command.clone()).await?
        }
        Commands::Config { command } => cmd::cmd_config(&cli, &project_dir, command.clone())?,
    }

    Ok(())
}
