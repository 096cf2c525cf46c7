mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use moat::config::{self, MoatConfig};

#[derive(Parser)]
#[command(name = "moat", version, about = "Memory moat toolkit for LLM agents")]
struct Cli {
    /// Config file (defaults to ~/.moat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a task and run the reasoning loop
    Run {
        /// Task to run instead of prompting for one
        #[arg(short, long)]
        task: Option<String>,
        #[arg(long)]
        max_iters: Option<usize>,
        /// Store the demo seed memory and data first
        #[arg(long)]
        seed: bool,
    },
    /// Manage the note journal
    Notes {
        /// Journal file (defaults to the configured journal path)
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[command(subcommand)]
        action: cli::notes::NotesAction,
    },
    /// Manage the key/value data moat
    Data {
        #[command(subcommand)]
        action: cli::data::DataAction,
    },
    /// Similarity search over long-term memory
    Recall {
        query: String,
        #[arg(short, default_value_t = 3)]
        k: usize,
    },
    /// Show recent traced decisions
    Traces {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the effective configuration (secrets redacted)
    Config,
    /// Run database diagnostics
    Doctor,
    /// Delete all data entries and long-term memories
    Reset {
        #[arg(long)]
        yes: bool,
    },
    /// Regenerate all vectors with the configured model
    ReEmbed,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.moat/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let dotenv = config::load_dotenv();
    let config = match &cli.config {
        Some(path) => MoatConfig::load_from(path)?,
        None => MoatConfig::load()?,
    };

    // stderr keeps stdout clean for command output
    let filter = EnvFilter::try_new(&config.app.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    match cli.command {
        Command::Run {
            task,
            max_iters,
            seed,
        } => cli::run::run(&config, task, max_iters, seed).await?,
        Command::Notes { file, action } => {
            let path = file.unwrap_or_else(|| config.resolved_journal_path());
            cli::notes::run(&path, action)?;
        }
        Command::Data { action } => cli::data::run(&config, action)?,
        Command::Recall { query, k } => cli::recall::recall(&config, &query, k).await?,
        Command::Traces { limit } => cli::traces::traces(&config, limit)?,
        Command::Config => cli::show_config(&config)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Reset { yes } => cli::reset::reset(&config, yes)?,
        Command::ReEmbed => cli::re_embed::re_embed(&config).await?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
