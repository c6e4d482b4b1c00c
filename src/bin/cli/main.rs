mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use noteport::{HashAlgorithm, ProviderKind};

#[derive(Parser)]
#[command(name = "noteport", about = "Convert note-app exports into canonical notes", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Import one or more exports and print the result as JSON
    Import {
        /// Source app (evernote, joplin, simplenote, zoho)
        provider: ProviderKind,
        /// Export files, archives (.jex, .tar, .zip) or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Attachment hash algorithm (overrides the config file)
        #[arg(long)]
        hash: Option<HashAlgorithm>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List the available providers
    Providers {
        /// Output format
        #[arg(long, default_value = "plain")]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Import {
            provider,
            paths,
            config,
            hash,
            pretty,
        } => {
            commands::import::run(provider, &paths, config.as_deref(), hash, pretty)?;
        }
        Command::Providers { format } => {
            commands::providers::run(&format)?;
        }
    }

    Ok(())
}
