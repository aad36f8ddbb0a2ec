//! treesync CLI - Command-line interface for treesync
//!
//! Provides commands for:
//! - Replicating a directory tree from one backend to another
//! - Inspecting a tree and its structural manifest
//! - Viewing and editing the configuration file
//! - Generating shell completions

use anyhow::Result;
use clap::{Parser, Subcommand};
use treesync_core::config::Config;

mod backends;
mod commands;
mod logging;
mod output;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, sync::SyncCommand, tree::TreeCommand,
    ConfigSource,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "treesync",
    version,
    about = "Replicate directory trees between local, SFTP and cloud storage"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy a tree from one backend to another
    Sync(SyncCommand),
    /// Enumerate a tree and print its structure
    Tree(TreeCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = OutputFormat::from_flag(cli.json);

    let source = ConfigSource::from_arg(cli.config.as_deref());
    // `config` subcommands report load problems themselves
    let config = match cli.command {
        Commands::Config(_) => Config::load_or_default(source.path()),
        _ => source.load()?,
    };
    logging::init(&config.logging, cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Sync(cmd) => cmd.execute(&config, format).await,
        Commands::Tree(cmd) => cmd.execute(&config, format).await,
        Commands::Config(cmd) => cmd.execute(&source, format).await,
        Commands::Completions(cmd) => cmd.execute(format).await,
    };

    if let Err(e) = result {
        get_formatter(format).error(&format!("{e:#}"));
        std::process::exit(1);
    }
    Ok(())
}
