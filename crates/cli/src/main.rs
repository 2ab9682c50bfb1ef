use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// bindery - a module bundler for JavaScript and TypeScript
#[derive(Parser)]
#[command(name = "bindery")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Bundle a project into the output directory
  Build {
    /// Entry point, overriding the config's entry
    entry: Option<String>,

    /// Output directory, overriding the config's output path
    #[arg(short, long)]
    output: Option<String>,

    /// Path to a config file (.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
  },

  /// Load and validate a config file without building
  Check {
    /// Path to a config file (.json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
  },

  /// Write a starter config file
  Init {
    /// Directory to initialize
    #[arg(default_value = ".")]
    dir: PathBuf,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .without_time()
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Build { entry, output, config } => cmd::cmd_build(entry.as_deref(), output.as_deref(), config.as_deref()).await,
    Commands::Check { config } => cmd::cmd_check(config.as_deref()).await,
    Commands::Init { dir } => cmd::cmd_init(&dir).await,
  }
}
