mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fab_lib::consts::MANIFEST_FILENAME;

use crate::cmd::{AssembleOptions, cmd_assemble, cmd_validate};
use crate::output::OutputFormat;

/// fab - feature assembly for multi-module builds
#[derive(Parser)]
#[command(name = "fab")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Assemble the features of every module in the reactor
  Assemble {
    /// Path to the reactor manifest
    #[arg(default_value = MANIFEST_FILENAME)]
    manifest: PathBuf,

    /// Directory to write assembled features to
    #[arg(long)]
    out: Option<PathBuf>,

    /// Attach each module's packaged unit to its only main feature
    #[arg(long)]
    attach_packaged_unit: bool,

    /// Do not add referenced artifacts to module dependencies
    #[arg(long)]
    skip_dependencies: bool,

    /// Check that every external bundle exists in the repository
    #[arg(long)]
    locate: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Check feature classifiers without assembling
  Validate {
    /// Path to the reactor manifest
    #[arg(default_value = MANIFEST_FILENAME)]
    manifest: PathBuf,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Assemble {
      manifest,
      out,
      attach_packaged_unit,
      skip_dependencies,
      locate,
      format,
    } => cmd_assemble(
      &AssembleOptions {
        manifest,
        out,
        attach_packaged_unit,
        skip_dependencies,
        locate,
      },
      format,
    ),
    Commands::Validate { manifest } => cmd_validate(&manifest),
  }
}
