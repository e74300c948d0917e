//! Rivulet CLI - run and inspect streaming pipelines.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rivulet")]
#[command(author, version, about = "Rivulet streaming runtime CLI", long_about = None)]
struct Cli {
    /// Configuration file (default: $RIVULET_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the FIR decimation demo pipeline
    Run(commands::run::RunArgs),

    /// Show buffer capabilities of this platform
    Info(commands::info::InfoArgs),

    /// Print the effective configuration as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = commands::common::load_config(cli.config.as_deref())?;

    // RUST_LOG wins over the configured filter. Logs go to stderr so --json
    // output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&loaded.config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &loaded.path {
        Some(path) => tracing::debug!("config: loaded {}", path.display()),
        None => tracing::debug!("config: no file found, using defaults"),
    }

    match cli.command {
        Commands::Run(args) => commands::run::run(args, &loaded.config),
        Commands::Info(args) => commands::info::run(args),
        Commands::Config(args) => commands::config::run(args, &loaded),
    }
}
