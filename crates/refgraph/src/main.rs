//! refgraph CLI
//!
//! Inspect the reference graph of a page directory and rename pages without
//! breaking the links that point at them.

mod commands;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use commands::Command;
use refgraph_core::events::LogSink;
use refgraph_core::{Config, PageRepository};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Picked up from the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "refgraph.toml";

#[derive(Parser)]
#[command(name = "refgraph")]
#[command(author, version, about = "Page reference graph and safe page rename", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "REFGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Page directory, overrides `store.root`
    #[arg(short, long, env = "REFGRAPH_ROOT")]
    root: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Config::load(DEFAULT_CONFIG_FILE)?,
        None => Config::default(),
    };
    if let Some(root) = &cli.root {
        config.store.root = root.clone();
    }
    tracing::debug!(
        "Using {:?} store at {}",
        config.store.provider,
        config.store.root.display()
    );
    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let config = load_config(cli)?;
    let repo = PageRepository::open(&config)
        .with_context(|| format!("failed to open pages at {}", config.store.root.display()))?;
    repo.events().register(Arc::new(LogSink));
    commands::dispatch(&repo, &cli.command, cli.json)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => print!("{}", output),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}
