//! Trellis CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis_source::LocalSource;

mod commands;
mod settings;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Query and watch a JSON graph through a batching cache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Settings file
    #[arg(short, long, default_value = settings::DEFAULT_FILE)]
    config: PathBuf,

    /// Router URL of the HTTP data source
    #[arg(long)]
    router: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Extra request header, as name=value
    #[arg(long = "header", value_parser = settings::parse_header)]
    headers: Vec<(String, String)>,

    /// Serve a JSON graph file as the data source instead of a router
    #[arg(long)]
    backend: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a value
    Get {
        /// One key per argument, or path syntax with --parse
        #[arg(required = true)]
        keys: Vec<String>,

        /// Treat every argument as a path in path syntax
        #[arg(short, long)]
        parse: bool,
    },
    /// Write a value (JSON, or a plain string)
    Set { path: String, value: String },
    /// Invoke a remote function
    Call {
        path: String,

        /// Arguments as a JSON array
        #[arg(long)]
        args: Option<String>,
    },
    /// Drop a cached path and print the cache
    Invalidate { path: String },
    /// Read paths until they resolve, re-reading on every change signal
    Watch {
        #[arg(required = true)]
        paths: Vec<String>,

        /// Seconds to wait for a signal before giving up
        #[arg(short, long, default_value = "5")]
        wait: u64,
    },
    /// Print the seeded cache
    Cache,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("trellis={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = settings::Settings::load(&cli.config)?
        .with_env(settings::environment())?
        .with_flags(cli.router, cli.timeout_ms, cli.headers);
    let mut config = settings.to_config()?;
    if let Some(path) = &cli.backend {
        tracing::info!("Serving {} as the data source", path.display());
        config.source = Some(Arc::new(LocalSource::from_json(&settings::read_json(path)?)));
    }

    match cli.command {
        Commands::Get { keys, parse } => commands::get(config, keys, parse).await,
        Commands::Set { path, value } => commands::set(config, path, value).await,
        Commands::Call { path, args } => commands::call(config, path, args).await,
        Commands::Invalidate { path } => commands::invalidate(config, path),
        Commands::Watch { paths, wait } => {
            commands::watch(config, paths, Duration::from_secs(wait)).await
        }
        Commands::Cache => commands::cache(config),
        Commands::Version => {
            println!("Trellis v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
