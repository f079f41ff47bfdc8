//! # Command Line Interface
//!
//! `properties` prints the merged secrets once, `backends` shows where each backend
//! reads from, and `run` keeps a session alive until interrupted.

pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use crate::backends::BackendMetadataRegistry;
use crate::config::AppConfig;
use crate::observability::{init_observability, log_config_info};
use crate::runtime::Runtime;
use crate::{APP_NAME, VERSION};
use output::{print_table_header, redact, render_properties, OutputFormat};

#[derive(Parser)]
#[command(name = "vaultline")]
#[command(about = "Vault session and secret property loader")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (TOML or YAML)
    #[arg(short, long, env = "VAULTLINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read every backend once and print the merged properties
    Properties {
        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Print secret values instead of placeholders
        #[arg(long)]
        reveal: bool,
    },

    /// Validate the configuration and list resolved backend paths
    Backends,

    /// Keep the session alive and refresh properties until interrupted
    Run {
        /// Seconds between property refreshes; 0 disables refreshing
        #[arg(long, default_value = "0")]
        refresh_interval: u64,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_observability(&config.observability)?;
    info!(app_name = APP_NAME, version = VERSION, "Starting vaultline");
    log_config_info(&config);

    match cli.command {
        Commands::Properties { output, reveal } => handle_properties(&config, &output, reveal).await?,
        Commands::Backends => handle_backends(&config)?,
        Commands::Run { refresh_interval } => handle_run(&config, refresh_interval).await?,
    }

    Ok(())
}

async fn handle_properties(config: &AppConfig, output: &str, reveal: bool) -> anyhow::Result<()> {
    let format: OutputFormat = output.parse()?;
    let runtime = Runtime::start(config).await?;

    let snapshot = runtime.properties().snapshot().await;
    let properties = if reveal { (*snapshot).clone() } else { redact(&snapshot) };
    let rendered = render_properties(&properties, format);
    runtime.shutdown().await;

    println!("{}", rendered?);
    Ok(())
}

fn handle_backends(config: &AppConfig) -> anyhow::Result<()> {
    let registry = BackendMetadataRegistry::new();
    let descriptors = config.backends.descriptors();
    if descriptors.is_empty() {
        println!("No backends configured");
        return Ok(());
    }

    print_table_header(&[("NAME", 28), ("KIND", 10), ("ORDER", 6), ("PATH", 40)]);
    for descriptor in descriptors.iter().filter(|d| d.enabled) {
        let path = match registry.resolve(descriptor) {
            Ok(metadata) => metadata.path,
            Err(e) => format!("<{}>", e),
        };
        println!(
            "{:<28} {:<10} {:<6} {}",
            descriptor.name,
            descriptor.kind().as_str(),
            descriptor.order,
            path
        );
    }
    Ok(())
}

async fn handle_run(config: &AppConfig, refresh_interval: u64) -> anyhow::Result<()> {
    let runtime = Runtime::start(config).await?;
    info!("Session active, press Ctrl+C to stop");

    if refresh_interval == 0 {
        signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    } else {
        let mut ticker = tokio::time::interval(Duration::from_secs(refresh_interval));
        ticker.tick().await;
        loop {
            tokio::select! {
                result = signal::ctrl_c() => {
                    result.context("Failed to listen for shutdown signal")?;
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = runtime.refresh().await {
                        error!(error = %e, "Property refresh failed, keeping previous snapshot");
                    }
                }
            }
        }
    }

    info!("Shutdown signal received");
    runtime.shutdown().await;
    Ok(())
}
