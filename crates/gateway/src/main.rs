//! VaultGate
//!
//! Role-gated download gateway for a private file vault.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vault::config::{default_config_path, Config};

/// VaultGate - role-gated download gateway for a private file vault.
#[derive(Parser, Debug)]
#[command(name = "vaultgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the gateway.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the download gateway
    Serve,

    /// Validate the configuration file and exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };
    config.apply_env_overrides();

    // Initialize tracing; the guard must outlive the server
    let filter = tracing_subscriber::EnvFilter::new(if cli.verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    });
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .init();

    if let Some(config_path) = &cli.config {
        tracing::info!("Using config file: {:?}", config_path);
    } else {
        tracing::info!("Using config file: {:?}", default_config_path());
    }

    if let Err(err) = config.validate() {
        anyhow::bail!("Invalid configuration: {err}");
    }

    match cli.command {
        Commands::Serve => {
            tracing::info!("VaultGate starting...");
            gateway::server::run(&config).await
        }
        Commands::CheckConfig => {
            println!("Configuration OK");
            println!("  vault root: {}", config.vault.root.display());
            println!("  bind addr:  {}", config.server.bind_addr);
            println!("  roles:      {}", config.vault.role_folders.len());
            Ok(())
        }
    }
}
