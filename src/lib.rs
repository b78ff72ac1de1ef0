use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use clap::{Parser, Subcommand};

pub mod api;
pub mod cli;
pub mod config;
pub mod healthcare;
pub mod observability;
pub mod store;
pub mod validation;

#[derive(Parser)]
#[command(name = "patientdb")]
#[command(about = "patientdb - Patient records over HTTP", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server (default)
    Start {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Path to a .toml or .json config file
        #[arg(short, long)]
        config: Option<String>,
        /// Patient data file (overrides config)
        #[arg(short, long)]
        data_file: Option<String>,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "patientdb.toml")]
        output: String,
    },
    /// Check server status
    Status {
        /// Host to connect to
        #[arg(long, default_value = "localhost:8080")]
        host: String,
    },
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Start { port, config, data_file }) => {
            start_server(port, config, data_file).await?;
        }
        Some(Commands::Init { output }) => {
            cli::run_init(output).await?;
        }
        Some(Commands::Status { host }) => {
            cli::run_status(host).await?;
        }
        None => {
            start_server(None, None, None).await?;
        }
    }

    Ok(())
}

async fn start_server(
    port: Option<u16>,
    config_path: Option<String>,
    data_file: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut manager = config::ConfigManager::new();
    if let Some(path) = &config_path {
        manager.load(path).await?;
    }
    manager.apply_env().await?;
    if let Some(port) = port {
        manager.set_port(port).await;
    }
    if let Some(data_file) = &data_file {
        manager.set_data_file(data_file).await;
    }
    if let Err(errors) = manager.validate().await {
        return Err(format!("Invalid configuration: {}", errors.join("; ")).into());
    }
    let config = manager.get().await;

    observability::init_logging(&config.logging)?;

    info!("Starting patientdb...");
    if let Some(path) = &config_path {
        info!("Loaded configuration from {}", path);
    }

    let store = Arc::new(store::PatientStore::new(&config.storage.data_file));
    info!("Patient store at {}", store.path().display());

    let app = api::router(store, config.server.request_timeout());

    let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("patientdb listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
