use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use filedrop::{Config, FileServer};

/// Minimal HTTP file repository.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Directory to serve (overrides the configuration).
    #[arg(long)]
    dir: Option<String>,

    /// First port to try (overrides the configuration).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Load configuration
    let mut config = match Config::load_with_env(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", args.config.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };
    if let Some(dir) = args.dir {
        config.files.root = dir;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Initialize logging
    if let Err(e) = filedrop::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        filedrop::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("filedrop starting");

    let server = match FileServer::new(&config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to prepare serve root: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
