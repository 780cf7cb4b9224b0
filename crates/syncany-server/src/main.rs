//! Syncany API Server Entrypoint
//!
//! Usage: syncany-server serve --config <file>
//!
//! Reads a single framed request from stdin, dispatches it, and writes a JSON
//! response line to stdout. Logs go to stderr (filter: `SYNCANY_LOG`).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use syncany_server::{logging, KeyStore, RpcHandler, ServerConfig, Services};

#[derive(Parser)]
#[command(name = "syncany-server")]
#[command(about = "Syncany release and link API server", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve one request from stdin
    Serve {
        /// Path to the server config file
        #[arg(long, short = 'c')]
        config: PathBuf,
    },

    /// Validate the configuration and list the security contexts
    CheckConfig {
        /// Path to the server config file
        #[arg(long, short = 'c')]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(&config),
        Commands::CheckConfig { config } => check_config(&config),
    }
}

fn serve(config_path: &Path) -> ExitCode {
    let config = match ServerConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Cannot load configuration");
            return ExitCode::FAILURE;
        }
    };

    let services = match Services::from_config(config) {
        Ok(services) => services,
        Err(e) => {
            tracing::error!(error = %e, "Cannot initialize server");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = RpcHandler::new(services).run() {
        tracing::error!(error = %e, "Request handler error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn check_config(config_path: &Path) -> ExitCode {
    let config = match ServerConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let keys = match KeyStore::load(&config.keys_dir) {
        Ok(keys) => keys,
        Err(e) => {
            eprintln!("Cannot load key store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Configuration OK: {}", config_path.display());
    println!("  upload_root: {}", config.upload_root.display());
    println!("  dist_root:   {}", config.dist_root.display());
    println!("  replay window: {}s", config.replay_window_seconds);
    println!(
        "  apt:         {}",
        if config.apt.is_some() { "configured" } else { "not configured (deb uploads refused)" }
    );
    println!("Security contexts:");
    for context in keys.contexts() {
        let status = match keys.get_secret(context) {
            Ok(_) => "ok",
            Err(_) => "missing key",
        };
        println!("  {} ({})", context, status);
    }

    ExitCode::SUCCESS
}
