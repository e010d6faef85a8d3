use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use raag_memory::{
    cli::{execute_command, MemoryCommands},
    config::{Config, LogFormat},
    memory::MemoryEngine,
    storage::open_store,
};

/// Adaptive memory for the box-condition classifier.
#[derive(Parser, Debug)]
#[command(name = "raag-memory", version, about)]
struct Cli {
    #[command(subcommand)]
    command: MemoryCommands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "raag-memory starting");

    let store = match open_store(&config.store).await {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, path = %config.store.path.display(), "Failed to open state store");
            return Err(e.into());
        }
    };

    let engine = match MemoryEngine::open(config.memory.clone(), store).await {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!(error = %e, "Failed to load memory state");
            return Err(e.into());
        }
    };

    let result = execute_command(cli.command, &engine, &config).await;
    if result.exit_code == 0 {
        print!("{}", result.message);
    } else {
        eprint!("{}", result.message);
    }
    std::process::exit(result.exit_code);
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
