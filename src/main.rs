//! hello-server: a minimal sequential HTTP greeter
//!
//! Accepts one TCP connection at a time, discards whatever the client sends,
//! and answers with a fixed `HTTP/1.1 200 OK` response before closing.
//!
//! Features:
//! - Greeting presets (`c`, `cpp`, `rust`, `go`) selecting port and body
//! - Address and port reuse on the listening socket
//! - Graceful shutdown on SIGINT/SIGTERM, exiting with status 0
//! - Configuration via CLI arguments or TOML file

mod config;
mod response;
mod server;
mod signals;

use config::Config;
use server::Server;
use signals::ShutdownSignal;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.log_level);

    info!(
        greeting = ?config.greeting,
        host = %config.host,
        port = config.port,
        backlog = config.backlog,
        "Starting hello-server"
    );

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = ShutdownSignal::install()?;
    let server = Server::bind(&config)?;

    server.run_until(shutdown.recv()).await;

    info!("Server terminated gracefully");
    Ok(())
}
