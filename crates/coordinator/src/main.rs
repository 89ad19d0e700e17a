use std::sync::Arc;

use tracing::{error, info};

use nsmock_coordinator::cli::{self, CliCommand};
use nsmock_coordinator::config::{self, ServerConfig};
use nsmock_coordinator::{MockServer, NodeSetManager};

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("nsmock-coordinator");

    let overrides = match cli::parse_args(args.get(1..).unwrap_or(&[])) {
        Ok(CliCommand::Run(overrides)) => overrides,
        Ok(CliCommand::Help) => {
            cli::print_usage(prog);
            return;
        }
        Ok(CliCommand::Version) => {
            println!("{}", cli::VERSION);
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::print_usage(prog);
            std::process::exit(2);
        }
    };

    // ═══════════════════════════════════════════════════════════════════════
    // Step 0: env file, then configuration
    // ═══════════════════════════════════════════════════════════════════════

    let loaded = match config::load_env_file() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Warning: {}", e);
            None
        }
    };

    let config = match ServerConfig::from_env() {
        Ok(c) => ServerConfig {
            config_source: loaded,
            ..c.with_overrides(&overrides)
        },
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(false)
        .init();

    if let Some(source) = &config.config_source {
        info!("Loaded configuration from: {}", source);
    }

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }
    let addr = match config.resolve().await {
        Ok(addr) => addr,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // ═══════════════════════════════════════════════════════════════════════
    // Step 1: serve until Ctrl-C or SIGTERM
    // ═══════════════════════════════════════════════════════════════════════

    let server = match MockServer::start(addr, Arc::new(NodeSetManager::new())).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run_until(shutdown_signal()).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
