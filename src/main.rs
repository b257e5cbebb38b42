//! kubelet-summary-exporter
//!
//! Prometheus exporter for the kubelet stats summary API with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod config;
mod handlers;
mod state;

use axum::{routing::get, Router};
use clap::{Parser, ValueEnum};
use kubelet_summary_exporter::{Fetcher, SummaryExporter};
use prometheus::{Encoder, Gauge, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

use cli::{Args, Commands, LogLevel};
use config::{resolve_config, show_config, validate_effective_config, Config};
use handlers::{health_handler, metrics_handler, root_handler};
use state::{AppState, RegisteredExporter, SharedState};

/// Initializes tracing logging subsystem with configured log level.
/// The CLI flag wins over `log_level` from the config file.
fn setup_logging(config: &Config, args: &Args) {
    let configured = config
        .log_level
        .as_deref()
        .and_then(|level| LogLevel::from_str(level, true).ok());
    let level = args.log_level.clone().or(configured).unwrap_or(LogLevel::Info);

    let max_level = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    info!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Builds the kubelet client and collector.
///
/// The blocking HTTP client must not be created or dropped on an async worker,
/// so this runs on the blocking pool.
async fn build_exporter(config: &Config) -> Result<SummaryExporter<Fetcher>, Box<dyn std::error::Error>> {
    let address = config.target_address.clone().unwrap_or_default();
    let port = config.kubelet_port();
    let token_path = config.token_path();
    let timeout = config.timeout();

    let exporter = tokio::task::spawn_blocking(move || -> Result<SummaryExporter<Fetcher>, String> {
        let fetcher = Fetcher::for_node(address.trim(), port, token_path, timeout)
            .map_err(|e| e.to_string())?;
        SummaryExporter::new(fetcher).map_err(|e| e.to_string())
    })
    .await??;

    Ok(exporter)
}

/// Performs a single pull and prints the text exposition to stdout.
async fn command_scrape(exporter: SummaryExporter<Fetcher>) -> Result<(), Box<dyn std::error::Error>> {
    let succeeded = tokio::task::spawn_blocking(move || -> Result<bool, String> {
        use prometheus::core::Collector;

        let families = exporter.collect();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buffer)
            .map_err(|e| e.to_string())?;
        print!("{}", String::from_utf8_lossy(&buffer));

        Ok(exporter
            .last_pull()
            .is_some_and(|pull| pull.outcome.is_success()))
    })
    .await??;

    if !succeeded {
        eprintln!("❌ Scrape failed, see log output");
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format.clone());
    }

    let config = load_validated_config(&args)?;
    setup_logging(&config, &args);

    let exporter = build_exporter(&config).await?;
    info!(
        "Scraping {} with token from {}",
        exporter.source().url(),
        exporter.source().token_path().display()
    );

    // Handle subcommands
    if let Some(Commands::Scrape) = &args.command {
        return command_scrape(exporter).await;
    }

    let exporter = Arc::new(exporter);
    let registry = Registry::new();

    let scrape_duration = Gauge::new(
        "kubelet_summary_exporter_scrape_duration_seconds",
        "Time spent serving the last /metrics request in seconds",
    )?;
    registry.register(Box::new(scrape_duration.clone()))?;
    registry.register(Box::new(RegisteredExporter(exporter.clone())))?;
    debug!(
        "Registered {} metric descriptors",
        exporter.catalog().len() + 1
    );

    let bind_ip_str = config.bind_addr().to_string();
    let port = config.listen_port();

    let state: SharedState = Arc::new(AppState {
        registry,
        exporter,
        scrape_duration,
        config: Arc::new(config),
        start_time: Instant::now(),
    });

    // Setup graceful shutdown signal handlers
    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            }
            _ = terminate => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    };

    // Configure HTTP server routes
    let addr: SocketAddr = match bind_ip_str.parse::<std::net::IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => format!("{}:{}", bind_ip_str, port).parse()?,
    };

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state.clone());

    let listener = TcpListener::bind(addr).await?;
    info!("kubelet-summary-exporter listening on http://{}", addr);

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = shutdown_signal => {
            info!("Shutdown signal received, exiting...");
        }
    }

    // The kubelet client owns a blocking runtime; release it off the async workers.
    let _ = tokio::task::spawn_blocking(move || drop(state)).await;

    info!("kubelet-summary-exporter stopped gracefully");
    Ok(())
}
