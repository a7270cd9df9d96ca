//! TLS Relay Command Line Tool
//!
//! This binary is the command-line interface for TLS Relay.

use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

// Import our library
use tls_relay::{proxy, RelayConfig, Result, APP_NAME, VERSION};
use tls_relay::common::init_logger;
use tls_relay::config::{defaults, ConfigOverrides, ENV_PREFIX};
use tls_relay::tls::{get_cert_fingerprint, get_cert_subject};

/// TLS Relay: a TCP relay with optional TLS termination
///
/// Settings are taken from the defaults, then the configuration file, then
/// `TLS_RELAY_*` environment variables, then these flags.
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Listen address (host:port)
    #[clap(long)]
    listen: Option<String>,

    /// Backend address (host:port)
    #[clap(long)]
    backend: Option<String>,

    /// Relay buffer size in kilobytes
    #[clap(long)]
    buffer_size: Option<i64>,

    /// Terminate TLS on accepted connections
    #[clap(long)]
    tls_enabled: bool,

    /// Server certificate path (PEM)
    #[clap(long)]
    cert_file_path: Option<PathBuf>,

    /// Server private key path (PEM)
    #[clap(long)]
    key_file_path: Option<PathBuf>,

    /// Backend connect timeout in seconds
    #[clap(long)]
    connect_timeout: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[clap(long)]
    log_level: Option<String>,

    /// Load configuration from a JSON file
    #[clap(long)]
    config_file: Option<PathBuf>,
}

impl Args {
    /// Overrides for the flags that were actually given
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            listen_addr: self.listen.clone(),
            backend_addr: self.backend.clone(),
            buffer_size: self.buffer_size,
            tls_enabled: self.tls_enabled.then_some(true),
            cert_file_path: self.cert_file_path.clone(),
            key_file_path: self.key_file_path.clone(),
            connect_timeout: self.connect_timeout,
            log_level: self.log_level.clone(),
        }
    }
}

fn load_config(args: &Args) -> Result<RelayConfig> {
    let mut sources = Vec::with_capacity(3);

    if let Some(path) = &args.config_file {
        sources.push(ConfigOverrides::from_file(path)?);
    }
    sources.push(ConfigOverrides::from_env(ENV_PREFIX)?);
    sources.push(args.overrides());

    RelayConfig::resolve(sources)
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM
async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for Ctrl+C: {}", e);
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
                error!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
        _ = shutdown.cancelled() => return,
    }

    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            init_logger(args.log_level.as_deref().unwrap_or(defaults::LOG_LEVEL));
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // Initialize logger
    init_logger(config.log_level());

    info!("Starting {} v{}", APP_NAME, VERSION);
    info!("Listen address: {}", config.listen_addr());
    info!("Backend address: {}", config.backend_addr());
    info!("Buffer size: {} KB", config.buffer_size());

    if config.tls_enabled() {
        info!("Using certificate: {}", config.cert_file_path().display());

        match get_cert_subject(config.cert_file_path()) {
            Ok(subject) => info!("Certificate subject: {}", subject),
            Err(e) => warn!("Unable to get certificate subject: {}", e),
        }

        match get_cert_fingerprint(config.cert_file_path()) {
            Ok(fingerprint) => info!("Certificate fingerprint: {}", fingerprint),
            Err(e) => warn!("Unable to get certificate fingerprint: {}", e),
        }
    }

    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    info!("Relay service starting, press Ctrl+C to stop");

    // Run relay service
    let result = proxy::run(Arc::new(config), shutdown.clone(), tracker.clone()).await;
    if let Err(e) = &result {
        error!("Relay stopped with error: {}", e);
        shutdown.cancel();
    }

    tracker.close();
    tracker.wait().await;
    info!("All connections closed");

    result
}
