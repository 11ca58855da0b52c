//! TCP Relay command line tool

use clap::Parser;
use log::{error, info};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tcp_relay::common::{init_logger, Result};
use tcp_relay::config::{log_config, ConfigLoader, ConfigMerger, ConfigValidator, RelayConfig};
use tcp_relay::{termination_signal, DrainOutcome, Relay, APP_NAME, VERSION};

/// Byte-blind TCP relay with backend retry and graceful shutdown
#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Backend address (host:port)
    #[arg(short, long)]
    target: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Load configuration from a JSON file
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Copy buffer size in bytes
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Per-attempt backend connect timeout in milliseconds
    #[arg(long)]
    connect_timeout_ms: Option<u64>,

    /// First retry delay in milliseconds
    #[arg(long)]
    backoff_initial_ms: Option<u64>,

    /// Retry delay cap in milliseconds
    #[arg(long)]
    backoff_max_ms: Option<u64>,

    /// Linger after the first direction closes, in milliseconds
    #[arg(long)]
    linger_ms: Option<u64>,

    /// Shutdown drain deadline in milliseconds
    #[arg(long)]
    drain_timeout_ms: Option<u64>,
}

impl Args {
    /// Command line values as a config; unset options keep their defaults
    ///
    /// Merging only takes fields that differ from the default, so an option
    /// set to its default value does not override a file or environment value.
    fn to_config(&self) -> RelayConfig {
        let mut config = RelayConfig::default();

        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(size) = self.buffer_size {
            config.buffer_size = size;
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout_ms = ms;
        }
        if let Some(ms) = self.backoff_initial_ms {
            config.backoff_initial_ms = ms;
        }
        if let Some(ms) = self.backoff_max_ms {
            config.backoff_max_ms = ms;
        }
        if let Some(ms) = self.linger_ms {
            config.linger_ms = ms;
        }
        if let Some(ms) = self.drain_timeout_ms {
            config.drain_timeout_ms = ms;
        }

        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Defaults < file < environment < command line
    let config = RelayConfig::auto_load(args.config_file.as_deref())?.merge(args.to_config());

    init_logger(&config.log_level);
    info!("Starting {} v{}", APP_NAME, VERSION);

    config.validate()?;
    log_config(&config);

    let relay = Relay::new(Arc::new(config));

    let listener = match relay.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}", e);
            return Err(e);
        }
    };

    let stopper = relay.clone();
    tokio::spawn(async move {
        match termination_signal().await {
            Ok(()) => {
                stopper.shutdown();
            }
            Err(e) => error!("Unable to listen for termination signals: {}", e),
        }
    });

    match relay.serve(listener).await {
        DrainOutcome::Clean => info!("Relay stopped cleanly"),
        DrainOutcome::Forced { remaining } => info!("Relay stopped with {} tunnels cut off", remaining),
    }

    Ok(())
}
