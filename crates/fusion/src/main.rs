// Copyright 2026 The FusionStore Authors
// SPDX-License-Identifier: Apache-2.0

//! FusionStore: an S3-compatible gateway over heterogeneous object stores.

use anyhow::{Context, Result};
use clap::Parser;
use fusion_core::config::{GatewayConfig, LogFormat};
use fusion_store::{FusionStore, ObjectLayer};
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;

use cli::{Cli, Commands, GatewayBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Gateway { backend: GatewayBackend::Fusion(args) } => run_gateway(args).await,
        Commands::Version => {
            println!("fusion {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_gateway(args: cli::FusionArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => GatewayConfig::from_file(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    // Flags win over file values.
    config.server.address = args.address;
    config.cluster.mgs = args.mgs;

    init_logging(&config)?;

    // Pools, vbuckets, MDS shards and vendor adapters all come up here;
    // any failure is fatal and exits non-zero.
    let store = FusionStore::connect(&config.cluster.mgs)
        .await
        .context("fusion gateway startup failed")?;

    info!(
        address = %config.server.address,
        mgs = %config.cluster.mgs,
        "fusion gateway ready"
    );

    shutdown_signal().await;

    store.shutdown().await.context("shutdown failed")?;
    info!("fusion gateway shutdown complete");
    Ok(())
}

fn init_logging(config: &GatewayConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(filter).with(fmt_layer.json()).init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
