//! Composition root: one process hosting both pipeline stages.
//!
//! Wires the ingestion gateway and the stream processor around the bounded
//! in-process channel, opens the warehouse, serves HTTP until ctrl-c, then
//! drains the processor and reports its final counters.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use tickflow_core::{InProcessChannel, QuoteFetcher, ReqwestHttpClient};
use tickflow_gateway::{ConfigError, GatewayConfig, GatewayState, IngestMode};
use tickflow_pipeline::StreamProcessor;
use tickflow_warehouse::{TickWarehouse, WarehouseConfig, WarehouseError};

#[derive(Debug, Parser)]
#[command(name = "tickflow-server", about = "Tick ingestion and enrichment service")]
struct Args {
    /// Subscription name, used for log correlation only.
    #[arg(long, default_value = "stock-ticks-sub")]
    input_subscription: String,

    /// Warehouse table receiving processed ticks.
    #[arg(long, default_value = "ticks")]
    output_table: String,

    /// Path to the DuckDB database file.
    #[arg(long, default_value = "tickflow.duckdb")]
    db_path: String,

    /// Bound on in-flight messages between gateway and processor.
    #[arg(long, default_value_t = 1024)]
    channel_capacity: usize,
}

#[derive(Debug, Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let config = GatewayConfig::from_env()?;

    if config.mode == IngestMode::Pull && config.api_key.is_none() {
        tracing::warn!(
            "pull-ingest mode without API_KEY; empty-body requests will be rejected with 500"
        );
    }

    let warehouse = TickWarehouse::open(WarehouseConfig::new(&args.db_path, &args.output_table))?;
    tracing::info!(
        db_path = %args.db_path,
        table = %args.output_table,
        existing_rows = warehouse.count_ticks()?,
        "warehouse open"
    );

    let (publisher, subscription) = InProcessChannel::bounded(args.channel_capacity);

    let processor = StreamProcessor::new(subscription, Arc::new(warehouse));
    let subscription_name = args.input_subscription.clone();
    let processor_task = tokio::spawn(async move {
        tracing::info!(subscription = %subscription_name, "stream processor started");
        processor.run().await
    });

    let fetcher = config
        .api_key
        .clone()
        .map(|key| QuoteFetcher::new(Arc::new(ReqwestHttpClient::new()), key));

    let state = Arc::new(GatewayState {
        publisher: Arc::new(publisher),
        fetcher,
        mode: config.mode,
        symbol: config.symbol.clone(),
        topic_path: config.topic_path(),
    });
    let app = tickflow_gateway::router(Arc::clone(&state));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        mode = config.mode.as_str(),
        topic = %config.topic_path(),
        "gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Releasing the last publisher handle closes the channel, which lets the
    // processor drain its backlog and return.
    drop(state);
    match processor_task.await {
        Ok(stats) => {
            tracing::info!(
                written = stats.written,
                dropped = stats.dropped,
                write_failures = stats.write_failures,
                "processor drained; shutting down"
            );
        }
        Err(error) => {
            tracing::error!(%error, "processor task panicked");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to install ctrl-c handler");
    }
    tracing::info!("shutdown signal received");
}
