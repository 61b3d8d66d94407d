//! `openevt` - Prometheus exporter for Envertec EVT microinverters.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use openevt::{Args, Config, Error, EvtClient, Exporter, Supervisor, exporter};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> openevt::Result<()> {
    let config: Config = args.into_config()?;

    let metrics = Arc::new(Exporter::new(config.process_metrics)?);

    let client = EvtClient::tcp(&config.address, &config.serial_number)?
        .read_timeout(config.poll_interval);
    let mut supervisor = Supervisor::new(client, Arc::clone(&metrics))
        .reconnect_interval(config.reconnect_interval);

    let cancel = CancellationToken::new();

    let signal_token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                signal_token.cancel();
            }
            Err(e) => tracing::warn!("cannot listen for shutdown signal: {}", e),
        }
    });

    let supervisor_token = cancel.clone();
    let supervisor_task = tokio::spawn(async move { supervisor.run(&supervisor_token).await });

    let app = exporter::router(metrics, &config.telemetry_path);
    let served = exporter::serve(&config.listen_address, app, cancel.clone()).await;

    // The server returns only on shutdown or failure; stop the supervisor either way.
    cancel.cancel();

    match supervisor_task.await {
        Ok(Err(Error::Cancelled) | Ok(())) => {}
        Ok(Err(e)) => tracing::error!("inverter supervisor failed: {}", e),
        Err(e) => tracing::error!("inverter supervisor panicked: {}", e),
    }

    served
}
