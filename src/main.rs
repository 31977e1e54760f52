//! gas-relay daemon entrypoint

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gas_relay::config::RelayConfig;
use gas_relay::dispatch::NoopExecutor;
use gas_relay::provider::rpc::RpcProvider;
use gas_relay::service::{RelayService, ShutdownKind};

#[derive(Parser)]
#[command(name = "gas-relay", about = "Whisper gas relay node", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = RelayConfig::load(&cli.config)?;

    let provider = Arc::new(RpcProvider::new(&config.node));
    let service = RelayService::new(config, provider, Arc::new(NoopExecutor));

    let outcome = service.run(shutdown_signal()).await?;
    tracing::info!(?outcome, "Relay stopped");
    Ok(())
}

/// Resolve on the first shutdown signal
///
/// Ctrl-C asks for an orderly close; SIGTERM is acknowledged but the
/// process exits without tearing down subscriptions.
async fn shutdown_signal() -> ShutdownKind {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
                return ShutdownKind::Interrupt;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => ShutdownKind::Interrupt,
            _ = term.recv() => ShutdownKind::Terminate,
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        ShutdownKind::Interrupt
    }
}
