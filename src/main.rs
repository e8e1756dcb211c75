use std::net::{Ipv4Addr, SocketAddr};

use tracing_subscriber::EnvFilter;

use accountd::{app, initialize_state, scheduler};

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state = initialize_state().await?;

    // start the recurring account purge alongside the server.
    let mut purge = scheduler::start(
        state.users.clone(),
        state.config.purge.as_ref().and_then(|p| p.cron.clone()),
    )
    .await?;

    let port = std::env::var("PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "server started");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge.shutdown().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
        return;
    }

    tracing::info!("shutdown signal received");
}
