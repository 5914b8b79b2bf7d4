use std::net::SocketAddr;

use tokio::task;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use showtime_system::{app, config::Config, services::sweep::SweepService, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Showtime API in {} mode", config.app.environment);

    let host = config.app.host.clone();
    let port = config.app.port;
    let state = AppState::new(config).await?;

    // --- Start background tasks ---

    // Reclaim expired seat blocks on a fixed interval
    let sweep = SweepService::new(
        state.repo.clone(),
        state.events.clone(),
        state.config.booking.sweep_interval_secs,
    );
    task::spawn(sweep.run());

    // --- Start the web server ---

    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}
