use clap::Parser;
use map_api::app;
use map_api::state::AppState;
use shared::cli::{ConfigOverrides, ServerArgs};
use shared::{init_tracing, load_config, shutdown_listener};
use tracing::info;

/// Serves the vehicle map and the latest positions over HTTP.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    args: ServerArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing()?;

    let config = load_config(&ConfigOverrides::from(&cli.args))?;
    info!(name: "config.loaded", config = ?config, "config loaded");

    let listen_addr = config.server.listen_addr();
    let app = app(AppState::from_config(&config));

    info!(name: "server.starting", "starting server at http://{listen_addr}");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_listener(None))
        .await?;

    Ok(())
}
