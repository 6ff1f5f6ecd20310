use crate::RefresherState;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use chrono::{TimeDelta, Utc};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Number of refresh intervals without a successful refresh before the
/// refresher reports itself unhealthy.
const STALE_AFTER_INTERVALS: u32 = 3;

pub async fn run_health_server(
    state: RefresherState,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let listen_addr = state.config.refresher.health_listen_addr.clone();
    info!(name: "axum.health.starting", listen_addr = %listen_addr, "starting axum health server");
    let app = Router::new()
        .route("/health", get(health_check))
        .with_state(state);
    let listener = TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await?;
    Ok(())
}

pub async fn health_check(State(state): State<RefresherState>) -> impl IntoResponse {
    let last_attempted_refresh = *state.last_attempted_refresh.read();
    let last_successful_refresh = *state.last_successful_refresh.read();
    let last_error = if let Some(e) = state.last_error.read().as_ref() {
        format!("{e}")
    } else {
        "unknown".to_string()
    };

    let stale_after = TimeDelta::from_std(
        state
            .config
            .refresher
            .interval()
            .saturating_mul(STALE_AFTER_INTERVALS),
    )
    .unwrap_or(TimeDelta::MAX);

    match (last_attempted_refresh, last_successful_refresh) {
        (None, _) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "No attempted or successful map refreshes".to_string(),
        ),
        (Some(last_attempted_refresh), None) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!(
                "Map has not been successfully refreshed. Last attempted refresh: {last_attempted_refresh}. Last error: {last_error}"
            ),
        ),
        (Some(last_attempted_refresh), Some(last_successful_refresh))
            if (Utc::now() - last_successful_refresh) > stale_after =>
        {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Map not refreshed in the last {} seconds. Last successful refresh: {last_successful_refresh}. Last attempted refresh: {last_attempted_refresh}. Last error: {last_error}",
                    stale_after.num_seconds()
                ),
            )
        }
        (Some(_), Some(last_successful_refresh)) => (
            StatusCode::OK,
            format!("Map last successfully refreshed: {last_successful_refresh}"),
        ),
    }
}
