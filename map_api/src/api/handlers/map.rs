use crate::api::error::ApiError;
use crate::state::PositionSource;
use axum::extract::State;
use axum::response::Html;
use shared::MapConfig;
use shared::map::{empty_page, render_map};
use std::sync::Arc;
use tracing::debug;

/// Renders the current map, or a placeholder page while no vehicle has reported.
pub async fn get_map(
    State(source): State<PositionSource>,
    State(map): State<Arc<MapConfig>>,
) -> Result<Html<String>, ApiError> {
    let fleet = source.load().await?;
    if fleet.is_empty() {
        debug!(name: "api.map.empty", "no vehicle data, serving placeholder page");
        return Ok(Html(empty_page(source.csv_path())));
    }

    Ok(Html(render_map(&fleet, &map)?))
}
