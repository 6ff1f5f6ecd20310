use crate::api::api_models::{VehiclePositionDto, VehiclePositionsDto};
use crate::api::error::ApiError;
use crate::state::PositionSource;
use axum::Json;
use axum::extract::State;

pub async fn get_vehicles(
    State(source): State<PositionSource>,
) -> Result<Json<VehiclePositionsDto>, ApiError> {
    let fleet = source.load().await?;
    let vehicles = fleet
        .vehicles
        .into_iter()
        .map(|v| (v.vehicle_id, VehiclePositionDto::from(v.latest)))
        .collect();
    Ok(Json(vehicles))
}
