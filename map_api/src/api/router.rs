use crate::api::handlers::map::get_map;
use crate::api::handlers::vehicles::get_vehicles;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;

pub fn router() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/", get(get_map))
        .route("/api/vehicles", get(get_vehicles))
}
