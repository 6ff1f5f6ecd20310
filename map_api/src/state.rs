use axum::extract::FromRef;
use shared::positions::error::SourceError;
use shared::positions::{FleetSnapshot, load_fleet};
use shared::{Config, MapConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub source: PositionSource,
    pub map: Arc<MapConfig>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source: PositionSource {
                csv_path: Arc::new(config.source.csv_path.clone()),
            },
            map: Arc::new(config.map.clone()),
        }
    }
}

/// The position log, read afresh on every request.
#[derive(Clone)]
pub struct PositionSource {
    csv_path: Arc<PathBuf>,
}

impl PositionSource {
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub async fn load(&self) -> Result<FleetSnapshot, SourceError> {
        load_fleet(self.csv_path.to_path_buf()).await
    }
}
