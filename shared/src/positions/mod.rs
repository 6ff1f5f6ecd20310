//! Vehicle position records read from the external position log, and the
//! latest-per-vehicle view derived from them.

pub mod reducer;
pub mod source;

use crate::positions::error::SourceError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// One row of the position log.
///
/// Column names are fixed by whatever writes the log, so they only apply when
/// deserializing; the record serializes with its own field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    #[serde(rename(deserialize = "ID"))]
    pub vehicle_id: String,
    #[serde(rename(deserialize = "LATITUD"))]
    pub latitude: f64,
    #[serde(rename(deserialize = "LONGITUD"))]
    pub longitude: f64,
    /// Degrees clockwise from north
    #[serde(rename(deserialize = "RUMBO"))]
    pub heading: f64,
    /// km/h
    #[serde(rename(deserialize = "VELOCIDAD"))]
    pub speed: f64,
    #[serde(rename(deserialize = "FECHAGPS"))]
    pub gps_timestamp: String,
    #[serde(rename(deserialize = "FECHARECIBIDO"))]
    pub received_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub vehicle_id: String,
    pub latest: PositionRecord,
}

impl VehicleSnapshot {
    pub fn new(latest: PositionRecord) -> Self {
        Self {
            vehicle_id: latest.vehicle_id.clone(),
            latest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Centroid {
    pub latitude: f64,
    pub longitude: f64,
}

/// Result of one read of the position log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FleetSnapshot {
    /// Ordered by the first appearance of each vehicle id in the log
    pub vehicles: Vec<VehicleSnapshot>,
    pub centroid: Option<Centroid>,
    pub skipped_rows: usize,
}

impl FleetSnapshot {
    pub fn from_records(records: Vec<PositionRecord>, skipped_rows: usize) -> Self {
        let vehicles = reducer::latest_positions(records);
        let centroid = reducer::centroid(&vehicles);
        Self {
            vehicles,
            centroid,
            skipped_rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

/// Reads the position log on the blocking pool and reduces it to the latest
/// position of each vehicle.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn load_fleet(path: PathBuf) -> Result<FleetSnapshot, SourceError> {
    let read = tokio::task::spawn_blocking(move || source::read_positions(&path)).await??;
    let total_rows = read.records.len();
    let fleet = FleetSnapshot::from_records(read.records, read.skipped_rows);
    debug!(
        name: "fleet.loaded",
        rows = total_rows,
        skipped_rows = fleet.skipped_rows,
        vehicles = fleet.vehicles.len(),
        "position log reduced to latest positions"
    );
    Ok(fleet)
}

pub mod error {
    use std::path::PathBuf;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum SourceError {
        #[error("failed to open position log {path}: {source}")]
        Open {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        #[error("failed to read position log: {0}")]
        Csv(#[from] csv::Error),
        #[error("position log is missing required columns: {0}")]
        MissingColumns(String),
        #[error("position log reader task failed: {0}")]
        Join(#[from] tokio::task::JoinError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn load_fleet_reads_and_reduces() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ID,LATITUD,LONGITUD,RUMBO,VELOCIDAD,FECHAGPS,FECHARECIBIDO\n\
             A,10.0,20.0,90,50,2024-01-01 10:00:00,2024-01-01 10:00:02\n\
             B,30.0,40.0,180,0,2024-01-01 10:00:01,2024-01-01 10:00:03\n\
             A,12.0,22.0,95,55,2024-01-01 10:00:20,2024-01-01 10:00:21"
        )
        .unwrap();

        let fleet = load_fleet(file.path().to_path_buf()).await.unwrap();

        assert_eq!(fleet.vehicles.len(), 2);
        assert_eq!(fleet.vehicles[0].vehicle_id, "A");
        assert_eq!(fleet.vehicles[0].latest.latitude, 12.0);
        assert_eq!(fleet.vehicles[1].vehicle_id, "B");
        assert_eq!(
            fleet.centroid,
            Some(Centroid {
                latitude: 21.0,
                longitude: 31.0
            })
        );
        assert_eq!(fleet.skipped_rows, 0);
    }

    #[tokio::test]
    async fn load_fleet_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let fleet = load_fleet(dir.path().join("absent.csv")).await.unwrap();
        assert!(fleet.is_empty());
        assert_eq!(fleet.centroid, None);
    }

    #[test]
    fn record_serializes_with_field_names() {
        let record = PositionRecord {
            vehicle_id: "7".to_string(),
            latitude: 1.5,
            longitude: -2.5,
            heading: 270.0,
            speed: 12.0,
            gps_timestamp: "t1".to_string(),
            received_timestamp: "t2".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["vehicle_id"], "7");
        assert_eq!(value["latitude"], 1.5);
        assert_eq!(value["received_timestamp"], "t2");
        assert!(value.get("ID").is_none());
    }
}
