use serde::Serialize;
use shared::positions::PositionRecord;
use std::collections::BTreeMap;

/// Latest positions keyed by vehicle id.
pub type VehiclePositionsDto = BTreeMap<String, VehiclePositionDto>;

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehiclePositionDto {
    pub latitude: f64,
    pub longitude: f64,
    pub heading: f64,
    pub speed: f64,
    pub gps_timestamp: String,
    pub received_timestamp: String,
}

impl From<PositionRecord> for VehiclePositionDto {
    fn from(record: PositionRecord) -> Self {
        Self {
            latitude: record.latitude,
            longitude: record.longitude,
            heading: record.heading,
            speed: record.speed,
            gps_timestamp: record.gps_timestamp,
            received_timestamp: record.received_timestamp,
        }
    }
}
