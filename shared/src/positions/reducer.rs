use crate::positions::{Centroid, PositionRecord, VehicleSnapshot};
use std::collections::HashMap;

/// Keeps the last record seen for every vehicle id. Vehicles come out in the
/// order their id first appeared.
pub fn latest_positions(records: impl IntoIterator<Item = PositionRecord>) -> Vec<VehicleSnapshot> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut snapshots: Vec<VehicleSnapshot> = Vec::new();

    for record in records {
        if let Some(&slot) = slots.get(&record.vehicle_id) {
            snapshots[slot].latest = record;
        } else {
            slots.insert(record.vehicle_id.clone(), snapshots.len());
            snapshots.push(VehicleSnapshot::new(record));
        }
    }

    snapshots
}

pub fn centroid(snapshots: &[VehicleSnapshot]) -> Option<Centroid> {
    if snapshots.is_empty() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = snapshots.len() as f64;
    let (latitude_sum, longitude_sum) = snapshots.iter().fold((0.0, 0.0), |(lat, lon), s| {
        (lat + s.latest.latitude, lon + s.latest.longitude)
    });

    Some(Centroid {
        latitude: latitude_sum / count,
        longitude: longitude_sum / count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, latitude: f64, longitude: f64, gps_timestamp: &str) -> PositionRecord {
        PositionRecord {
            vehicle_id: id.to_string(),
            latitude,
            longitude,
            heading: 0.0,
            speed: 0.0,
            gps_timestamp: gps_timestamp.to_string(),
            received_timestamp: gps_timestamp.to_string(),
        }
    }

    #[test]
    fn one_snapshot_per_vehicle() {
        let snapshots = latest_positions(vec![
            record("A", 1.0, 1.0, "t1"),
            record("B", 2.0, 2.0, "t1"),
            record("A", 3.0, 3.0, "t2"),
            record("C", 4.0, 4.0, "t2"),
            record("B", 5.0, 5.0, "t3"),
        ]);

        let ids = snapshots
            .iter()
            .map(|s| s.vehicle_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert!(snapshots.iter().all(|s| s.vehicle_id == s.latest.vehicle_id));
    }

    #[test]
    fn last_row_wins_even_when_older() {
        // File order decides, not the timestamp column
        let snapshots = latest_positions(vec![
            record("A", 1.0, 1.0, "2024-01-01 12:00:00"),
            record("A", 2.0, 2.0, "2024-01-01 11:00:00"),
        ]);

        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].latest.latitude, 2.0);
        assert_eq!(snapshots[0].latest.gps_timestamp, "2024-01-01 11:00:00");
    }

    #[test]
    fn no_records_no_snapshots() {
        assert!(latest_positions(Vec::new()).is_empty());
        assert_eq!(centroid(&[]), None);
    }

    #[test]
    fn centroid_is_mean_of_latest_positions() {
        let snapshots = latest_positions(vec![
            record("A", 100.0, 100.0, "t0"),
            record("A", -10.0, 20.0, "t1"),
            record("B", 10.0, 40.0, "t1"),
            record("C", 30.0, -30.0, "t1"),
        ]);

        assert_eq!(
            centroid(&snapshots),
            Some(Centroid {
                latitude: 10.0,
                longitude: 10.0
            })
        );
    }

    #[test]
    fn centroid_of_single_vehicle_is_its_position() {
        let snapshots = latest_positions(vec![record("A", -34.6037, -58.3816, "t")]);
        assert_eq!(
            centroid(&snapshots),
            Some(Centroid {
                latitude: -34.6037,
                longitude: -58.3816
            })
        );
    }
}
