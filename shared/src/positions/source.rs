use crate::positions::PositionRecord;
use crate::positions::error::SourceError;
use csv::{ErrorKind, Position, ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::warn;

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "ID",
    "LATITUD",
    "LONGITUD",
    "RUMBO",
    "VELOCIDAD",
    "FECHAGPS",
    "FECHARECIBIDO",
];

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SourceRead {
    /// In file order
    pub records: Vec<PositionRecord>,
    pub skipped_rows: usize,
    /// Line of the first skipped row
    pub first_skipped_line: Option<u64>,
}

pub fn read_positions(path: &Path) -> Result<SourceRead, SourceError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(name: "source.missing", path = %path.display(), "position log not found");
            return Ok(SourceRead::default());
        }
        Err(source) => {
            return Err(SourceError::Open {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    read_from(file)
}

pub fn read_from<R: Read>(reader: R) -> Result<SourceRead, SourceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Ok(SourceRead::default());
    }
    let missing = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .copied()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(SourceError::MissingColumns(missing.join(", ")));
    }

    let mut read = SourceRead::default();
    let mut first_rejection: Option<(u64, String)> = None;
    let mut row = StringRecord::new();
    loop {
        // Rows the reader rejects take their line from the error, not from `row`.
        let outcome = match reader.read_record(&mut row) {
            Ok(false) => break,
            Ok(true) => row
                .deserialize::<PositionRecord>(Some(&headers))
                .map_err(|e| e.to_string())
                .and_then(|record| check_record(&record).map(|()| record))
                .map_err(|reason| (row.position().map_or(0, Position::line), reason)),
            Err(e) if matches!(e.kind(), ErrorKind::Io(_)) => return Err(e.into()),
            Err(e) => Err((e.position().map_or(0, Position::line), e.to_string())),
        };

        match outcome {
            Ok(record) => read.records.push(record),
            Err(rejection) => {
                read.skipped_rows += 1;
                first_rejection.get_or_insert(rejection);
            }
        }
    }

    if let Some((line, reason)) = first_rejection {
        read.first_skipped_line = Some(line);
        warn!(
            name: "source.rows.skipped",
            skipped_rows = read.skipped_rows,
            first_line = line,
            first_reason = %reason,
            "skipped unparseable rows in position log"
        );
    }

    Ok(read)
}

fn check_record(record: &PositionRecord) -> Result<(), String> {
    if record.vehicle_id.is_empty() {
        return Err("empty vehicle id".to_string());
    }
    if !(record.latitude.is_finite() && (-90.0..=90.0).contains(&record.latitude)) {
        return Err(format!("latitude {} out of range", record.latitude));
    }
    if !(record.longitude.is_finite() && (-180.0..=180.0).contains(&record.longitude)) {
        return Err(format!("longitude {} out of range", record.longitude));
    }
    if !record.heading.is_finite() || !record.speed.is_finite() {
        return Err("heading and speed must be finite".to_string());
    }
    Ok(())
}
