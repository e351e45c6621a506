//! CSV ingest for ride files and the station map.
//!
//! This module turns a CTA-style ridership export into `RawRecord`s. It does
//! no normalization: dates stay raw strings (the pipeline parses them with the
//! configured format) and duplicates are kept.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Separation of concerns**: no statistics or fitting here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::RawRecord;
use crate::error::AppError;

const RIDE_COLUMNS: [&str; 5] = ["station_id", "stationname", "date", "daytype", "rides"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub station: Option<String>,
    pub message: String,
}

/// Ingest output: parsed records + row errors.
#[derive(Debug, Clone)]
pub struct IngestedRecords {
    pub records: Vec<RawRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load every row of a ride file.
pub fn load_ride_records(path: &Path) -> Result<IngestedRecords, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_ride_records(file)
}

pub fn read_ride_records<R: Read>(source: R) -> Result<IngestedRecords, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for name in RIDE_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::new(2, format!("Missing required column: `{name}`")));
        }
    }

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    station: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(row) => records.push(row),
            Err(message) => row_errors.push(RowError {
                line,
                station: get_optional(&record, &header_map, "stationname").map(str::to_string),
                message,
            }),
        }
    }

    log::debug!(
        "ingest: {rows_read} rows read, {} records, {} row errors",
        records.len(),
        row_errors.len()
    );

    Ok(IngestedRecords {
        records,
        row_errors,
        rows_read,
    })
}

/// Load the station map (`STATION_NAME`, `Location`) as name → raw location string.
///
/// The map lists one row per platform, so a station may repeat; the first row wins.
pub fn load_station_map(path: &Path) -> Result<HashMap<String, String>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open station map '{}': {e}", path.display())))?;
    read_station_map(file)
}

pub fn read_station_map<R: Read>(source: R) -> Result<HashMap<String, String>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read station map headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    for name in ["station_name", "location"] {
        if !header_map.contains_key(name) {
            return Err(AppError::new(2, format!("Station map is missing column: `{name}`")));
        }
    }

    let mut out = HashMap::new();
    for record in reader.records().flatten() {
        let (Some(name), Some(location)) = (
            get_optional(&record, &header_map, "station_name"),
            get_optional(&record, &header_map, "location"),
        ) else {
            continue;
        };
        out.entry(name.to_string()).or_insert_with(|| location.to_string());
    }
    Ok(out)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<RawRecord, String> {
    let station_id = get_required(record, header_map, "station_id")?.to_string();
    let station_name = get_required(record, header_map, "stationname")?.to_string();
    let date = get_required(record, header_map, "date")?.to_string();
    let day_type = get_optional(record, header_map, "daytype").unwrap_or("").to_string();

    // An empty count is a logged-but-unknown day; normalization treats it as missing.
    let rides = match get_optional(record, header_map, "rides") {
        None => f64::NAN,
        Some(s) => s
            .replace(',', "")
            .parse::<f64>()
            .map_err(|_| format!("Invalid `rides` value: {s:?}"))?,
    };
    if rides < 0.0 {
        return Err(format!("Negative `rides` value: {rides}"));
    }

    Ok(RawRecord {
        station_id,
        station_name,
        date,
        day_type,
        rides,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_and_reports_bad_ones() {
        let csv = "\u{feff}station_id,stationname,date,daytype,rides\n\
                   40010,Austin-Forest Park,01/01/2019,U,290\n\
                   40010,Austin-Forest Park,01/02/2019,W,\"1,172\"\n\
                   40010,Austin-Forest Park,01/03/2019,W,lots\n\
                   40010,,01/04/2019,W,900\n\
                   40010,Austin-Forest Park,01/05/2019,A,\n";
        let out = read_ride_records(csv.as_bytes()).unwrap();

        assert_eq!(out.rows_read, 5);
        assert_eq!(out.records.len(), 3);
        assert_eq!(out.records[1].rides, 1172.0);
        assert!(out.records[2].rides.is_nan());
        assert_eq!(out.row_errors.len(), 2);
        assert_eq!(out.row_errors[0].line, 4);
        assert_eq!(out.row_errors[0].station.as_deref(), Some("Austin-Forest Park"));
        assert_eq!(out.row_errors[1].station, None);
    }

    #[test]
    fn missing_column_is_a_schema_error() {
        let csv = "station_id,stationname,date,rides\n1,A,01/01/2019,3\n";
        let err = read_ride_records(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("daytype"));
    }

    #[test]
    fn station_map_keeps_first_location() {
        let csv = "STOP_ID,STATION_NAME,Location\n\
                   30001,Morse,\"(42.008362, -87.665909)\"\n\
                   30002,Morse,\"(0.0, 0.0)\"\n\
                   30003,Loyola,\n";
        let map = read_station_map(csv.as_bytes()).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["Morse"], "(42.008362, -87.665909)");
    }
}
