//! Export run results (CSV/JSON).
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::ResolvedLocation;
use crate::domain::{BacktestReport, ForecastSeries, RawRecord, StationSummary};
use crate::error::AppError;

fn create(path: &Path, what: &str) -> Result<BufWriter<File>, AppError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| AppError::new(2, format!("Failed to create {what} '{}': {e}", path.display())))
}

#[derive(Serialize)]
struct ForecastRow<'a> {
    station: &'a str,
    date: NaiveDate,
    year: i32,
    predicted: f64,
    floor: f64,
    cap: f64,
}

#[derive(Serialize)]
struct BacktestCsvRow {
    cutoff: NaiveDate,
    train_days: usize,
    bucket_start: u32,
    bucket_end: u32,
    n: usize,
    mae: f64,
    rmse: f64,
    /// Empty when every actual in the bucket was zero.
    mape: Option<f64>,
}

/// Serialize `rows` as CSV with a header row.
fn write_csv_rows<T: Serialize>(
    path: &Path,
    what: &str,
    rows: impl IntoIterator<Item = T>,
) -> Result<(), AppError> {
    let file = create(path, what)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write {what}: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write {what}: {e}")))
}

/// Daily forecast values.
pub fn write_forecast_csv(path: &Path, forecast: &ForecastSeries) -> Result<(), AppError> {
    let rows = forecast.points.iter().map(|p| ForecastRow {
        station: &forecast.station,
        date: p.date,
        year: p.year,
        predicted: p.value,
        floor: forecast.bounds.floor,
        cap: forecast.bounds.cap,
    });
    write_csv_rows(path, "forecast CSV", rows)
}

/// One row per fold and horizon bucket.
pub fn write_backtest_csv(path: &Path, report: &BacktestReport) -> Result<(), AppError> {
    let rows = report.folds.iter().flat_map(|fold| {
        fold.rows.iter().map(move |row| BacktestCsvRow {
            cutoff: row.cutoff,
            train_days: fold.train_days,
            bucket_start: row.bucket_start,
            bucket_end: row.bucket_end,
            n: row.n,
            mae: row.mae,
            rmse: row.rmse,
            mape: row.mape,
        })
    });
    write_csv_rows(path, "backtest CSV", rows)
}

#[derive(Serialize)]
struct SummaryExport<'a> {
    summary: &'a StationSummary,
    /// Flattened metrics; undefined values are written as `null`.
    metrics: BTreeMap<String, Option<f64>>,
    location: Option<&'a ResolvedLocation>,
}

/// Typed summary plus the flattened metric map, as pretty JSON.
pub fn write_summary_json(
    path: &Path,
    summary: &StationSummary,
    location: Option<&ResolvedLocation>,
) -> Result<(), AppError> {
    let mut file = create(path, "summary JSON")?;
    // JSON has no NaN.
    let metrics = summary
        .to_metrics()
        .into_iter()
        .map(|(k, v)| (k, v.is_finite().then_some(v)))
        .collect();
    let export = SummaryExport {
        summary,
        metrics,
        location,
    };
    serde_json::to_writer_pretty(&mut file, &export)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    file.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))
}

/// Raw records in the ride-file schema (readable by `io::ingest`).
pub fn write_records_csv(path: &Path, records: &[RawRecord]) -> Result<(), AppError> {
    write_csv_rows(path, "records CSV", records)
}
