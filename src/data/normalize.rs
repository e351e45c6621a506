//! Raw records → gap-free daily series.
//!
//! Duplicate dates are resolved by keeping the record with the largest ride
//! count. Calendar days with no record become explicit missing entries.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{DailySeries, DayObservation, NormalizeConfig, RawRecord};
use crate::error::RidershipError;

/// Records whose station name equals `station` exactly.
pub fn filter_station(records: &[RawRecord], station: &str) -> Vec<RawRecord> {
    records
        .iter()
        .filter(|r| r.station_name == station)
        .cloned()
        .collect()
}

/// Build the daily series for one station's records.
///
/// Fails on the first unparseable date; the caller decides whether to drop
/// the record and retry.
pub fn normalize(
    station: &str,
    records: &[RawRecord],
    config: &NormalizeConfig,
) -> Result<DailySeries, RidershipError> {
    if records.is_empty() {
        return Err(RidershipError::EmptyInput {
            station: station.to_string(),
        });
    }

    let mut by_date: BTreeMap<NaiveDate, DayObservation> = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        let date = NaiveDate::parse_from_str(record.date.trim(), &config.date_format).map_err(|_| {
            RidershipError::MalformedDate {
                index,
                value: record.date.clone(),
                format: config.date_format.clone(),
            }
        })?;

        let candidate = DayObservation {
            date,
            rides: record.rides.is_finite().then_some(record.rides),
            day_type: Some(record.day_type.clone()),
        };

        match by_date.get_mut(&date) {
            Some(kept) => {
                if replaces(kept.rides, candidate.rides) {
                    *kept = candidate;
                }
            }
            None => {
                by_date.insert(date, candidate);
            }
        }
    }

    let (Some(&first), Some(&last)) = (by_date.keys().next(), by_date.keys().next_back()) else {
        return Err(RidershipError::EmptyInput {
            station: station.to_string(),
        });
    };

    let days: Vec<DayObservation> = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| by_date.remove(&d).unwrap_or_else(|| DayObservation::missing(d)))
        .collect();

    log::debug!(
        "normalized {station}: {} records -> {} days ({} missing) from {first} to {last}",
        records.len(),
        days.len(),
        days.iter().filter(|d| d.rides.is_none()).count(),
    );

    Ok(DailySeries::from_contiguous(station, days))
}

/// Keep-max tie-break: a later record wins when its ride count is at least as
/// large as the one kept so far. A missing count never beats a present one.
fn replaces(kept: Option<f64>, candidate: Option<f64>) -> bool {
    match (kept, candidate) {
        (Some(k), Some(c)) => c >= k,
        (None, _) => true,
        (Some(_), None) => false,
    }
}
