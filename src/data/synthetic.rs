//! Synthetic station ride files.
//!
//! Generates CTA-style `RawRecord`s with weekly and yearly structure, slow
//! growth, multiplicative log-normal noise, and the same defects real extracts
//! have: missing days and duplicated dates (the duplicate always carries the
//! smaller count, so keep-max normalization recovers the clean value).

use std::collections::hash_map::DefaultHasher;
use std::f64::consts::PI;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DEFAULT_DATE_FORMAT, RawRecord};
use crate::error::RidershipError;

/// Saturday and Sunday/holiday ridership relative to a weekday.
const SAT_FACTOR: f64 = 0.6;
const SUN_FACTOR: f64 = 0.45;

#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub station: String,
    pub station_id: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Weekday ridership at `start`.
    pub weekday_level: f64,
    /// Relative growth per year.
    pub growth_per_year: f64,
    /// Relative amplitude of the yearly cycle (peak in late summer).
    pub seasonal_amplitude: f64,
    /// Standard deviation of the log-noise.
    pub noise_sigma: f64,
    pub missing_prob: f64,
    pub duplicate_prob: f64,
    pub seed: u64,
}

impl SyntheticSpec {
    pub fn new(station: impl Into<String>, start: NaiveDate, end: NaiveDate, seed: u64) -> Self {
        Self {
            station: station.into(),
            station_id: "40000".to_string(),
            start,
            end,
            weekday_level: 4_000.0,
            growth_per_year: 0.03,
            seasonal_amplitude: 0.12,
            noise_sigma: 0.05,
            missing_prob: 0.01,
            duplicate_prob: 0.01,
            seed,
        }
    }
}

/// Raw day-type code the CTA export would log for `date`.
pub fn day_type_code(date: NaiveDate) -> &'static str {
    let holiday = matches!((date.month(), date.day()), (1, 1) | (7, 4) | (12, 25));
    match date.weekday() {
        _ if holiday => "U",
        Weekday::Sun => "U",
        Weekday::Sat => "A",
        _ => "W",
    }
}

pub fn generate_records(spec: &SyntheticSpec) -> Result<Vec<RawRecord>, RidershipError> {
    if spec.end < spec.start {
        return Err(RidershipError::InvalidConfig(format!(
            "synthetic range ends ({}) before it starts ({})",
            spec.end, spec.start
        )));
    }
    if !(0.0..1.0).contains(&spec.missing_prob) || !(0.0..1.0).contains(&spec.duplicate_prob) {
        return Err(RidershipError::InvalidConfig(
            "missing/duplicate probabilities must be in [0, 1)".to_string(),
        ));
    }
    if !(spec.weekday_level.is_finite() && spec.weekday_level > 0.0) {
        return Err(RidershipError::InvalidConfig("weekday level must be > 0".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(spec));
    let noise = Normal::new(0.0, spec.noise_sigma.max(0.0))
        .map_err(|e| RidershipError::InvalidConfig(format!("noise distribution error: {e}")))?;

    let mut out = Vec::new();
    for (i, date) in spec.start.iter_days().take_while(|d| *d <= spec.end).enumerate() {
        let code = day_type_code(date);
        let years = i as f64 / 365.25;
        let seasonal = 1.0 + spec.seasonal_amplitude * (2.0 * PI * (date.ordinal() as f64 - 220.0) / 365.25).cos();
        let day_factor = match code {
            "A" => SAT_FACTOR,
            "U" => SUN_FACTOR,
            _ => 1.0,
        };
        let level = spec.weekday_level * (1.0 + spec.growth_per_year).powf(years) * seasonal * day_factor;
        let rides = (level * noise.sample(&mut rng).exp()).round();

        // The first and last day are always logged so the extract's range is exact.
        let edge = date == spec.start || date == spec.end;
        if !edge && rng.gen_bool(spec.missing_prob) {
            continue;
        }

        let record = RawRecord {
            station_id: spec.station_id.clone(),
            station_name: spec.station.clone(),
            date: date.format(DEFAULT_DATE_FORMAT).to_string(),
            day_type: code.to_string(),
            rides,
        };

        if rng.gen_bool(spec.duplicate_prob) {
            let mut dup = record.clone();
            dup.rides = (rides * rng.gen_range(0.2..0.9)).floor();
            out.push(dup);
        }
        out.push(record);
    }

    Ok(out)
}

fn sample_seed(spec: &SyntheticSpec) -> u64 {
    let mut hasher = DefaultHasher::new();
    spec.station.hash(&mut hasher);
    spec.start.hash(&mut hasher);
    spec.end.hash(&mut hasher);
    spec.seed.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::normalize;
    use crate::domain::NormalizeConfig;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn same_seed_same_records() {
        let spec = SyntheticSpec::new("Morse", d(2018, 1, 1), d(2018, 3, 31), 7);
        assert_eq!(generate_records(&spec).unwrap(), generate_records(&spec).unwrap());
    }

    #[test]
    fn records_span_the_requested_range() {
        let spec = SyntheticSpec::new("Morse", d(2018, 1, 1), d(2018, 12, 31), 1);
        let records = generate_records(&spec).unwrap();
        let series = normalize("Morse", &records, &NormalizeConfig::default()).unwrap();
        assert_eq!(series.first_date(), spec.start);
        assert_eq!(series.last_date(), spec.end);
        assert_eq!(series.len(), 365);
        assert!(records.iter().all(|r| r.rides >= 0.0));
    }

    #[test]
    fn holidays_are_sunday_schedule() {
        assert_eq!(day_type_code(d(2019, 12, 25)), "U");
        assert_eq!(day_type_code(d(2019, 12, 24)), "W");
        assert_eq!(day_type_code(d(2019, 12, 28)), "A");
    }

    #[test]
    fn rejects_inverted_range() {
        let spec = SyntheticSpec::new("Morse", d(2019, 1, 1), d(2018, 1, 1), 1);
        assert!(generate_records(&spec).is_err());
    }
}
