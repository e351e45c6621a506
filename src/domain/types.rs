//! Record and series types.
//!
//! The pipeline moves through three shapes of data:
//!
//! - `RawRecord`: one logged row, possibly duplicated, possibly with gaps between dates
//! - `DailySeries`: exactly one `DayObservation` per calendar day, nulls allowed
//! - `EnrichedSeries`: complete days only, with season / day-type / year attached

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One ridership row as originally logged.
///
/// Field names follow the public CTA "L" station entries export
/// (`station_id,stationname,date,daytype,rides`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub station_id: String,
    #[serde(rename = "stationname")]
    pub station_name: String,
    pub date: String,
    #[serde(rename = "daytype")]
    pub day_type: String,
    pub rides: f64,
}

/// One calendar day of the normalized series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayObservation {
    pub date: NaiveDate,
    pub rides: Option<f64>,
    /// Raw day-type code as logged (e.g. `W`, `A`, `U`).
    pub day_type: Option<String>,
}

impl DayObservation {
    pub fn missing(date: NaiveDate) -> Self {
        Self {
            date,
            rides: None,
            day_type: None,
        }
    }
}

/// Gap-free daily series for one station.
///
/// Invariant: one entry per calendar day between the first and last date, in
/// strictly increasing order, and never empty. The fields are private so the
/// only ways to build one are the normalizer and `truncate_to`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySeries {
    station: String,
    days: Vec<DayObservation>,
}

impl DailySeries {
    pub(crate) fn from_contiguous(station: impl Into<String>, days: Vec<DayObservation>) -> Self {
        debug_assert!(!days.is_empty());
        debug_assert!(days.windows(2).all(|w| w[0].date.succ_opt() == Some(w[1].date)));
        Self {
            station: station.into(),
            days,
        }
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn days(&self) -> &[DayObservation] {
        &self.days
    }

    /// Number of calendar days (observed or missing).
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.days[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.days[self.days.len() - 1].date
    }

    /// Number of days that carry a ride count.
    pub fn observed_days(&self) -> usize {
        self.days.iter().filter(|d| d.rides.is_some()).count()
    }

    /// Largest observed ride count, if any day is observed.
    pub fn max_rides(&self) -> Option<f64> {
        self.days
            .iter()
            .filter_map(|d| d.rides)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }

    /// The first `len` days as a new series (a prefix keeps the invariant).
    ///
    /// Returns `None` for `len == 0`.
    pub fn truncate_to(&self, len: usize) -> Option<DailySeries> {
        if len == 0 {
            return None;
        }
        let len = len.min(self.days.len());
        Some(Self {
            station: self.station.clone(),
            days: self.days[..len].to_vec(),
        })
    }
}

/// Normalized schedule label for a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayType {
    Weekday,
    Sat,
    #[serde(rename = "Sun/Hol")]
    SunHol,
}

impl DayType {
    pub const ALL: [DayType; 3] = [DayType::Weekday, DayType::Sat, DayType::SunHol];

    /// Map a raw day-type code to its label.
    ///
    /// `W` = weekday, `A` = Saturday, `U` = Sunday/holiday. Unknown codes are
    /// treated as missing.
    pub fn from_code(code: &str) -> Option<DayType> {
        match code.trim().to_ascii_uppercase().as_str() {
            "W" => Some(DayType::Weekday),
            "A" => Some(DayType::Sat),
            "U" => Some(DayType::SunHol),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayType::Weekday => "Weekday",
            DayType::Sat => "Sat",
            DayType::SunHol => "Sun/Hol",
        }
    }
}

impl fmt::Display for DayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

    /// Fixed month → season table (meteorological seasons).
    ///
    /// December, January and February (and anything outside `1..=12`) are winter.
    pub fn from_month(month: u32) -> Season {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A complete day with derived calendar attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedDay {
    pub date: NaiveDate,
    pub rides: f64,
    pub day_type_code: String,
    pub day_type: DayType,
    pub season: Season,
    pub year: i32,
}

impl EnrichedDay {
    pub fn new(date: NaiveDate, rides: f64, day_type_code: String, day_type: DayType) -> Self {
        Self {
            date,
            rides,
            day_type_code,
            day_type,
            season: Season::from_month(date.month()),
            year: date.year(),
        }
    }
}

/// Enricher output: complete days plus the number of rows dropped as missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedSeries {
    pub station: String,
    pub days: Vec<EnrichedDay>,
    pub num_na: usize,
}

impl EnrichedSeries {
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }
}
