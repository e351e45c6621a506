//! Descriptive statistics over the enriched series.

pub mod trend;

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::domain::{EnrichedDay, EnrichedSeries, MeanStd, StationSummary, SummaryConfig};

pub use trend::five_year_trend;

/// Compute the station summary (no forecast metrics yet).
///
/// The enriched series is never empty, so the overall statistics always exist.
pub fn summarize(enriched: &EnrichedSeries, config: &SummaryConfig) -> StationSummary {
    let rides: Vec<f64> = enriched.days.iter().map(|d| d.rides).collect();
    let daily = MeanStd::from_values(&rides).unwrap_or(MeanStd {
        count: 0,
        mean: f64::NAN,
        std: None,
    });

    let by_day_type = grouped(&enriched.days, |d| d.day_type);
    let by_season = grouped(&enriched.days, |d| d.season);
    let by_year = grouped(&enriched.days, |d| d.year);

    let mut recent_years = BTreeMap::new();
    if let (Some(reference), Some(first), Some(last)) =
        (last_full_year(enriched), enriched.first_date(), enriched.last_date())
    {
        for year in [reference - 1, reference] {
            if !is_full_year(first, last, year) {
                continue;
            }
            if let Some(stats) = by_year.get(&year) {
                recent_years.insert(year, *stats);
            }
        }
    }

    let trend = five_year_trend(&by_year, config);

    log::debug!(
        "summary {}: {} days, {} day types, trend years with data = {}",
        enriched.station,
        daily.count,
        by_day_type.len(),
        trend.num_years
    );

    StationSummary {
        station: enriched.station.clone(),
        num_na: enriched.num_na,
        daily,
        by_day_type,
        by_season,
        recent_years,
        trend,
        predicted: BTreeMap::new(),
    }
}

/// Most recent calendar year that is fully covered by the extract.
///
/// The last year counts only if the data runs through 31 December; otherwise
/// it is a partial year and the one before it is the candidate. The data must
/// also begin on or before 1 January of the candidate, or there is no full year.
pub fn last_full_year(enriched: &EnrichedSeries) -> Option<i32> {
    let first = enriched.first_date()?;
    let last = enriched.last_date()?;
    let candidate = if last.month() == 12 && last.day() == 31 {
        last.year()
    } else {
        last.year() - 1
    };
    is_full_year(first, last, candidate).then_some(candidate)
}

/// `[first, last]` spans 1 January through 31 December of `year`.
fn is_full_year(first: NaiveDate, last: NaiveDate, year: i32) -> bool {
    match (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) {
        (Some(start), Some(end)) => first <= start && last >= end,
        _ => false,
    }
}

fn grouped<K: Ord + Copy>(days: &[EnrichedDay], key: impl Fn(&EnrichedDay) -> K) -> BTreeMap<K, MeanStd> {
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for day in days {
        groups.entry(key(day)).or_default().push(day.rides);
    }
    groups
        .into_iter()
        .filter_map(|(k, values)| MeanStd::from_values(&values).map(|s| (k, s)))
        .collect()
}
