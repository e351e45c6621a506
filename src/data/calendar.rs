//! Calendar enrichment and the missing-data policy.
//!
//! A day survives enrichment only if it has a ride count and a recognized
//! day-type code. Everything else is counted into `num_na` and dropped.

use crate::domain::{DailySeries, DayType, EnrichedDay, EnrichedSeries};
use crate::error::RidershipError;

pub fn enrich(series: &DailySeries) -> Result<EnrichedSeries, RidershipError> {
    let mut days = Vec::with_capacity(series.len());
    let mut num_na = 0usize;

    for obs in series.days() {
        let day_type = obs.day_type.as_deref().and_then(DayType::from_code);
        match (obs.rides, day_type, obs.day_type.as_ref()) {
            (Some(rides), Some(day_type), Some(code)) => {
                days.push(EnrichedDay::new(obs.date, rides, code.clone(), day_type));
            }
            _ => num_na += 1,
        }
    }

    if days.is_empty() {
        return Err(RidershipError::InsufficientData {
            station: series.station().to_string(),
            removed: num_na,
        });
    }

    log::debug!(
        "enriched {}: kept {} days, removed {num_na} missing",
        series.station(),
        days.len()
    );

    Ok(EnrichedSeries {
        station: series.station().to_string(),
        days,
        num_na,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::normalize;
    use crate::domain::{NormalizeConfig, RawRecord, Season};
    use chrono::{Datelike, NaiveDate};

    fn code_for(date: NaiveDate) -> &'static str {
        match date.weekday() {
            chrono::Weekday::Sat => "A",
            chrono::Weekday::Sun => "U",
            _ => "W",
        }
    }

    fn records(start: NaiveDate, n: usize, skip: &[usize]) -> Vec<RawRecord> {
        start
            .iter_days()
            .take(n)
            .enumerate()
            .filter(|(i, _)| !skip.contains(i))
            .map(|(i, date)| RawRecord {
                station_id: "1".into(),
                station_name: "Morse".into(),
                date: date.format("%m/%d/%Y").to_string(),
                day_type: code_for(date).into(),
                rides: 100.0 + i as f64,
            })
            .collect()
    }

    #[test]
    fn num_na_counts_injected_gaps() {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let gaps = [3, 7, 8, 20, 45];
        let series = normalize("Morse", &records(start, 60, &gaps), &NormalizeConfig::default()).unwrap();
        let enriched = enrich(&series).unwrap();

        assert_eq!(enriched.num_na, gaps.len());
        assert_eq!(series.len() - enriched.days.len(), enriched.num_na);
    }

    #[test]
    fn unknown_day_type_counts_as_missing() {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let mut recs = records(start, 5, &[]);
        recs[2].day_type = "Z".into();
        let series = normalize("Morse", &recs, &NormalizeConfig::default()).unwrap();
        let enriched = enrich(&series).unwrap();
        assert_eq!(enriched.num_na, 1);
        assert_eq!(enriched.days.len(), 4);
    }

    #[test]
    fn seasons_follow_month_for_any_year() {
        for year in [1999, 2012, 2020] {
            for (month, season) in [
                (1, Season::Winter),
                (4, Season::Spring),
                (7, Season::Summer),
                (10, Season::Fall),
                (12, Season::Winter),
            ] {
                let start = NaiveDate::from_ymd_opt(year, month, 15).unwrap();
                let series = normalize("Morse", &records(start, 1, &[]), &NormalizeConfig::default())
                    .unwrap();
                let enriched = enrich(&series).unwrap();
                assert_eq!(enriched.days[0].season, season);
                assert_eq!(enriched.days[0].year, year);
            }
        }
    }

    #[test]
    fn day_type_labels_assigned() {
        // 2019-01-05 is a Saturday.
        let start = NaiveDate::from_ymd_opt(2019, 1, 4).unwrap();
        let series = normalize("Morse", &records(start, 3, &[]), &NormalizeConfig::default()).unwrap();
        let enriched = enrich(&series).unwrap();
        let labels: Vec<DayType> = enriched.days.iter().map(|d| d.day_type).collect();
        assert_eq!(labels, vec![DayType::Weekday, DayType::Sat, DayType::SunHol]);
    }

    #[test]
    fn all_missing_is_insufficient() {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let mut recs = records(start, 3, &[]);
        for r in &mut recs {
            r.day_type = "?".into();
        }
        let series = normalize("Morse", &recs, &NormalizeConfig::default()).unwrap();
        let err = enrich(&series).unwrap_err();
        assert_eq!(
            err,
            RidershipError::InsufficientData {
                station: "Morse".into(),
                removed: 3
            }
        );
    }
}
