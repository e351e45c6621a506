//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the statistics/fitting code stays clean and testable
//! - output changes are localized

use crate::data::ResolvedLocation;
use crate::domain::{BacktestReport, Bounds, ForecastSeries, MeanStd, StationSummary};
use crate::fit::selection::FitSelection;
use crate::report::{DayResidual, Rankings};

/// Format the station summary (location, descriptive statistics, trend).
pub fn format_summary(summary: &StationSummary, location: Option<&ResolvedLocation>) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== ridership - {} ===\n", summary.station));
    match location {
        Some(loc) => out.push_str(&format!(
            "Location: ({:.6}, {:.6}) [{:?}]\n",
            loc.coordinate.latitude, loc.coordinate.longitude, loc.source
        )),
        None => out.push_str("Location: unknown\n"),
    }
    out.push_str(&format!(
        "Days: n={} | missing={}\n",
        summary.daily.count, summary.num_na
    ));

    out.push_str("\nRides per day:\n");
    out.push_str(&stats_header());
    out.push_str(&stats_row("daily", &summary.daily));
    for (day_type, stats) in &summary.by_day_type {
        out.push_str(&stats_row(day_type.label(), stats));
    }
    for (season, stats) in &summary.by_season {
        out.push_str(&stats_row(season.label(), stats));
    }
    for (year, stats) in &summary.recent_years {
        out.push_str(&stats_row(&year.to_string(), stats));
    }

    let trend = &summary.trend;
    out.push_str(&format!(
        "\nTrend {}-{}: years with data={} | mean diff={} | mean pct diff={}\n",
        trend.first_year,
        trend.last_year,
        trend.num_years,
        fmt_opt(trend.mean_num_diff, |v| format!("{v:+.1}")),
        fmt_opt(trend.mean_pct_diff, |v| format!("{:+.2}%", v * 100.0)),
    ));

    out
}

/// Format fit diagnostics for every attempted layout and the chosen one.
pub fn format_selection(selection: &FitSelection, bounds: Bounds) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Bounds: floor={:.1} cap={:.1}\n",
        bounds.floor, bounds.cap
    ));
    out.push_str("\nModel diagnostics:\n");
    for fit in &selection.fits {
        let chosen = if fit.layout == selection.best.layout { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:<36} SSE={:.3e} RMSE={:.2} BIC={:.3} iters={}\n",
            fit.layout.display_name(),
            fit.quality.sse,
            fit.quality.rmse,
            fit.quality.bic,
            fit.quality.iterations
        ));
    }
    for (layout, reason) in &selection.skipped {
        out.push_str(&format!("  (skipped {}) {reason}\n", layout.display_name()));
    }

    out.push_str("\nChosen model:\n");
    out.push_str(&format!("- {}\n", selection.best.layout.display_name()));
    out.push_str(&format!(
        "- changepoints: {}\n",
        fmt_vec(&selection.best.layout.changepoints)
    ));
    out.push_str(&format!("- params: {}\n", fmt_vec(&selection.best.params)));
    out.push('\n');

    out
}

/// Per-year mean/std of the projected values.
pub fn format_forecast_table(forecast: &ForecastSeries) -> String {
    let mut out = String::new();
    let (Some(first), Some(last)) = (forecast.points.first(), forecast.points.last()) else {
        return "Forecast: no points\n".to_string();
    };

    out.push_str(&format!(
        "Forecast {} .. {} ({} days):\n",
        first.date,
        last.date,
        forecast.points.len()
    ));
    out.push_str(&stats_header());
    for (year, stats) in forecast.yearly_stats() {
        out.push_str(&stats_row(&year.to_string(), &stats));
    }
    out
}

/// Backtest accuracy pooled per horizon bucket.
pub fn format_backtest(report: &BacktestReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Backtest: {} folds (initial={}d horizon={}d period={}d)\n",
        report.folds.len(),
        report.initial_days,
        report.horizon_days,
        report.period_days
    ));
    if report.folds.is_empty() {
        out.push_str("  history too short for a single fold\n");
        return out;
    }

    out.push_str(&format!(
        "{:<12} {:>8} {:>12} {:>12} {:>10}\n",
        "horizon", "n", "mae", "rmse", "mape"
    ));
    out.push_str(&format!("{:-<12} {:-<8} {:-<12} {:-<12} {:-<10}\n", "", "", "", "", ""));
    for row in report.by_horizon() {
        out.push_str(&format!(
            "{:<12} {:>8} {:>12.2} {:>12.2} {:>10}\n",
            format!("{}-{}d", row.bucket_start, row.bucket_end),
            row.n,
            row.mae,
            row.rmse,
            fmt_opt(row.mape, |v| format!("{:.2}%", v * 100.0)),
        ));
    }
    out
}

/// Format the days furthest above and below the fit.
pub fn format_rankings(rankings: &Rankings) -> String {
    let mut out = String::new();

    out.push_str("Top days above fit:\n");
    out.push_str(&format_residual_table(&rankings.above));
    out.push('\n');

    out.push_str("Top days below fit:\n");
    out.push_str(&format_residual_table(&rankings.below));

    out
}

fn format_residual_table(rows: &[DayResidual]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<12} {:>10} {:>10} {:>10}\n",
        "date", "actual", "fitted", "residual"
    ));
    out.push_str(&format!("{:-<12} {:-<10} {:-<10} {:-<10}\n", "", "", "", ""));
    for r in rows {
        out.push_str(&format!(
            "{:<12} {:>10.0} {:>10.1} {:>10.1}\n",
            r.date.to_string(),
            r.actual,
            r.fitted,
            r.residual
        ));
    }
    out
}

fn stats_header() -> String {
    format!(
        "{:<10} {:>8} {:>12} {:>12}\n{:-<10} {:-<8} {:-<12} {:-<12}\n",
        "group", "n", "mean", "std", "", "", "", ""
    )
}

fn stats_row(label: &str, stats: &MeanStd) -> String {
    format!(
        "{:<10} {:>8} {:>12.1} {:>12}\n",
        label,
        stats.count,
        stats.mean,
        fmt_opt(stats.std, |v| format!("{v:.1}"))
    )
}

fn fmt_opt(v: Option<f64>, f: impl Fn(f64) -> String) -> String {
    v.map(f).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BacktestFold, BacktestRow, ForecastPoint};
    use chrono::NaiveDate;

    #[test]
    fn forecast_table_lists_each_year() {
        let points = [(2020, 1, 1, 10.0), (2020, 12, 31, 20.0), (2021, 1, 1, 30.0)]
            .iter()
            .map(|&(y, m, d, value)| ForecastPoint {
                date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
                year: y,
                value,
            })
            .collect();
        let forecast = ForecastSeries {
            station: "Morse".into(),
            bounds: Bounds::new(0.0, 100.0).unwrap(),
            points,
        };
        let text = format_forecast_table(&forecast);
        assert!(text.contains("2020-01-01 .. 2021-01-01 (3 days)"));
        assert!(text.lines().any(|l| l.starts_with("2020") && l.contains("15.0")));
        // Single-value year has no sample std.
        assert!(text.lines().any(|l| l.starts_with("2021") && l.ends_with("n/a")));
    }

    #[test]
    fn backtest_table_shows_buckets() {
        let cutoff = NaiveDate::from_ymd_opt(2018, 12, 31).unwrap();
        let report = BacktestReport {
            initial_days: 365,
            horizon_days: 30,
            period_days: 30,
            bucket_days: 30,
            folds: vec![BacktestFold {
                cutoff,
                train_days: 365,
                rows: vec![BacktestRow {
                    cutoff,
                    bucket_start: 1,
                    bucket_end: 30,
                    n: 30,
                    mae: 12.5,
                    rmse: 15.0,
                    mape: None,
                    mape_n: 0,
                }],
            }],
        };
        let text = format_backtest(&report);
        assert!(text.contains("1 folds"));
        assert!(text.lines().any(|l| l.starts_with("1-30d") && l.contains("12.50") && l.ends_with("n/a")));
    }
}
