//! Read-side calculations over a KPI's fields. Everything here is pure and
//! never divides by zero: degenerate inputs produce a neutral result.

use crate::models::{KpiRecord, KpiView, PerformanceStatus, RollingStats, Trend, TrendSummary};

const WEEKLY_WINDOW: usize = 7;
const ON_TRACK_THRESHOLD: f64 = 0.8;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Percent change from `previous` to `current`, rounded to one decimal.
/// A zero baseline yields exactly zero.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    round_to((current - previous) / previous * 100.0, 1)
}

/// Fraction of the target reached, capped at 1.
pub fn target_progress(current: f64, target: Option<f64>) -> f64 {
    match target {
        Some(target) if target != 0.0 => (current / target).min(1.0),
        _ => 0.0,
    }
}

pub fn rolling_stats(history: &[f64]) -> Option<RollingStats> {
    if history.is_empty() {
        return None;
    }
    let min = history.iter().copied().fold(f64::INFINITY, f64::min);
    let max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = history.iter().sum::<f64>() / history.len() as f64;
    Some(RollingStats { min, max, mean })
}

/// Change across the trailing seven-point window, oldest point of the window
/// against the newest.
pub fn weekly_change(history: &[f64]) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }
    let window = &history[history.len().saturating_sub(WEEKLY_WINDOW)..];
    let first = window[0];
    let last = window[window.len() - 1];
    Some(percent_change(last, first))
}

pub fn performance_status(current: f64, target: Option<f64>) -> Option<PerformanceStatus> {
    let target = target?;
    let progress = target_progress(current, Some(target));
    if progress >= 1.0 {
        Some(PerformanceStatus::Achieved)
    } else if progress >= ON_TRACK_THRESHOLD {
        Some(PerformanceStatus::OnTrack)
    } else {
        Some(PerformanceStatus::BelowTarget)
    }
}

pub fn format_value(value: f64, unit: &str) -> String {
    let grouped = group_thousands(value);
    match unit {
        "$" => format!("${}", grouped),
        "%" => format!("{}%", trim_fraction(&format!("{:.3}", value))),
        "visits" => format!("{} visits", grouped),
        _ => format!("{}{}", grouped, unit),
    }
}

pub fn is_on_target(kpi: &KpiRecord) -> bool {
    matches!(kpi.target, Some(target) if kpi.value >= target)
}

pub fn kpi_view(record: &KpiRecord) -> KpiView {
    KpiView {
        display_value: format_value(record.value, &record.unit),
        percent_change: percent_change(record.value, record.previous_value),
        target_progress: target_progress(record.value, record.target),
        stats: rolling_stats(&record.history),
        weekly_change: weekly_change(&record.history),
        performance: performance_status(record.value, record.target),
        record: record.clone(),
    }
}

pub fn summarize<'a>(kpis: impl IntoIterator<Item = &'a KpiRecord>) -> TrendSummary {
    kpis.into_iter().fold(TrendSummary::default(), |mut summary, kpi| {
        match kpi.trend {
            Trend::Up => summary.improving += 1,
            Trend::Down => summary.declining += 1,
            Trend::Stable => summary.stable += 1,
        }
        if is_on_target(kpi) {
            summary.on_target += 1;
        }
        summary
    })
}

fn group_thousands(value: f64) -> String {
    let rendered = trim_fraction(&format!("{:.3}", value.abs()));
    let (integer, fraction) = match rendered.split_once('.') {
        Some((integer, fraction)) => (integer.to_string(), Some(fraction.to_string())),
        None => (rendered.clone(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, ch) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && rendered != "0" { "-" } else { "" };
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}

fn trim_fraction(rendered: &str) -> String {
    if !rendered.contains('.') {
        return rendered.to_string();
    }
    rendered.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::{
        format_value, percent_change, performance_status, rolling_stats, summarize, target_progress, weekly_change,
    };
    use crate::models::{KpiRecord, PerformanceStatus, Trend};
    use chrono::Utc;

    fn kpi(value: f64, trend: Trend, target: Option<f64>) -> KpiRecord {
        KpiRecord {
            id: "k".to_string(),
            name: "k".to_string(),
            category: "c".to_string(),
            unit: String::new(),
            value,
            previous_value: value,
            trend,
            target,
            history: vec![value],
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn percent_change_matches_seed_revenue() {
        assert_eq!(percent_change(125_000.0, 118_000.0), 5.9);
        assert_eq!(percent_change(2_850.0, 2_920.0), -2.4);
    }

    #[test]
    fn percent_change_zero_baseline_is_zero() {
        for current in [-10.0, 0.0, 3.5, 1e9] {
            assert_eq!(percent_change(current, 0.0), 0.0);
        }
    }

    #[test]
    fn target_progress_is_clamped() {
        assert_eq!(target_progress(90.0, Some(100.0)), 0.9);
        assert_eq!(target_progress(120.0, Some(100.0)), 1.0);
        assert_eq!(target_progress(50.0, None), 0.0);
        assert_eq!(target_progress(50.0, Some(0.0)), 0.0);
        for value in [0.0, 1.0, 99.9, 100.0, 5_000.0] {
            let progress = target_progress(value, Some(100.0));
            assert!((0.0..=1.0).contains(&progress));
        }
    }

    #[test]
    fn rolling_stats_cover_window() {
        assert!(rolling_stats(&[]).is_none());
        let stats = rolling_stats(&[2.0, 8.0, 5.0]).expect("stats");
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 8.0);
        assert_eq!(stats.mean, 5.0);
    }

    #[test]
    fn weekly_change_uses_trailing_window() {
        assert_eq!(weekly_change(&[]), None);
        assert_eq!(weekly_change(&[10.0]), None);
        assert_eq!(weekly_change(&[10.0, 11.0]), Some(10.0));
        let history = [1.0, 1.0, 100.0, 0.0, 0.0, 0.0, 0.0, 0.0, 110.0];
        assert_eq!(weekly_change(&history), Some(10.0));
        assert_eq!(weekly_change(&[0.0, 5.0]), Some(0.0));
    }

    #[test]
    fn performance_status_thresholds() {
        assert_eq!(performance_status(10.0, None), None);
        assert_eq!(performance_status(100.0, Some(100.0)), Some(PerformanceStatus::Achieved));
        assert_eq!(performance_status(85.0, Some(100.0)), Some(PerformanceStatus::OnTrack));
        assert_eq!(performance_status(10.0, Some(100.0)), Some(PerformanceStatus::BelowTarget));
    }

    #[test]
    fn formats_units() {
        assert_eq!(format_value(125_000.0, "$"), "$125,000");
        assert_eq!(format_value(3.2, "%"), "3.2%");
        assert_eq!(format_value(15_420.0, "visits"), "15,420 visits");
        assert_eq!(format_value(4.3, "/5"), "4.3/5");
        assert_eq!(format_value(1_234_567.891, ""), "1,234,567.891");
        assert_eq!(format_value(-2_500.5, "$"), "$-2,500.5");
    }

    #[test]
    fn summary_counts_trends_and_targets() {
        let kpis = vec![
            kpi(10.0, Trend::Up, Some(5.0)),
            kpi(10.0, Trend::Down, Some(50.0)),
            kpi(10.0, Trend::Stable, None),
            kpi(10.0, Trend::Up, Some(10.0)),
        ];
        let summary = summarize(&kpis);
        assert_eq!(summary.improving, 2);
        assert_eq!(summary.declining, 1);
        assert_eq!(summary.stable, 1);
        assert_eq!(summary.on_target, 2);
    }
}
