//! Change detection between consecutive observations, and QNH trend.

use serde::Serialize;

use crate::history::{HistorySeries, HistorySnapshot};
use crate::types::round2;

pub const SUMMARY_NO_PRIOR: &str = "No prior data";
pub const SUMMARY_CHANGES: &str = "Wind/QNH changes detected";
pub const SUMMARY_MINIMAL: &str = "Minimal changes";

/// QNH change per cycle, in hPa, above which the trend is rising or falling.
const QNH_TREND_HPA: i32 = 1;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CeilingCategory {
    Ifr,
    Marginal,
    Normal,
    Unknown,
}

impl CeilingCategory {
    pub fn of(ceiling_ft: Option<i32>) -> Self {
        match ceiling_ft {
            None => CeilingCategory::Unknown,
            Some(c) if c < 500 => CeilingCategory::Ifr,
            Some(c) if c < 1500 => CeilingCategory::Marginal,
            Some(_) => CeilingCategory::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityCategory {
    VeryLow,
    Low,
    Normal,
    Unknown,
}

impl VisibilityCategory {
    pub fn of(visibility_m: Option<i32>) -> Self {
        match visibility_m {
            None => VisibilityCategory::Unknown,
            Some(v) if v < 1000 => VisibilityCategory::VeryLow,
            Some(v) if v < 3000 => VisibilityCategory::Low,
            Some(_) => VisibilityCategory::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition<T> {
    pub from: T,
    pub to: T,
}

// ---------------------------------------------------------------------------
// Change report
// ---------------------------------------------------------------------------

/// Deltas are current minus previous and absent when either side is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed_delta_kt: Option<i32>,
    /// Shortest signed turn, in [-180, 180).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_dir_shift_deg: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qnh_change_hpa: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dewpoint_spread_change: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_category: Option<Transition<CeilingCategory>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_category: Option<Transition<VisibilityCategory>>,
}

impl ChangeDetails {
    pub fn is_empty(&self) -> bool {
        *self == ChangeDetails::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeReport {
    pub summary: String,
    pub details: ChangeDetails,
}

/// Compare the current snapshot with the previous one.
pub fn detect_changes(previous: Option<&HistorySnapshot>, current: &HistorySnapshot) -> ChangeReport {
    let Some(prev) = previous else {
        return ChangeReport {
            summary: SUMMARY_NO_PRIOR.into(),
            details: ChangeDetails::default(),
        };
    };

    let delta = |curr: Option<i32>, prev: Option<i32>| Some(curr? - prev?);
    let details = ChangeDetails {
        wind_speed_delta_kt: delta(current.wind_speed_kt, prev.wind_speed_kt),
        wind_dir_shift_deg: delta(current.wind_dir_deg, prev.wind_dir_deg)
            .map(|d| (d + 180).rem_euclid(360) - 180),
        qnh_change_hpa: delta(current.qnh_hpa, prev.qnh_hpa),
        temp_dewpoint_spread_change: delta(current.spread_c(), prev.spread_c()),
        ceiling_category: Some(Transition {
            from: CeilingCategory::of(prev.ceiling_ft_est),
            to: CeilingCategory::of(current.ceiling_ft_est),
        }),
        visibility_category: Some(Transition {
            from: VisibilityCategory::of(prev.visibility_m),
            to: VisibilityCategory::of(current.visibility_m),
        }),
    };

    let moved = |d: Option<i32>| d.is_some_and(|v| v != 0);
    let summary = if moved(details.wind_speed_delta_kt) || moved(details.qnh_change_hpa) {
        SUMMARY_CHANGES
    } else {
        SUMMARY_MINIMAL
    };
    ChangeReport {
        summary: summary.into(),
        details,
    }
}

// ---------------------------------------------------------------------------
// QNH trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QnhTrend {
    Rising,
    Falling,
    Steady,
}

/// Trend over the last two snapshots. Steady when either QNH is unknown.
pub fn qnh_trend(series: &HistorySeries) -> QnhTrend {
    let Some((prev, curr)) = series.last_pair() else {
        return QnhTrend::Steady;
    };
    match (prev.qnh_hpa, curr.qnh_hpa) {
        (Some(p), Some(c)) if c - p > QNH_TREND_HPA => QnhTrend::Rising,
        (Some(p), Some(c)) if c - p < -QNH_TREND_HPA => QnhTrend::Falling,
        _ => QnhTrend::Steady,
    }
}

/// Hours from `prev` to `curr`, never negative.
pub fn hours_between(prev: &HistorySnapshot, curr: &HistorySnapshot) -> Option<f64> {
    let seconds = (curr.timestamp? - prev.timestamp?).num_seconds();
    Some((seconds as f64 / 3600.0).max(0.0))
}

/// QNH change in hPa per hour, rounded to 0.01. `None` without two QNH values
/// and a positive time step.
pub fn qnh_change_rate(prev: &HistorySnapshot, curr: &HistorySnapshot) -> Option<f64> {
    let delta = (curr.qnh_hpa? - prev.qnh_hpa?) as f64;
    let hours = hours_between(prev, curr).filter(|h| *h > 0.0)?;
    Some(round2(delta / hours))
}

/// QNH falling at `threshold_hpa_per_hr` or faster over the last two snapshots.
///
/// Without usable timestamps the per-cycle change stands in for the hourly
/// rate.
pub fn qnh_falling_fast(series: &HistorySeries, threshold_hpa_per_hr: f64) -> bool {
    let Some((prev, curr)) = series.last_pair() else {
        return false;
    };
    let (Some(p), Some(c)) = (prev.qnh_hpa, curr.qnh_hpa) else {
        return false;
    };
    let rate = qnh_change_rate(prev, curr).unwrap_or((c - p) as f64);
    rate <= -threshold_hpa_per_hr
}
