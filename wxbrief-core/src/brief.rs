//! Station brief pipeline.
//!
//! One call runs the full cycle for a station: decode, derive, update history,
//! detect change, then flag and score. History is loaded and written at most
//! once per call.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::altimetry::{cloud_base_ft, density_altitude, DensityAltitude};
use crate::change::{detect_changes, qnh_change_rate, qnh_falling_fast, qnh_trend, ChangeReport, QnhTrend};
use crate::config::Profile;
use crate::flags::{
    compound_flags, explain_compound, flag_severity, primary_flags, summarize_flags, CompoundEvidence,
    FlagInputs, FlagSet, Severity,
};
use crate::history::{HistorySeries, HistorySnapshot, HistoryStore};
use crate::metar::{decode_metar, DecodedMetar};
use crate::notam::{decode_notam, runway_condition, NotamEntry};
use crate::scoring::{stability_score, workload_score, StabilityInputs, StabilityScore, WorkloadInputs, WorkloadScore};
use crate::source::{MetarTafSource, TextSource};
use crate::sun::{sun_report, SunReport};
use crate::taf::{decode_taf, parse_taf_valid_to, time_to_expiry, DecodedTaf, TafExpiry};
use crate::types::{round1, RawProduct, Result, Station, TextProduct, SOURCE_LIVE};
use crate::wind::{max_crosswind, runway_winds, RunwayWind};

/// Number of history values in each trend series.
pub const TREND_LENGTH: usize = 20;
/// Wind speed change, in knots, treated as a rapid change.
const RAPID_WIND_CHANGE_KT: i32 = 10;
/// Direction shift, in degrees, that counts as a full wind-shift penalty.
const FULL_WIND_SHIFT_DEG: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunwaySurface {
    pub runway: String,
    pub surface: String,
    pub condition: &'static str,
}

/// Recent history values, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trends {
    pub wind_speed: Vec<Option<i32>>,
    pub qnh: Vec<Option<i32>>,
    pub temp: Vec<Option<i32>>,
    pub dewpoint: Vec<Option<i32>>,
    pub visibility: Vec<Option<i32>>,
}

impl Trends {
    fn from_series(series: &HistorySeries) -> Self {
        Trends {
            wind_speed: series.recent(TREND_LENGTH, |s| s.wind_speed_kt),
            qnh: series.recent(TREND_LENGTH, |s| s.qnh_hpa),
            temp: series.recent(TREND_LENGTH, |s| s.temp_c),
            dewpoint: series.recent(TREND_LENGTH, |s| s.dewpoint_c),
            visibility: series.recent(TREND_LENGTH, |s| s.visibility_m),
        }
    }
}

/// Everything derived for one station in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationBrief {
    pub ident: String,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub night_ready: bool,
    pub metar: DecodedMetar,
    pub metar_source: String,
    /// Minutes between observation and brief, for live reports.
    pub metar_latency_min: Option<f64>,
    pub taf: DecodedTaf,
    pub taf_source: String,
    pub notams: Vec<NotamEntry>,
    pub runway_winds: Vec<RunwayWind>,
    pub runway_surfaces: Vec<RunwaySurface>,
    pub density_altitude: DensityAltitude,
    pub ceiling_ft_est: Option<i32>,
    pub qnh_trend: QnhTrend,
    pub qnh_change_rate_hpa_per_hr: Option<f64>,
    pub changes: ChangeReport,
    pub taf_time_to_expiry: TafExpiry,
    pub sun: SunReport,
    pub flags: FlagSet,
    pub severity: Severity,
    pub summary: &'static str,
    pub workload: WorkloadScore,
    pub stability: StabilityScore,
    pub trends: Trends,
}

/// Run the station pipeline on already-fetched products.
///
/// The current snapshot is appended to the station's history. The series is
/// written back only when `record_history` is set.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_station(
    station: &Station,
    metar_raw: &RawProduct,
    taf_raw: &RawProduct,
    notams: &TextProduct,
    profile: &Profile,
    history: &mut dyn HistoryStore,
    now: DateTime<Utc>,
    record_history: bool,
) -> Result<StationBrief> {
    let thresholds = &profile.thresholds;
    let metar = decode_metar(&metar_raw.raw, now);
    let taf = decode_taf(&taf_raw.raw);
    let notam_entries = decode_notam(&notams.lines);
    let notam_texts: Vec<&str> = notam_entries.iter().map(|n| n.text.as_str()).collect();

    let winds = runway_winds(metar.wind_dir_deg, metar.wind_speed_kt, &station.runways);
    let surfaces = station
        .runways
        .iter()
        .map(|rwy| RunwaySurface {
            runway: rwy.designator.clone(),
            surface: rwy.surface.clone(),
            condition: runway_condition(&rwy.designator, &notam_texts),
        })
        .collect();

    let da = density_altitude(
        station.elevation_m,
        metar.qnh_hpa.map(f64::from),
        metar.temp_c.map(f64::from),
    );
    let ceiling_ft_est = metar.ceiling_ft.or_else(|| {
        cloud_base_ft(metar.temp_c.map(f64::from), metar.dewpoint_c.map(f64::from))
    });

    // History: read, append, optionally write back
    let mut series = history.load(&station.ident)?;
    let previous = series.last().cloned();
    let current = HistorySnapshot::from_metar(&metar, ceiling_ft_est);
    series.push(current.clone());
    if record_history {
        history.save(&station.ident, &series)?;
    }

    let changes = detect_changes(previous.as_ref(), &current);
    let qnh_rate = previous.as_ref().and_then(|prev| qnh_change_rate(prev, &current));
    let taf_expiry = time_to_expiry(parse_taf_valid_to(&taf.valid_to, now), now);
    let sun = sun_report(now, station.latitude_deg, station.longitude_deg);
    let falling_fast = qnh_falling_fast(&series, thresholds.qnh_fall_fast_hpa_per_hr);

    let mut flags = primary_flags(
        &FlagInputs {
            metar: &metar,
            density_altitude: &da,
            runway_winds: &winds,
            qnh_falling_fast: falling_fast,
            qnh_change_rate_hpa_per_hr: qnh_rate,
            qnh_change_hpa: changes.details.qnh_change_hpa,
        },
        thresholds,
    );

    let (crosswind, _) = max_crosswind(&winds);
    let compounds = compound_flags(
        &flags.codes,
        station.has_short_runway(thresholds.short_runway_m),
        sun.is_night,
        taf.is_deteriorating(),
        falling_fast,
    );
    let evidence = CompoundEvidence {
        density_altitude_ft: da.da_ft,
        short_runway_m: thresholds.short_runway_m,
        crosswind_kt: crosswind,
        gust_kt: metar.gust_kt,
        ceiling_ft: metar.ceiling_ft,
        night: sun.is_night,
        qnh_change_rate_hpa_per_hr: qnh_rate,
        taf_raw: &taf.raw,
    };
    for code in compounds {
        flags.raise(code, explain_compound(code, &evidence));
    }

    let severity = if flags.is_empty() && metar.is_empty() {
        Severity::Unknown
    } else {
        flag_severity(&flags.codes, &profile.severity)
    };

    let indicator = |on: bool| if on { 1.0 } else { 0.0 };
    let gust_ratio = metar
        .gust_spread_kt()
        .map_or(0.0, |spread| spread as f64 / thresholds.max_gust_spread_kt);
    let workload = workload_score(&WorkloadInputs {
        crosswind_ratio: crosswind / thresholds.max_crosswind_kt,
        gust_ratio,
        da_ratio: da.da_ft.map_or(0.0, |ft| ft as f64 / thresholds.max_da_ft),
        convective: indicator(taf.mentions_thunderstorm()),
        night: indicator(sun.is_night),
        rapid_change: indicator(
            changes
                .details
                .wind_speed_delta_kt
                .is_some_and(|d| d.abs() >= RAPID_WIND_CHANGE_KT),
        ),
    });
    let stability = stability_score(&StabilityInputs {
        wind_shift: changes
            .details
            .wind_dir_shift_deg
            .map_or(0.0, |d| (d.abs() as f64 / FULL_WIND_SHIFT_DEG).min(1.0)),
        gust_spread: gust_ratio.min(1.0),
        metar_taf_mismatch: indicator(taf.mentions_thunderstorm() && !metar.has_thunderstorm()),
        qnh_fall: indicator(falling_fast),
        speci: indicator(metar.is_speci),
    });

    let metar_latency_min = if metar_raw.source == SOURCE_LIVE {
        metar
            .observed_time_utc
            .map(|obs| round1((now - obs).num_seconds() as f64 / 60.0))
    } else {
        None
    };

    info!(
        ident = %station.ident,
        severity = %severity,
        flags = flags.codes.len(),
        workload = workload.score,
        stability = stability.score,
        "station evaluated"
    );

    Ok(StationBrief {
        ident: station.ident.clone(),
        name: station.name.clone(),
        latitude_deg: station.latitude_deg,
        longitude_deg: station.longitude_deg,
        night_ready: station.night_ready(),
        metar_source: metar_raw.source.clone(),
        metar_latency_min,
        taf_source: taf_raw.source.clone(),
        notams: notam_entries,
        runway_winds: winds,
        runway_surfaces: surfaces,
        density_altitude: da,
        ceiling_ft_est,
        qnh_trend: qnh_trend(&series),
        qnh_change_rate_hpa_per_hr: qnh_rate,
        changes,
        taf_time_to_expiry: taf_expiry,
        sun,
        summary: summarize_flags(&flags.codes),
        flags,
        severity,
        workload,
        stability,
        trends: Trends::from_series(&series),
        metar,
        taf,
    })
}

/// Fetch a station's products and evaluate it.
///
/// A product that cannot be fetched is treated as empty; the brief then
/// degrades instead of failing. Store errors still propagate.
pub fn fetch_and_evaluate(
    station: &Station,
    metar_taf: &dyn MetarTafSource,
    notams: &dyn TextSource,
    profile: &Profile,
    history: &mut dyn HistoryStore,
    now: DateTime<Utc>,
    record_history: bool,
) -> Result<StationBrief> {
    let ident = station.ident.as_str();
    let metar = metar_taf.fetch_metar(ident).unwrap_or_else(|e| {
        warn!(ident, error = %e, "no METAR available");
        RawProduct::new(ident, "", "UNAVAILABLE")
    });
    let taf = metar_taf.fetch_taf(ident).unwrap_or_else(|e| {
        warn!(ident, error = %e, "no TAF available");
        RawProduct::new(ident, "", "UNAVAILABLE")
    });
    let notam_text = notams.fetch(ident).unwrap_or_else(|e| {
        warn!(ident, error = %e, "no NOTAMs available");
        TextProduct::from_text(ident, "", "UNAVAILABLE")
    });
    evaluate_station(
        station,
        &metar,
        &taf,
        &notam_text,
        profile,
        history,
        now,
        record_history,
    )
}
