//! Risk flags, compound flags and severity.
//!
//! Primary flags compare decoded and derived values against a profile's
//! thresholds. Compound flags combine primary flags with station context. Every
//! raised flag carries a JSON explanation with the evidence and the limit used.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::altimetry::DensityAltitude;
use crate::config::{SeverityMap, Thresholds};
use crate::metar::DecodedMetar;
use crate::wind::{max_crosswind, max_tailwind, RunwayWind};

pub const LOW_RISK: &str = "LOW_RISK";

// ---------------------------------------------------------------------------
// Flag codes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagCode {
    CrosswindHigh,
    Tailwind,
    Gusty,
    HighDa,
    LowVis,
    LowCeiling,
    TsRisk,
    QnhFallingFast,
    HighDaShortRwy,
    CrosswindHighGusty,
    LowCeilingNight,
    RapidQnhFallTafDeteriorating,
    ConvectiveRiskHigh,
    TurbPossible,
    IcingPossible,
}

impl FlagCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagCode::CrosswindHigh => "CROSSWIND_HIGH",
            FlagCode::Tailwind => "TAILWIND",
            FlagCode::Gusty => "GUSTY",
            FlagCode::HighDa => "HIGH_DA",
            FlagCode::LowVis => "LOW_VIS",
            FlagCode::LowCeiling => "LOW_CEILING",
            FlagCode::TsRisk => "TS_RISK",
            FlagCode::QnhFallingFast => "QNH_FALLING_FAST",
            FlagCode::HighDaShortRwy => "HIGH_DA_SHORT_RWY",
            FlagCode::CrosswindHighGusty => "CROSSWIND_HIGH_GUSTY",
            FlagCode::LowCeilingNight => "LOW_CEILING_NIGHT",
            FlagCode::RapidQnhFallTafDeteriorating => "RAPID_QNH_FALL_TAF_DETERIORATING",
            FlagCode::ConvectiveRiskHigh => "CONVECTIVE_RISK_HIGH",
            FlagCode::TurbPossible => "TURB_POSSIBLE",
            FlagCode::IcingPossible => "ICING_POSSIBLE",
        }
    }
}

impl fmt::Display for FlagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised flags in evaluation order, with one explanation per flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlagSet {
    pub codes: Vec<FlagCode>,
    pub explanations: BTreeMap<FlagCode, Value>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&mut self, code: FlagCode, explanation: Value) {
        if !self.codes.contains(&code) {
            self.codes.push(code);
        }
        self.explanations.insert(code, explanation);
    }

    pub fn contains(&self, code: FlagCode) -> bool {
        self.codes.contains(&code)
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Primary flags
// ---------------------------------------------------------------------------

/// Everything the primary rules look at.
pub struct FlagInputs<'a> {
    pub metar: &'a DecodedMetar,
    pub density_altitude: &'a DensityAltitude,
    pub runway_winds: &'a [RunwayWind],
    pub qnh_falling_fast: bool,
    /// Hourly QNH change over the last two snapshots.
    pub qnh_change_rate_hpa_per_hr: Option<f64>,
    /// Per-cycle QNH change, used when there is no hourly rate.
    pub qnh_change_hpa: Option<i32>,
}

/// Evaluate the primary flags. Comparisons are strict.
pub fn primary_flags(inputs: &FlagInputs<'_>, thresholds: &Thresholds) -> FlagSet {
    let metar = inputs.metar;
    let mut flags = FlagSet::new();
    let wind_input = format!(
        "{}/{}kt",
        opt_text(metar.wind_dir_deg, "VRB"),
        opt_text(metar.wind_speed_kt, "--")
    );

    let (crosswind, crosswind_rwy) = max_crosswind(inputs.runway_winds);
    if crosswind > thresholds.max_crosswind_kt {
        flags.raise(
            FlagCode::CrosswindHigh,
            json!({
                "input": wind_input,
                "runway": crosswind_rwy,
                "crosswind_kt": crosswind,
                "threshold_kt": thresholds.max_crosswind_kt,
                "note": "Crosswind affects controllability; headwind is typically helpful.",
            }),
        );
    }

    let (tailwind, tailwind_rwy) = max_tailwind(inputs.runway_winds);
    if tailwind > thresholds.max_tailwind_kt {
        flags.raise(
            FlagCode::Tailwind,
            json!({
                "input": wind_input,
                "runway": tailwind_rwy,
                "tailwind_kt": tailwind,
                "threshold_kt": thresholds.max_tailwind_kt,
                "note": "Tailwind reduces performance and increases landing distance.",
            }),
        );
    }

    if let Some(spread) = metar.gust_spread_kt() {
        if spread as f64 > thresholds.max_gust_spread_kt {
            flags.raise(
                FlagCode::Gusty,
                json!({
                    "gust_spread_kt": spread,
                    "threshold_kt": thresholds.max_gust_spread_kt,
                    "note": "Gust spread increases workload and variability.",
                }),
            );
        }
    }

    if let Some(da_ft) = inputs.density_altitude.da_ft {
        if da_ft as f64 > thresholds.max_da_ft {
            flags.raise(
                FlagCode::HighDa,
                json!({
                    "density_altitude_ft": da_ft,
                    "threshold_ft": thresholds.max_da_ft,
                    "note": "High DA reduces aircraft performance.",
                }),
            );
        }
    }

    if let Some(vis) = metar.visibility_m {
        if (vis as f64) < thresholds.min_vis_m {
            flags.raise(
                FlagCode::LowVis,
                json!({
                    "visibility_m": vis,
                    "threshold_m": thresholds.min_vis_m,
                    "note": "Visibility below training minima.",
                }),
            );
        }
    }

    if let Some(ceiling) = metar.ceiling_ft {
        if (ceiling as f64) < thresholds.min_ceiling_ft {
            flags.raise(
                FlagCode::LowCeiling,
                json!({
                    "ceiling_ft": ceiling,
                    "threshold_ft": thresholds.min_ceiling_ft,
                    "note": "Ceiling below training minima.",
                }),
            );
        }
    }

    if metar.has_thunderstorm() {
        flags.raise(
            FlagCode::TsRisk,
            json!({
                "input": metar.weather_codes,
                "note": "Thunderstorm code in METAR.",
            }),
        );
    }

    if inputs.qnh_falling_fast {
        flags.raise(
            FlagCode::QnhFallingFast,
            json!({
                "qnh_change_rate_hpa_per_hr": inputs.qnh_change_rate_hpa_per_hr,
                "qnh_change_hpa": inputs.qnh_change_hpa,
                "threshold_hpa_per_hr": thresholds.qnh_fall_fast_hpa_per_hr,
                "note": "Rapid QNH fall can indicate deteriorating conditions.",
            }),
        );
    }

    flags
}

fn opt_text(value: Option<i32>, missing: &str) -> String {
    value.map_or_else(|| missing.to_string(), |v| v.to_string())
}

// ---------------------------------------------------------------------------
// Compound flags
// ---------------------------------------------------------------------------

/// Compound flags from the primary set and station context.
pub fn compound_flags(
    flags: &[FlagCode],
    runway_short: bool,
    night: bool,
    taf_deteriorating: bool,
    rapid_qnh_fall: bool,
) -> Vec<FlagCode> {
    let has = |code| flags.contains(&code);
    let mut compounds = Vec::new();
    if has(FlagCode::HighDa) && runway_short {
        compounds.push(FlagCode::HighDaShortRwy);
    }
    if has(FlagCode::CrosswindHigh) && has(FlagCode::Gusty) {
        compounds.push(FlagCode::CrosswindHighGusty);
    }
    if has(FlagCode::LowCeiling) && night {
        compounds.push(FlagCode::LowCeilingNight);
    }
    if rapid_qnh_fall && taf_deteriorating {
        compounds.push(FlagCode::RapidQnhFallTafDeteriorating);
    }
    compounds
}

/// Evidence quoted in compound-flag explanations.
pub struct CompoundEvidence<'a> {
    pub density_altitude_ft: Option<i64>,
    pub short_runway_m: f64,
    pub crosswind_kt: f64,
    pub gust_kt: Option<i32>,
    pub ceiling_ft: Option<i32>,
    pub night: bool,
    pub qnh_change_rate_hpa_per_hr: Option<f64>,
    pub taf_raw: &'a str,
}

/// Explanation payload for a compound flag.
pub fn explain_compound(code: FlagCode, evidence: &CompoundEvidence<'_>) -> Value {
    match code {
        FlagCode::HighDaShortRwy => json!({
            "density_altitude_ft": evidence.density_altitude_ft,
            "short_runway_threshold_m": evidence.short_runway_m,
            "note": "High DA combined with short runway increases performance risk.",
        }),
        FlagCode::CrosswindHighGusty => json!({
            "crosswind_kt": evidence.crosswind_kt,
            "gust_kt": evidence.gust_kt,
            "note": "Crosswind with gusts increases workload.",
        }),
        FlagCode::LowCeilingNight => json!({
            "ceiling_ft": evidence.ceiling_ft,
            "night": evidence.night,
            "note": "Low ceiling during night conditions.",
        }),
        FlagCode::RapidQnhFallTafDeteriorating => json!({
            "qnh_change_rate_hpa_per_hr": evidence.qnh_change_rate_hpa_per_hr,
            "taf_hint": evidence.taf_raw,
            "note": "Rapid QNH fall with deteriorating TAF.",
        }),
        _ => json!({ "note": "Compound flag based on multiple conditions." }),
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Ok,
    Caution,
    Warning,
    Unknown,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Ok => "OK",
            Severity::Caution => "CAUTION",
            Severity::Warning => "WARNING",
            Severity::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// WARNING if any flag is on the warning list, else CAUTION if any is on the
/// caution list, else OK.
pub fn flag_severity(flags: &[FlagCode], severity: &SeverityMap) -> Severity {
    if flags.iter().any(|f| severity.warning.contains(f)) {
        Severity::Warning
    } else if flags.iter().any(|f| severity.caution.contains(f)) {
        Severity::Caution
    } else {
        Severity::Ok
    }
}

/// Headline for a flag list: the first flag, or `LOW_RISK`.
pub fn summarize_flags(flags: &[FlagCode]) -> &'static str {
    flags.first().map(FlagCode::as_str).unwrap_or(LOW_RISK)
}
