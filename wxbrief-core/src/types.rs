//! Shared types, error enum, and station geometry for wxbrief-core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors produced by wxbrief-core.
///
/// Decoders and calculators never return these; only the fallible edges
/// (configuration, sources, history stores) do.
#[derive(Debug, Error)]
pub enum BriefError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("source error: {0}")]
    Source(String),
    #[error("history store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, BriefError>;

// ---------------------------------------------------------------------------
// Raw products (handed over by sources)
// ---------------------------------------------------------------------------

/// Source label for bundled training samples.
pub const SOURCE_SAMPLE: &str = "SAMPLE";
/// Source label for a live fetch.
pub const SOURCE_LIVE: &str = "LIVE_BETA";
/// Source label when a live fetch failed and the sample was used instead.
pub const SOURCE_SAMPLE_FALLBACK: &str = "SAMPLE_FALLBACK";

/// One raw coded report (METAR or TAF) for a station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawProduct {
    pub ident: String,
    pub raw: String,
    pub source: String,
    /// Observation time as supplied by the source. Usually empty; the decoder
    /// derives the time from the report itself.
    pub observed_time_utc: String,
}

impl RawProduct {
    pub fn new(ident: &str, raw: &str, source: &str) -> Self {
        RawProduct {
            ident: ident.to_string(),
            raw: raw.trim().to_string(),
            source: source.to_string(),
            observed_time_utc: String::new(),
        }
    }
}

/// Line-oriented text product (NOTAMs for one aerodrome).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextProduct {
    pub ident: String,
    pub lines: Vec<String>,
    pub source: String,
}

impl TextProduct {
    /// Build from free text, dropping blank lines and trimming the rest.
    pub fn from_text(ident: &str, text: &str, source: &str) -> Self {
        TextProduct {
            ident: ident.to_string(),
            lines: non_blank_lines(text),
            source: source.to_string(),
        }
    }
}

/// Trimmed, non-empty lines of `text`.
pub fn non_blank_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Station geometry
// ---------------------------------------------------------------------------

pub const FEET_PER_METRE: f64 = 3.28084;

/// A runway direction at an aerodrome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runway {
    pub designator: String,
    pub magnetic_heading_deg: i32,
    pub length_m: i32,
    #[serde(default = "default_surface")]
    pub surface: String,
}

fn default_surface() -> String {
    "--".into()
}

/// Aerodrome metadata needed by the calculators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub ident: String,
    #[serde(default)]
    pub name: String,
    pub elevation_m: f64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub runways: Vec<Runway>,
    #[serde(default)]
    pub night_ops_allowed: bool,
    #[serde(default)]
    pub runway_edge_lighting: bool,
}

impl Station {
    pub fn elevation_ft(&self) -> f64 {
        self.elevation_m * FEET_PER_METRE
    }

    /// True if any runway is shorter than `threshold_m`.
    pub fn has_short_runway(&self, threshold_m: f64) -> bool {
        self.runways
            .iter()
            .any(|rwy| (rwy.length_m as f64) < threshold_m)
    }

    /// Night operations permitted and runway edge lighting available.
    pub fn night_ready(&self) -> bool {
        self.night_ops_allowed && self.runway_edge_lighting
    }
}

/// Round to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
