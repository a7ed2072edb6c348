//! METAR decoder.
//!
//! Each field is extracted by its own pattern scan over the raw text, so a
//! corrupt token only loses the field it belongs to. Decoding never fails.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static WIND_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{3}|VRB)(\d{2})(?:G(\d{2}))?KT").unwrap());
static VARIABLE_WIND_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{3})V(\d{3})").unwrap());
static VISIBILITY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").unwrap());
static TEMPERATURE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(M?\d{2})/(M?\d{2})").unwrap());
static QNH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"Q(\d{4})").unwrap());
static TIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2})(\d{2})(\d{2})Z").unwrap());
static CLOUD_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(FEW|SCT|BKN|OVC)(\d{3})").unwrap());

/// Significant weather codes. A token containing any of these is reported.
pub const WEATHER_CODES: &[&str] = &[
    "TS", "RA", "SH", "DZ", "SN", "BR", "FG", "HZ", "GR", "GS", "SQ", "VA",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VariableWind {
    pub from: u16,
    pub to: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudLayer {
    pub cover: String,
    pub base_ft: i32,
}

impl CloudLayer {
    /// Broken or overcast layers form a ceiling.
    pub fn is_ceiling(&self) -> bool {
        self.cover == "BKN" || self.cover == "OVC"
    }
}

/// Decoded METAR fields. Any field may be absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMetar {
    pub raw: String,
    pub observed_time_utc: Option<DateTime<Utc>>,
    /// `None` for VRB or when no wind group was found.
    pub wind_dir_deg: Option<i32>,
    pub wind_speed_kt: Option<i32>,
    pub gust_kt: Option<i32>,
    pub variable_wind: Option<VariableWind>,
    pub visibility_m: Option<i32>,
    pub weather_codes: Vec<String>,
    pub cloud_layers: Vec<CloudLayer>,
    pub ceiling_ft: Option<i32>,
    pub temp_c: Option<i32>,
    pub dewpoint_c: Option<i32>,
    pub qnh_hpa: Option<i32>,
    pub remarks: String,
    pub is_speci: bool,
}

impl DecodedMetar {
    /// Gust minus mean wind, when both are reported.
    pub fn gust_spread_kt(&self) -> Option<i32> {
        match (self.gust_kt, self.wind_speed_kt) {
            (Some(gust), Some(speed)) => Some(gust - speed),
            _ => None,
        }
    }

    /// True if any weather code contains a thunderstorm.
    pub fn has_thunderstorm(&self) -> bool {
        self.weather_codes.iter().any(|code| code.contains("TS"))
    }

    /// True if nothing usable was extracted.
    pub fn is_empty(&self) -> bool {
        self.wind_speed_kt.is_none()
            && self.visibility_m.is_none()
            && self.cloud_layers.is_empty()
            && self.temp_c.is_none()
            && self.qnh_hpa.is_none()
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decode a raw METAR. `reference` supplies the year and month the report's
/// `ddhhmmZ` group is placed in.
pub fn decode_metar(raw: &str, reference: DateTime<Utc>) -> DecodedMetar {
    let (wind_dir_deg, wind_speed_kt, gust_kt) = match WIND_REGEX.captures(raw) {
        Some(caps) => {
            let dir = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let speed = caps.get(2).and_then(|m| m.as_str().parse().ok());
            let gust = caps.get(3).and_then(|m| m.as_str().parse().ok());
            (dir, speed, gust)
        }
        None => (None, None, None),
    };

    let variable_wind = VARIABLE_WIND_REGEX.captures(raw).and_then(|caps| {
        Some(VariableWind {
            from: caps[1].parse().ok()?,
            to: caps[2].parse().ok()?,
        })
    });

    let visibility_m = VISIBILITY_REGEX
        .captures(raw)
        .and_then(|caps| caps[1].parse().ok());

    let cloud_layers: Vec<CloudLayer> = CLOUD_REGEX
        .captures_iter(raw)
        .filter_map(|caps| {
            let base: i32 = caps[2].parse().ok()?;
            Some(CloudLayer {
                cover: caps[1].to_string(),
                base_ft: base * 100,
            })
        })
        .collect();

    let ceiling_ft = cloud_layers
        .iter()
        .find(|layer| layer.is_ceiling())
        .map(|layer| layer.base_ft);

    let (temp_c, dewpoint_c) = match TEMPERATURE_REGEX.captures(raw) {
        Some(caps) => (parse_signed_temp(&caps[1]), parse_signed_temp(&caps[2])),
        None => (None, None),
    };

    let qnh_hpa = QNH_REGEX.captures(raw).and_then(|caps| caps[1].parse().ok());

    let weather_codes = raw
        .split_whitespace()
        .filter(|token| WEATHER_CODES.iter().any(|code| token.contains(code)))
        .map(str::to_string)
        .collect();

    let remarks = raw
        .split_once("RMK")
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_default();

    let is_speci = raw.split_whitespace().next() == Some("SPECI");

    DecodedMetar {
        raw: raw.to_string(),
        observed_time_utc: parse_observed_time(raw, reference),
        wind_dir_deg,
        wind_speed_kt,
        gust_kt,
        variable_wind,
        visibility_m,
        weather_codes,
        cloud_layers,
        ceiling_ft,
        temp_c,
        dewpoint_c,
        qnh_hpa,
        remarks,
        is_speci,
    }
}

/// `M05` is -5 °C.
fn parse_signed_temp(value: &str) -> Option<i32> {
    match value.strip_prefix('M') {
        Some(digits) => digits.parse::<i32>().ok().map(|v| -v),
        None => value.parse().ok(),
    }
}

fn parse_observed_time(raw: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = TIME_REGEX.captures(raw)?;
    let day: u32 = caps[1].parse().ok()?;
    let hour: u32 = caps[2].parse().ok()?;
    let minute: u32 = caps[3].parse().ok()?;
    let observed = Utc
        .with_ymd_and_hms(reference.year(), reference.month(), day, hour, minute, 0)
        .single();
    if observed.is_none() {
        debug!(
            day,
            hour, minute, "observation time group does not fit the reference month"
        );
    }
    observed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 12, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_decode_full_report() {
        let raw = "FAOR 121000Z 34012G25KT 300V020 9999 -TSRA FEW030 BKN045 OVC080 24/M02 Q1018 NOSIG RMK CB SW";
        let m = decode_metar(raw, reference());
        assert_eq!(m.wind_dir_deg, Some(340));
        assert_eq!(m.wind_speed_kt, Some(12));
        assert_eq!(m.gust_kt, Some(25));
        assert_eq!(m.variable_wind, Some(VariableWind { from: 300, to: 20 }));
        assert_eq!(m.visibility_m, Some(9999));
        assert_eq!(m.weather_codes, vec!["-TSRA"]);
        assert_eq!(m.cloud_layers.len(), 3);
        assert_eq!(m.cloud_layers[0].base_ft, 3000);
        assert_eq!(m.ceiling_ft, Some(4500));
        assert_eq!(m.temp_c, Some(24));
        assert_eq!(m.dewpoint_c, Some(-2));
        assert_eq!(m.qnh_hpa, Some(1018));
        assert_eq!(m.remarks, "CB SW");
        assert_eq!(
            m.observed_time_utc,
            Some(Utc.with_ymd_and_hms(2026, 2, 12, 10, 0, 0).unwrap())
        );
        assert!(m.has_thunderstorm());
        assert_eq!(m.gust_spread_kt(), Some(13));
        assert!(!m.is_speci);
    }

    #[test]
    fn test_variable_wind_has_no_direction() {
        let m = decode_metar("FALA 121000Z VRB03KT CAVOK 20/10 Q1013", reference());
        assert_eq!(m.wind_dir_deg, None);
        assert_eq!(m.wind_speed_kt, Some(3));
        assert_eq!(m.gust_kt, None);
        assert_eq!(m.visibility_m, None);
        assert_eq!(m.ceiling_ft, None);
    }

    #[test]
    fn test_garbage_decodes_to_empty() {
        let m = decode_metar("NOT A METAR ###", reference());
        assert!(m.is_empty());
        assert_eq!(m.observed_time_utc, None);
        assert!(m.weather_codes.is_empty());
        assert_eq!(m.remarks, "");
    }

    #[test]
    fn test_fields_independent_of_corrupt_tokens() {
        let m = decode_metar("FAOR 12XX00Z 18O10KT 4000 BR 12/11 Q1009", reference());
        assert_eq!(m.wind_speed_kt, None);
        assert_eq!(m.observed_time_utc, None);
        assert_eq!(m.visibility_m, Some(4000));
        assert_eq!(m.weather_codes, vec!["BR"]);
        assert_eq!(m.qnh_hpa, Some(1009));
    }

    #[test]
    fn test_ceiling_is_first_broken_layer() {
        let m = decode_metar("FAOR 121000Z 18005KT 9999 SCT008 OVC012 BKN004 15/14 Q1012", reference());
        assert_eq!(m.ceiling_ft, Some(1200));
    }

    #[test]
    fn test_negative_temperatures() {
        let m = decode_metar("FAOR 121000Z 18005KT 9999 M05/M08 Q1030", reference());
        assert_eq!(m.temp_c, Some(-5));
        assert_eq!(m.dewpoint_c, Some(-8));
    }

    #[test]
    fn test_day_outside_reference_month() {
        let m = decode_metar("FAOR 301000Z 18005KT 9999 15/10 Q1012", reference());
        assert_eq!(m.observed_time_utc, None);
        assert_eq!(m.qnh_hpa, Some(1012));
    }

    #[test]
    fn test_speci_detected() {
        let m = decode_metar("SPECI FAOR 121015Z 22015G30KT 3000 TSRA BKN015 18/16 Q1008", reference());
        assert!(m.is_speci);
    }

    #[test]
    fn test_decode_is_idempotent() {
        let raw = "FAOR 121000Z 34012G25KT 9999 BKN045 24/10 Q1018";
        assert_eq!(decode_metar(raw, reference()), decode_metar(raw, reference()));
    }
}
