//! TAF decoder and validity-end resolution.
//!
//! The decoder only pulls out the validity window and the change groups. Turning
//! a `ddhh` group into an absolute time is done separately against an explicit
//! reference instant.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::types::round1;

static VALID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})/(\d{4})").unwrap());
static CHANGE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(TEMPO|BECMG|PROB\d{2}|FM\d{4})\b").unwrap());

/// Decoded TAF summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedTaf {
    pub raw: String,
    /// `ddhh`, empty when no validity group was found.
    pub valid_from: String,
    /// `ddhh`, empty when no validity group was found.
    pub valid_to: String,
    /// Change groups in document order.
    pub key_changes: Vec<String>,
}

impl DecodedTaf {
    /// Thunderstorm or temporary-change groups anywhere in the forecast.
    pub fn is_deteriorating(&self) -> bool {
        self.raw.contains("TS") || self.raw.contains("TEMPO")
    }

    pub fn mentions_thunderstorm(&self) -> bool {
        self.raw.contains("TS")
    }
}

pub fn decode_taf(raw: &str) -> DecodedTaf {
    let (valid_from, valid_to) = match VALID_REGEX.captures(raw) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (String::new(), String::new()),
    };
    let key_changes = CHANGE_REGEX
        .find_iter(raw)
        .map(|m| m.as_str().to_string())
        .collect();
    DecodedTaf {
        raw: raw.to_string(),
        valid_from,
        valid_to,
        key_changes,
    }
}

// ---------------------------------------------------------------------------
// Validity resolution
// ---------------------------------------------------------------------------

/// Resolve a `ddhh` validity-end group against `reference`.
///
/// A day earlier than the reference day belongs to the next month. Hour 24 is
/// midnight at the start of the following day. Anything outside that domain
/// resolves to `None`.
pub fn parse_taf_valid_to(valid_to: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if valid_to.len() != 4 || !valid_to.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let day: u32 = valid_to[..2].parse().ok()?;
    let hour: u32 = valid_to[2..].parse().ok()?;
    if hour > 24 {
        return None;
    }

    let (mut year, mut month) = (reference.year(), reference.month());
    if day < reference.day() {
        if month == 12 {
            month = 1;
            year += 1;
        } else {
            month += 1;
        }
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let midnight = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
    Some(midnight + Duration::hours(hour as i64))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Red,
    Amber,
    Ok,
    Unknown,
}

/// Hours remaining until a forecast expires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TafExpiry {
    pub hours: Option<f64>,
    pub urgency: Urgency,
}

impl TafExpiry {
    pub fn unknown() -> Self {
        TafExpiry {
            hours: None,
            urgency: Urgency::Unknown,
        }
    }
}

/// Red within the hour, amber within two.
pub fn time_to_expiry(end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> TafExpiry {
    let Some(end) = end else {
        return TafExpiry::unknown();
    };
    let hours = (end - now).num_seconds() as f64 / 3600.0;
    let urgency = if hours <= 1.0 {
        Urgency::Red
    } else if hours <= 2.0 {
        Urgency::Amber
    } else {
        Urgency::Ok
    };
    TafExpiry {
        hours: Some(round1(hours)),
        urgency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_decode_taf() {
        let taf = decode_taf(
            "TAF FAOR 121100Z 1212/1318 34010KT CAVOK TEMPO 1214/1218 TSRA BKN030CB BECMG 1300/1302 18005KT PROB30 1304/1306 BR FM131200 36012KT",
        );
        assert_eq!(taf.valid_from, "1212");
        assert_eq!(taf.valid_to, "1318");
        // FM131200 is a six-digit group and is not a key change.
        assert_eq!(taf.key_changes, vec!["TEMPO", "BECMG", "PROB30"]);
        assert!(taf.is_deteriorating());
    }

    #[test]
    fn test_decode_taf_from_group() {
        let taf = decode_taf("TAF FALA 121100Z 1212/1312 FM1300 18005KT");
        assert_eq!(taf.key_changes, vec!["FM1300"]);
        assert!(!taf.is_deteriorating());
    }

    #[test]
    fn test_decode_taf_without_validity() {
        let taf = decode_taf("NIL");
        assert_eq!(taf.valid_from, "");
        assert_eq!(taf.valid_to, "");
        assert!(taf.key_changes.is_empty());
    }

    #[test]
    fn test_valid_to_hour_24_rolls_to_next_day() {
        let reference = at(2026, 2, 12, 10);
        assert_eq!(parse_taf_valid_to("1224", reference), Some(at(2026, 2, 13, 0)));
    }

    #[test]
    fn test_valid_to_invalid_hour() {
        assert_eq!(parse_taf_valid_to("1260", at(2026, 2, 12, 10)), None);
        assert_eq!(parse_taf_valid_to("1225", at(2026, 2, 12, 10)), None);
    }

    #[test]
    fn test_valid_to_malformed() {
        let reference = at(2026, 2, 12, 10);
        assert_eq!(parse_taf_valid_to("", reference), None);
        assert_eq!(parse_taf_valid_to("121", reference), None);
        assert_eq!(parse_taf_valid_to("12A4", reference), None);
        assert_eq!(parse_taf_valid_to("3012", reference), None);
    }

    #[test]
    fn test_valid_to_rolls_into_next_month_and_year() {
        assert_eq!(parse_taf_valid_to("0106", at(2026, 1, 31, 18)), Some(at(2026, 2, 1, 6)));
        assert_eq!(parse_taf_valid_to("0106", at(2026, 12, 31, 18)), Some(at(2027, 1, 1, 6)));
    }

    #[test]
    fn test_time_to_expiry_urgency() {
        let now = at(2026, 2, 12, 10);
        let red = time_to_expiry(Some(at(2026, 2, 12, 11)), now);
        assert_eq!(red.hours, Some(1.0));
        assert_eq!(red.urgency, Urgency::Red);
        assert_eq!(time_to_expiry(Some(at(2026, 2, 12, 12)), now).urgency, Urgency::Amber);
        let ok = time_to_expiry(Some(at(2026, 2, 13, 0)), now);
        assert_eq!(ok.hours, Some(14.0));
        assert_eq!(ok.urgency, Urgency::Ok);
        assert_eq!(time_to_expiry(None, now), TafExpiry::unknown());
    }
}
