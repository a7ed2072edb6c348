//! Sunrise, sunset and civil twilight from a low-precision solar model.
//!
//! Times are UTC `HH:MM`. Polar day or night yields `None` for both ends.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Serialize, Serializer};

/// Geometric horizon plus refraction and solar semi-diameter.
pub const ZENITH_SUNRISE_DEG: f64 = 90.833;
/// Sun 6° below the horizon.
pub const ZENITH_CIVIL_TWILIGHT_DEG: f64 = 96.0;

const JULIAN_DAY_CE_OFFSET: f64 = 1_721_424.5;
const J2000: f64 = 2_451_545.0;
const OBLIQUITY_DEG: f64 = 23.44;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SunTimes {
    #[serde(serialize_with = "serialize_hhmm")]
    pub sunrise: Option<NaiveTime>,
    #[serde(serialize_with = "serialize_hhmm")]
    pub sunset: Option<NaiveTime>,
}

impl SunTimes {
    fn none() -> Self {
        SunTimes {
            sunrise: None,
            sunset: None,
        }
    }
}

/// Sun state for a station at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SunReport {
    #[serde(serialize_with = "serialize_hhmm")]
    pub sunrise: Option<NaiveTime>,
    #[serde(serialize_with = "serialize_hhmm")]
    pub sunset: Option<NaiveTime>,
    #[serde(serialize_with = "serialize_hhmm")]
    pub civil_twilight_start: Option<NaiveTime>,
    #[serde(serialize_with = "serialize_hhmm")]
    pub civil_twilight_end: Option<NaiveTime>,
    pub is_night: bool,
}

/// `HH:MM`, or `--` when unknown.
pub fn format_hhmm(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--".into())
}

fn serialize_hhmm<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
    match time {
        Some(t) => serializer.serialize_some(&t.format("%H:%M").to_string()),
        None => serializer.serialize_none(),
    }
}

fn julian_day(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64 + JULIAN_DAY_CE_OFFSET
}

/// Mean longitude (degrees) and mean anomaly (radians) `n` days from J2000.
fn mean_elements(n: f64) -> (f64, f64) {
    let mean_long = (280.46 + 0.985_647_4 * n).rem_euclid(360.0);
    let mean_anom = (357.528 + 0.985_600_3 * n).rem_euclid(360.0).to_radians();
    (mean_long, mean_anom)
}

fn declination(jd: f64) -> f64 {
    let (mean_long, g) = mean_elements(jd - J2000);
    let ecliptic_long = (mean_long + 1.915 * g.sin() + 0.02 * (2.0 * g).sin())
        .rem_euclid(360.0)
        .to_radians();
    (OBLIQUITY_DEG.to_radians().sin() * ecliptic_long.sin()).asin()
}

/// Equation of time in minutes.
fn equation_of_time(jd: f64) -> f64 {
    let (mean_long, g) = mean_elements(jd - J2000);
    let l = mean_long.to_radians();
    let ecliptic_long = l + 1.915_f64.to_radians() * g.sin() + 0.02_f64.to_radians() * (2.0 * g).sin();
    4.0 * (l - ecliptic_long).to_degrees()
}

fn minutes_to_time(minutes: f64) -> Option<NaiveTime> {
    let hours = (minutes / 60.0).floor().rem_euclid(24.0) as u32;
    let mins = minutes.rem_euclid(60.0).floor() as u32;
    NaiveTime::from_hms_opt(hours, mins.min(59), 0)
}

/// Rise and set times for the sun crossing `zenith_deg`.
pub fn sun_times(date: NaiveDate, lat_deg: f64, lon_deg: f64, zenith_deg: f64) -> SunTimes {
    let jd = julian_day(date);
    let decl = declination(jd);
    let eq_time = equation_of_time(jd);

    let lat = lat_deg.to_radians();
    let cos_h = (zenith_deg.to_radians().cos() - lat.sin() * decl.sin()) / (lat.cos() * decl.cos());
    if cos_h >= 1.0 || cos_h <= -1.0 {
        return SunTimes::none();
    }

    let h = cos_h.acos().to_degrees();
    let sunrise_min = 720.0 - 4.0 * (lon_deg + h) - eq_time;
    let sunset_min = 720.0 - 4.0 * (lon_deg - h) - eq_time;
    SunTimes {
        sunrise: minutes_to_time(sunrise_min),
        sunset: minutes_to_time(sunset_min),
    }
}

pub fn sunrise_sunset(date: NaiveDate, lat_deg: f64, lon_deg: f64) -> SunTimes {
    sun_times(date, lat_deg, lon_deg, ZENITH_SUNRISE_DEG)
}

/// Civil twilight: `sunrise` is morning twilight start, `sunset` is evening end.
pub fn civil_twilight(date: NaiveDate, lat_deg: f64, lon_deg: f64) -> SunTimes {
    sun_times(date, lat_deg, lon_deg, ZENITH_CIVIL_TWILIGHT_DEG)
}

/// Whether `now` falls between evening `sunset` and morning `sunrise`.
///
/// Normally sunset is later in the UTC day than sunrise and the night window
/// wraps midnight. West of the date line sunset can fall earlier in the UTC day
/// than sunrise, and the window is the closed interval between them. Unknown
/// times give `false`.
pub fn is_night(now: DateTime<Utc>, sunset: Option<NaiveTime>, sunrise: Option<NaiveTime>) -> bool {
    let (Some(sunset), Some(sunrise)) = (sunset, sunrise) else {
        return false;
    };
    let t = now.time();
    if sunset > sunrise {
        t >= sunset || t <= sunrise
    } else {
        t >= sunset && t <= sunrise
    }
}

/// Sunrise/sunset, twilight and night state for one station.
pub fn sun_report(now: DateTime<Utc>, lat_deg: f64, lon_deg: f64) -> SunReport {
    let date = now.date_naive();
    let sun = sunrise_sunset(date, lat_deg, lon_deg);
    let twilight = civil_twilight(date, lat_deg, lon_deg);
    SunReport {
        sunrise: sun.sunrise,
        sunset: sun.sunset,
        civil_twilight_start: twilight.sunrise,
        civil_twilight_end: twilight.sunset,
        is_night: is_night(now, twilight.sunset, twilight.sunrise),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn minutes_of(t: NaiveTime) -> i64 {
        (t.hour() * 60 + t.minute()) as i64
    }

    #[test]
    fn test_julian_day_epoch() {
        let jd = julian_day(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert_eq!(jd, 2_451_544.5);
    }

    #[test]
    fn test_equinox_at_greenwich() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let sun = sunrise_sunset(date, 0.0, 0.0);
        let rise = minutes_of(sun.sunrise.unwrap());
        let set = minutes_of(sun.sunset.unwrap());
        assert!((rise - 6 * 60).abs() <= 15, "sunrise {rise}");
        assert!((set - 18 * 60).abs() <= 15, "sunset {set}");
    }

    #[test]
    fn test_johannesburg_summer() {
        // Roughly 03:10 and 17:00 UTC in mid-December
        let date = NaiveDate::from_ymd_opt(2026, 12, 15).unwrap();
        let sun = sunrise_sunset(date, -26.14, 28.25);
        let rise = minutes_of(sun.sunrise.unwrap());
        let set = minutes_of(sun.sunset.unwrap());
        assert!((rise - (3 * 60 + 10)).abs() <= 20, "sunrise {rise}");
        assert!((set - 17 * 60).abs() <= 20, "sunset {set}");
        let twilight = civil_twilight(date, -26.14, 28.25);
        assert!(twilight.sunrise.unwrap() < sun.sunrise.unwrap());
        assert!(twilight.sunset.unwrap() > sun.sunset.unwrap());
    }

    #[test]
    fn test_polar_night_has_no_times() {
        let date = NaiveDate::from_ymd_opt(2026, 12, 21).unwrap();
        assert_eq!(sunrise_sunset(date, 80.0, 15.0), SunTimes::none());
        let date = NaiveDate::from_ymd_opt(2026, 6, 21).unwrap();
        assert_eq!(sunrise_sunset(date, 80.0, 15.0), SunTimes::none());
    }

    #[test]
    fn test_is_night_wraps_midnight() {
        let sunset = Some(hm(17, 30));
        let sunrise = Some(hm(3, 40));
        let at = |h, m| Utc.with_ymd_and_hms(2026, 2, 12, h, m, 0).unwrap();
        assert!(is_night(at(20, 0), sunset, sunrise));
        assert!(is_night(at(2, 0), sunset, sunrise));
        assert!(!is_night(at(12, 0), sunset, sunrise));
        assert!(is_night(at(17, 30), sunset, sunrise));
    }

    #[test]
    fn test_is_night_closed_interval() {
        let sunset = Some(hm(2, 15));
        let sunrise = Some(hm(14, 5));
        let at = |h, m| Utc.with_ymd_and_hms(2026, 2, 12, h, m, 0).unwrap();
        assert!(is_night(at(8, 0), sunset, sunrise));
        assert!(!is_night(at(20, 0), sunset, sunrise));
        assert!(!is_night(at(8, 0), None, sunrise));
    }

    #[test]
    fn test_serializes_as_hhmm() {
        let times = SunTimes {
            sunrise: Some(hm(3, 7)),
            sunset: None,
        };
        let json = serde_json::to_value(times).unwrap();
        assert_eq!(json["sunrise"], "03:07");
        assert!(json["sunset"].is_null());
        assert_eq!(format_hhmm(None), "--");
    }
}
