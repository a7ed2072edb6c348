//! Route evaluation: track, cruise-level winds, freezing level and en-route
//! hazards from SIGMETs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::altimetry::oxygen_index;
use crate::brief::StationBrief;
use crate::config::Profile;
use crate::flags::{flag_severity, summarize_flags, FlagCode, FlagSet, Severity};
use crate::notam::SigmetEntry;
use crate::scoring::{stability_score, workload_score, StabilityInputs, StabilityScore, WorkloadInputs, WorkloadScore};
use crate::taf::{parse_taf_valid_to, time_to_expiry, TafExpiry};
use crate::types::round1;
use crate::wind::{ground_speed_estimate, headwind_component};

/// Planning true airspeed for ground-speed estimates.
pub const ROUTE_TAS_KT: f64 = 120.0;
/// Temperature band for airframe icing.
const ICING_WARM_C: f64 = 0.0;
const ICING_COLD_C: f64 = -20.0;

const EARTH_RADIUS_NM: f64 = 3440.065;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Initial great-circle bearing from point 1 to point 2, in [0, 360).
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlon = (lon2 - lon1).to_radians();
    let x = dlon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    x.atan2(y).to_degrees().rem_euclid(360.0)
}

/// Great-circle distance in nautical miles.
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_NM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDef {
    pub route_id: String,
    pub dep: String,
    pub dest: String,
    #[serde(default)]
    pub alternates: Vec<String>,
    #[serde(default)]
    pub corridor_nm: f64,
    pub cruise_levels_ft: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpperWindLevel {
    pub level_ft: i32,
    pub wind_dir_deg: f64,
    pub wind_speed_kt: f64,
    pub temp_c: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpperWinds {
    pub levels: Vec<UpperWindLevel>,
}

impl UpperWinds {
    /// Lowest listed level at or below 0 °C.
    pub fn freezing_level_ft(&self) -> Option<i32> {
        self.levels.iter().find(|l| l.temp_c <= 0.0).map(|l| l.level_ft)
    }
}

/// Upper wind at a cruise level resolved along the route track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteLevel {
    #[serde(flatten)]
    pub level: UpperWindLevel,
    pub headwind_kt: Option<f64>,
    pub ground_speed_kt: Option<f64>,
    pub oxygen_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteTafExpiry {
    pub dep: TafExpiry,
    pub dest: TafExpiry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteBrief {
    pub route_id: String,
    pub dep: String,
    pub dest: String,
    /// Alternates with a station brief, in route order.
    pub alternates: Vec<String>,
    pub corridor_nm: f64,
    pub track_deg: Option<f64>,
    pub distance_nm: Option<f64>,
    pub upper_winds: Vec<RouteLevel>,
    pub freezing_level_ft: Option<i32>,
    pub sigmet_lines: Vec<String>,
    /// NOTAM texts for departure and destination.
    pub notams: BTreeMap<String, Vec<String>>,
    pub taf_time_to_expiry: RouteTafExpiry,
    pub flags: FlagSet,
    pub severity: Severity,
    pub summary: &'static str,
    pub workload: WorkloadScore,
    pub stability: StabilityScore,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate one route against the station briefs of the same cycle.
pub fn evaluate_route(
    route: &RouteDef,
    briefs: &[StationBrief],
    sigmets: &[SigmetEntry],
    upper_winds: &UpperWinds,
    profile: &Profile,
    now: DateTime<Utc>,
) -> RouteBrief {
    let find = |ident: &str| briefs.iter().find(|b| b.ident == ident);
    let dep = find(route.dep.as_str());
    let dest = find(route.dest.as_str());

    let (track, distance) = match (dep, dest) {
        (Some(d), Some(a)) => (
            Some(round1(bearing_deg(d.latitude_deg, d.longitude_deg, a.latitude_deg, a.longitude_deg))),
            Some(round1(haversine_nm(d.latitude_deg, d.longitude_deg, a.latitude_deg, a.longitude_deg))),
        ),
        _ => (None, None),
    };

    let levels: Vec<RouteLevel> = upper_winds
        .levels
        .iter()
        .filter(|l| route.cruise_levels_ft.contains(&l.level_ft))
        .map(|l| RouteLevel {
            level: l.clone(),
            headwind_kt: track.map(|t| headwind_component(l.wind_dir_deg, l.wind_speed_kt, t)),
            ground_speed_kt: track
                .map(|t| ground_speed_estimate(ROUTE_TAS_KT, l.wind_dir_deg, l.wind_speed_kt, t)),
            oxygen_index: oxygen_index(f64::from(l.level_ft)),
        })
        .collect();

    let convective: Vec<&str> = sigmets
        .iter()
        .filter(|s| s.raw.contains("TS"))
        .map(|s| s.raw.as_str())
        .collect();
    let turbulence: Vec<&str> = sigmets
        .iter()
        .filter(|s| s.raw.contains("TURB"))
        .map(|s| s.raw.as_str())
        .collect();
    let icing_levels: Vec<i32> = levels
        .iter()
        .filter(|l| (ICING_COLD_C..=ICING_WARM_C).contains(&l.level.temp_c))
        .map(|l| l.level.level_ft)
        .collect();

    let mut flags = FlagSet::new();
    if !convective.is_empty() {
        flags.raise(
            FlagCode::ConvectiveRiskHigh,
            json!({
                "sigmets": convective,
                "note": "Thunderstorm SIGMET in force.",
            }),
        );
    }
    if !turbulence.is_empty() {
        flags.raise(
            FlagCode::TurbPossible,
            json!({
                "sigmets": turbulence,
                "note": "Turbulence SIGMET in force (training indication).",
            }),
        );
    }
    if !icing_levels.is_empty() {
        flags.raise(
            FlagCode::IcingPossible,
            json!({
                "levels_ft": icing_levels,
                "note": "Cruise level between 0 and -20 C (training indication).",
            }),
        );
    }

    let severity = flag_severity(&flags.codes, &profile.severity);
    let indicator = |on: bool| if on { 1.0 } else { 0.0 };
    let workload = workload_score(&WorkloadInputs {
        convective: indicator(!convective.is_empty()),
        night: indicator(dep.is_some_and(|d| d.sun.is_night)),
        rapid_change: indicator(!turbulence.is_empty()),
        ..Default::default()
    });
    let stability = stability_score(&StabilityInputs {
        metar_taf_mismatch: indicator(!convective.is_empty()),
        ..Default::default()
    });

    let expiry = |brief: Option<&StationBrief>| match brief {
        Some(b) => time_to_expiry(parse_taf_valid_to(&b.taf.valid_to, now), now),
        None => TafExpiry::unknown(),
    };

    let mut notams = BTreeMap::new();
    for brief in [dep, dest].into_iter().flatten() {
        notams.insert(
            brief.ident.clone(),
            brief.notams.iter().map(|n| n.text.clone()).collect(),
        );
    }

    let alternates = route
        .alternates
        .iter()
        .filter(|ident| find(ident.as_str()).is_some())
        .cloned()
        .collect();

    debug!(route = %route.route_id, flags = flags.codes.len(), "route evaluated");

    RouteBrief {
        route_id: route.route_id.clone(),
        dep: route.dep.clone(),
        dest: route.dest.clone(),
        alternates,
        corridor_nm: route.corridor_nm,
        track_deg: track,
        distance_nm: distance,
        upper_winds: levels,
        freezing_level_ft: upper_winds.freezing_level_ft(),
        sigmet_lines: sigmets.iter().map(|s| s.raw.clone()).collect(),
        notams,
        taf_time_to_expiry: RouteTafExpiry {
            dep: expiry(dep),
            dest: expiry(dest),
        },
        summary: summarize_flags(&flags.codes),
        flags,
        severity,
        workload,
        stability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::tests::noon;
    use crate::config::tests::test_profile;
    use crate::history::MemoryHistoryStore;

    #[test]
    fn test_bearing_due_east() {
        assert_eq!(bearing_deg(0.0, 0.0, 0.0, 1.0).round(), 90.0);
    }

    #[test]
    fn test_bearing_cardinal_points() {
        assert_eq!(bearing_deg(0.0, 0.0, 1.0, 0.0).round(), 0.0);
        assert_eq!(bearing_deg(0.0, 0.0, -1.0, 0.0).round(), 180.0);
        assert_eq!(bearing_deg(0.0, 0.0, 0.0, -1.0).round(), 270.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_nm(0.0, 0.0, 1.0, 0.0);
        assert!((d - 60.0).abs() < 0.2, "{d}");
    }

    #[test]
    fn test_freezing_level() {
        let winds = UpperWinds {
            levels: vec![
                UpperWindLevel { level_ft: 4500, wind_dir_deg: 270.0, wind_speed_kt: 15.0, temp_c: 12.0 },
                UpperWindLevel { level_ft: 9500, wind_dir_deg: 280.0, wind_speed_kt: 25.0, temp_c: 0.0 },
                UpperWindLevel { level_ft: 12500, wind_dir_deg: 280.0, wind_speed_kt: 35.0, temp_c: -6.0 },
            ],
        };
        assert_eq!(winds.freezing_level_ft(), Some(9500));
        assert_eq!(UpperWinds::default().freezing_level_ft(), None);
    }

    fn level(level_ft: i32, wind_dir_deg: f64, wind_speed_kt: f64, temp_c: f64) -> UpperWindLevel {
        UpperWindLevel { level_ft, wind_dir_deg, wind_speed_kt, temp_c }
    }

    fn route() -> RouteDef {
        RouteDef {
            route_id: "FAOR-FALA".into(),
            dep: "FAOR".into(),
            dest: "FALA".into(),
            alternates: vec!["FAGM".into(), "FALA".into()],
            corridor_nm: 10.0,
            cruise_levels_ft: vec![6500, 9500],
        }
    }

    fn station_briefs() -> Vec<StationBrief> {
        let mut store = MemoryHistoryStore::new();
        let dep = crate::brief::tests::brief(
            "FAOR 121000Z 03004KT 9999 FEW040 12/02 Q1025",
            "TAF FAOR 121100Z 1212/1318 03005KT CAVOK",
            &mut store,
        );
        let mut dest = dep.clone();
        dest.ident = "FALA".into();
        dest.latitude_deg = -25.9385;
        dest.longitude_deg = 27.9261;
        vec![dep, dest]
    }

    fn sigmet(raw: &str) -> SigmetEntry {
        SigmetEntry {
            kind: "SIGMET".into(),
            raw: raw.into(),
            details: raw.into(),
        }
    }

    fn winds() -> UpperWinds {
        UpperWinds {
            levels: vec![
                level(6500, 270.0, 20.0, 8.0),
                level(9500, 280.0, 30.0, -2.0),
                level(12500, 280.0, 40.0, -9.0),
            ],
        }
    }

    #[test]
    fn test_route_quiet() {
        let brief = evaluate_route(&route(), &station_briefs(), &[], &winds(), &test_profile(), noon());
        let track = brief.track_deg.unwrap();
        assert!((280.0..310.0).contains(&track), "{track}");
        let distance = brief.distance_nm.unwrap();
        assert!((15.0..25.0).contains(&distance), "{distance}");
        assert_eq!(brief.upper_winds.len(), 2);
        assert!(brief.upper_winds.iter().all(|l| l.headwind_kt.is_some()));
        assert_eq!(brief.upper_winds[0].oxygen_index, 78.3);
        // Westerlies on a westbound track
        assert!(brief.upper_winds[0].ground_speed_kt.unwrap() < ROUTE_TAS_KT);
        assert_eq!(brief.freezing_level_ft, Some(9500));
        assert_eq!(brief.alternates, vec!["FALA"]);
        assert_eq!(brief.notams.len(), 2);
        assert_eq!(brief.taf_time_to_expiry.dep.hours, Some(31.5));
        // 9500 ft sits in the icing band, which carries no severity
        assert_eq!(brief.flags.codes, vec![FlagCode::IcingPossible]);
        assert_eq!(brief.severity, Severity::Ok);
        assert_eq!(brief.summary, "ICING_POSSIBLE");
    }

    #[test]
    fn test_route_sigmets() {
        let sigmets = [
            sigmet("FAJA SIGMET A1 VALID 121000/121400 EMBD TS OBS"),
            sigmet("FAJA SIGMET B2 VALID 121000/121400 SEV TURB FCST"),
        ];
        let brief = evaluate_route(&route(), &station_briefs(), &sigmets, &winds(), &test_profile(), noon());
        assert!(brief.flags.contains(FlagCode::ConvectiveRiskHigh));
        assert!(brief.flags.contains(FlagCode::TurbPossible));
        assert_eq!(brief.severity, Severity::Warning);
        assert_eq!(brief.summary, "CONVECTIVE_RISK_HIGH");
        assert_eq!(brief.sigmet_lines.len(), 2);
        assert_eq!(brief.workload.score, 30.0);
        assert_eq!(brief.stability.score, 80.0);
        assert_eq!(brief.stability.drivers, vec!["metar_taf_mismatch"]);
    }

    #[test]
    fn test_route_missing_destination() {
        let briefs = station_briefs();
        let brief = evaluate_route(&route(), &briefs[..1], &[], &winds(), &test_profile(), noon());
        assert_eq!(brief.track_deg, None);
        assert_eq!(brief.distance_nm, None);
        assert!(brief.upper_winds.iter().all(|l| l.headwind_kt.is_none()));
        assert_eq!(brief.taf_time_to_expiry.dest, TafExpiry::unknown());
        assert!(brief.alternates.is_empty());
        assert_eq!(brief.notams.keys().collect::<Vec<_>>(), vec!["FAOR"]);
    }
}
