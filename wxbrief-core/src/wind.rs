//! Wind components relative to a runway or a track.

use serde::Serialize;

use crate::types::{round1, Runway};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrosswindSide {
    Left,
    Right,
}

/// Wind resolved against one runway. All fields are `None` when the wind
/// direction or speed is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindComponents {
    pub headwind_kt: Option<f64>,
    pub crosswind_kt: Option<f64>,
    pub tailwind_kt: Option<f64>,
    pub crosswind_side: Option<CrosswindSide>,
}

impl WindComponents {
    pub fn unknown() -> Self {
        WindComponents {
            headwind_kt: None,
            crosswind_kt: None,
            tailwind_kt: None,
            crosswind_side: None,
        }
    }
}

/// Components for a single named runway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunwayWind {
    pub runway: String,
    #[serde(flatten)]
    pub components: WindComponents,
}

/// Resolve a wind into headwind, crosswind and tailwind for `runway_heading_deg`.
///
/// Headwind and tailwind are never both nonzero. Values are rounded to 0.1 kt.
pub fn wind_components(
    wind_dir_deg: Option<i32>,
    wind_speed_kt: Option<i32>,
    runway_heading_deg: i32,
) -> WindComponents {
    let (Some(dir), Some(speed)) = (wind_dir_deg, wind_speed_kt) else {
        return WindComponents::unknown();
    };
    let diff = ((dir - runway_heading_deg).rem_euclid(360) as f64).to_radians();
    let speed = speed as f64;
    let along = speed * diff.cos();
    let across = speed * diff.sin();

    let mut headwind = round1(along);
    let mut tailwind = 0.0;
    if headwind <= 0.0 {
        tailwind = headwind.abs();
        headwind = 0.0;
    }
    let side = if across > 0.0 {
        CrosswindSide::Right
    } else {
        CrosswindSide::Left
    };
    WindComponents {
        headwind_kt: Some(headwind),
        crosswind_kt: Some(round1(across.abs())),
        tailwind_kt: Some(tailwind),
        crosswind_side: Some(side),
    }
}

/// Components for every runway at a station, in runway order.
pub fn runway_winds(
    wind_dir_deg: Option<i32>,
    wind_speed_kt: Option<i32>,
    runways: &[Runway],
) -> Vec<RunwayWind> {
    runways
        .iter()
        .map(|rwy| RunwayWind {
            runway: rwy.designator.clone(),
            components: wind_components(wind_dir_deg, wind_speed_kt, rwy.magnetic_heading_deg),
        })
        .collect()
}

/// Largest crosswind across runways and the runway it occurs on.
pub fn max_crosswind(winds: &[RunwayWind]) -> (f64, Option<&str>) {
    max_by(winds, |c| c.crosswind_kt)
}

/// Largest tailwind across runways and the runway it occurs on.
pub fn max_tailwind(winds: &[RunwayWind]) -> (f64, Option<&str>) {
    max_by(winds, |c| c.tailwind_kt)
}

fn max_by(winds: &[RunwayWind], field: impl Fn(&WindComponents) -> Option<f64>) -> (f64, Option<&str>) {
    let mut best = (0.0, None);
    for rw in winds {
        let value = field(&rw.components).unwrap_or(0.0);
        if best.1.is_none() || value > best.0 {
            best = (value, Some(rw.runway.as_str()));
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Track components
// ---------------------------------------------------------------------------

/// Signed headwind along `track_deg`; negative is a tailwind.
pub fn headwind_component(wind_dir_deg: f64, wind_speed_kt: f64, track_deg: f64) -> f64 {
    let diff = (wind_dir_deg - track_deg + 360.0).rem_euclid(360.0).to_radians();
    round1(wind_speed_kt * diff.cos())
}

pub fn ground_speed_estimate(
    true_airspeed_kt: f64,
    wind_dir_deg: f64,
    wind_speed_kt: f64,
    track_deg: f64,
) -> f64 {
    round1(true_airspeed_kt - headwind_component(wind_dir_deg, wind_speed_kt, track_deg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tests::test_station;

    #[test]
    fn test_straight_headwind() {
        let c = wind_components(Some(90), Some(10), 90);
        assert_eq!(c.headwind_kt, Some(10.0));
        assert_eq!(c.crosswind_kt, Some(0.0));
        assert_eq!(c.tailwind_kt, Some(0.0));
    }

    #[test]
    fn test_pure_crosswind() {
        let c = wind_components(Some(90), Some(10), 180);
        assert_eq!(c.crosswind_kt, Some(10.0));
        assert_eq!(c.tailwind_kt, Some(0.0));
        assert_eq!(c.headwind_kt, Some(0.0));
        assert_eq!(c.crosswind_side, Some(CrosswindSide::Left));
    }

    #[test]
    fn test_crosswind_from_right() {
        let c = wind_components(Some(120), Some(10), 90);
        assert_eq!(c.crosswind_side, Some(CrosswindSide::Right));
        assert_eq!(c.crosswind_kt, Some(5.0));
        assert_eq!(c.headwind_kt, Some(8.7));
    }

    #[test]
    fn test_tailwind() {
        let c = wind_components(Some(270), Some(12), 90);
        assert_eq!(c.headwind_kt, Some(0.0));
        assert_eq!(c.tailwind_kt, Some(12.0));
    }

    #[test]
    fn test_headwind_and_tailwind_exclusive() {
        for dir in (0..360).step_by(5) {
            for hdg in (0..360).step_by(15) {
                let c = wind_components(Some(dir), Some(17), hdg);
                let head = c.headwind_kt.unwrap();
                let tail = c.tailwind_kt.unwrap();
                assert!(head == 0.0 || tail == 0.0, "dir {dir} hdg {hdg}");
                assert!(head >= 0.0 && tail >= 0.0);
                assert!(c.crosswind_kt.unwrap() >= 0.0);
            }
        }
    }

    #[test]
    fn test_unknown_wind_is_all_none() {
        assert_eq!(wind_components(None, Some(10), 90), WindComponents::unknown());
        assert_eq!(wind_components(Some(90), None, 90), WindComponents::unknown());
    }

    #[test]
    fn test_runway_maxima() {
        let station = test_station();
        let winds = runway_winds(Some(300), Some(20), &station.runways);
        assert_eq!(winds.len(), 2);
        let (xw, rwy) = max_crosswind(&winds);
        assert_eq!(xw, 20.0);
        assert_eq!(rwy, Some("03L"));
        let (tw, _) = max_tailwind(&winds);
        assert_eq!(tw, 0.0);
    }

    #[test]
    fn test_track_headwind() {
        assert_eq!(headwind_component(90.0, 20.0, 90.0), 20.0);
        assert_eq!(headwind_component(270.0, 20.0, 90.0), -20.0);
        assert_eq!(ground_speed_estimate(120.0, 270.0, 20.0, 90.0), 140.0);
        assert_eq!(ground_speed_estimate(120.0, 90.0, 20.0, 90.0), 100.0);
    }
}
