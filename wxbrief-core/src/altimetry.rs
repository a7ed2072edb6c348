//! Pressure altitude, ISA temperature, density altitude, cloud base, TAS and
//! the simplified oxygen and cabin-pressure figures.
//!
//! Standard atmosphere rules of thumb used for training briefs:
//! 30 ft per hPa, 2 °C per 1000 ft, 120 ft of density altitude per °C of
//! ISA deviation, 400 ft of cloud base per °C of temperature/dewpoint spread.

use serde::Serialize;

use crate::types::{round1, FEET_PER_METRE};

pub const STANDARD_QNH_HPA: f64 = 1013.25;
pub const FEET_PER_HPA: f64 = 30.0;
pub const ISA_SEA_LEVEL_C: f64 = 15.0;
/// Temperature lapse in °C per 1000 ft, applied to pressure altitude.
pub const ISA_LAPSE_C_PER_1000FT: f64 = 2.0;
pub const DA_FT_PER_DEG_C: f64 = 120.0;
pub const CLOUD_BASE_FT_PER_DEG_C: f64 = 400.0;
/// Oxygen index points lost per foot, and the floor it never drops below.
pub const OXYGEN_INDEX_FT_PER_POINT: f64 = 300.0;
pub const OXYGEN_INDEX_FLOOR: f64 = 10.0;
/// Cabin altitude cap relative to cruise, and feet gained per psi of differential.
pub const CABIN_CRUISE_FRACTION: f64 = 0.6;
pub const CABIN_FT_PER_PSI: f64 = 2000.0;
pub const CABIN_PROFILE_NOTE: &str = "Training-only, simplified pressurisation profile.";

/// Pressure altitude in feet, rounded to 0.1 ft.
pub fn pressure_altitude_ft(elevation_ft: f64, qnh_hpa: f64) -> f64 {
    round1(elevation_ft + (STANDARD_QNH_HPA - qnh_hpa) * FEET_PER_HPA)
}

/// ISA temperature at `altitude_ft` using the standard lapse.
pub fn isa_temp_c(altitude_ft: f64) -> f64 {
    isa_temp_with_lapse(altitude_ft, ISA_LAPSE_C_PER_1000FT)
}

pub fn isa_temp_with_lapse(altitude_ft: f64, lapse_c_per_1000ft: f64) -> f64 {
    round1(ISA_SEA_LEVEL_C - lapse_c_per_1000ft * altitude_ft / 1000.0)
}

pub fn isa_deviation_c(oat_c: f64, altitude_ft: f64) -> f64 {
    round1(oat_c - isa_temp_c(altitude_ft))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DensityAltitude {
    pub da_ft: Option<i64>,
    pub da_m: Option<i64>,
}

impl DensityAltitude {
    pub fn unknown() -> Self {
        DensityAltitude {
            da_ft: None,
            da_m: None,
        }
    }
}

/// Density altitude for an aerodrome. `None` pair when QNH or temperature is
/// missing.
pub fn density_altitude(elevation_m: f64, qnh_hpa: Option<f64>, temp_c: Option<f64>) -> DensityAltitude {
    density_altitude_with_lapse(elevation_m, qnh_hpa, temp_c, ISA_LAPSE_C_PER_1000FT)
}

/// As [`density_altitude`] with an explicit ISA lapse, in °C per 1000 ft of
/// pressure altitude.
pub fn density_altitude_with_lapse(
    elevation_m: f64,
    qnh_hpa: Option<f64>,
    temp_c: Option<f64>,
    lapse_c_per_1000ft: f64,
) -> DensityAltitude {
    let (Some(qnh), Some(temp)) = (qnh_hpa, temp_c) else {
        return DensityAltitude::unknown();
    };
    let pa = pressure_altitude_ft(elevation_m * FEET_PER_METRE, qnh);
    let isa = isa_temp_with_lapse(pa, lapse_c_per_1000ft);
    let da = pa + DA_FT_PER_DEG_C * (temp - isa);
    DensityAltitude {
        da_ft: Some(da.round() as i64),
        da_m: Some((da / FEET_PER_METRE).round() as i64),
    }
}

/// Convective cloud base estimate from the temperature/dewpoint spread.
pub fn cloud_base_ft(temp_c: Option<f64>, dewpoint_c: Option<f64>) -> Option<i32> {
    let (temp, dew) = (temp_c?, dewpoint_c?);
    Some(((temp - dew) * CLOUD_BASE_FT_PER_DEG_C).round() as i32)
}

/// Rough true airspeed: +2 % per 1000 ft, scaled by 1 % per °C ISA deviation.
pub fn tas_estimate(ias_kt: f64, altitude_ft: f64, isa_dev_c: Option<f64>) -> f64 {
    let temp_factor = 1.0 + isa_dev_c.unwrap_or(0.0) / 100.0;
    round1(ias_kt * (1.0 + altitude_ft / 1000.0 * 0.02) * temp_factor)
}

/// Relative oxygen availability: 100 at or below sea level, one point per
/// 300 ft above it, never under 10.
pub fn oxygen_index(altitude_ft: f64) -> f64 {
    if altitude_ft <= 0.0 {
        return 100.0;
    }
    round1((100.0 - altitude_ft / OXYGEN_INDEX_FT_PER_POINT).max(OXYGEN_INDEX_FLOOR))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CabinProfile {
    pub cabin_altitude_ft: i64,
    pub cabin_rate_fpm: f64,
    pub note: &'static str,
}

/// Cabin altitude for a pressurised cruise: the lower of 60 % of the cruise
/// level and the destination elevation plus 2000 ft per psi of differential.
pub fn cabin_profile(
    cruise_level_ft: f64,
    dest_elevation_ft: f64,
    cabin_rate_fpm: f64,
    max_differential_psi: f64,
) -> CabinProfile {
    let cabin = (cruise_level_ft * CABIN_CRUISE_FRACTION)
        .min(dest_elevation_ft + max_differential_psi * CABIN_FT_PER_PSI);
    CabinProfile {
        cabin_altitude_ft: cabin.round() as i64,
        cabin_rate_fpm,
        note: CABIN_PROFILE_NOTE,
    }
}
