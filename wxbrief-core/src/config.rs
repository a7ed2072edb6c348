//! Configuration packs for wxbrief.
//!
//! Three YAML files live in the data directory:
//!
//! - `profiles.yaml`: pilot profiles with thresholds and severity lists
//! - `aerodromes.yaml`: station metadata and runways
//! - `routes.yaml`: route definitions
//!
//! Every threshold is required and validated when the file is loaded, so a
//! missing or nonsensical limit fails here rather than during flag evaluation.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::flags::FlagCode;
use crate::route::RouteDef;
use crate::types::{BriefError, Result, Station};

pub const PROFILES_FILE: &str = "profiles.yaml";
pub const AERODROMES_FILE: &str = "aerodromes.yaml";
pub const ROUTES_FILE: &str = "routes.yaml";

/// Licence tier that supplies the default profile.
pub const DEFAULT_TIER: &str = "PPL";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Named numeric limits used by the flag rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Thresholds {
    pub max_crosswind_kt: f64,
    pub max_tailwind_kt: f64,
    pub max_gust_spread_kt: f64,
    pub max_da_ft: f64,
    pub min_vis_m: f64,
    pub min_ceiling_ft: f64,
    pub short_runway_m: f64,
    pub qnh_fall_fast_hpa_per_hr: f64,
}

impl Thresholds {
    fn named(&self) -> [(&'static str, f64); 8] {
        [
            ("max_crosswind_kt", self.max_crosswind_kt),
            ("max_tailwind_kt", self.max_tailwind_kt),
            ("max_gust_spread_kt", self.max_gust_spread_kt),
            ("max_da_ft", self.max_da_ft),
            ("min_vis_m", self.min_vis_m),
            ("min_ceiling_ft", self.min_ceiling_ft),
            ("short_runway_m", self.short_runway_m),
            ("qnh_fall_fast_hpa_per_hr", self.qnh_fall_fast_hpa_per_hr),
        ]
    }

    /// All limits must be finite and positive.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.named() {
            if !value.is_finite() || value <= 0.0 {
                return Err(BriefError::Config(format!(
                    "threshold {name} must be a positive number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Flag codes that escalate to WARNING or CAUTION.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityMap {
    #[serde(default)]
    pub warning: Vec<FlagCode>,
    #[serde(default)]
    pub caution: Vec<FlagCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub licence_tier: String,
    pub thresholds: Thresholds,
    #[serde(default)]
    pub severity: SeverityMap,
}

#[derive(Debug, Deserialize)]
struct ProfilesFile {
    profiles: Vec<Profile>,
}

#[derive(Debug, Deserialize)]
struct AerodromesFile {
    aerodromes: Vec<Station>,
}

#[derive(Debug, Deserialize)]
struct RoutesFile {
    #[serde(default)]
    routes: Vec<RouteDef>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub fn parse_profiles(text: &str) -> Result<Vec<Profile>> {
    let file: ProfilesFile = serde_yaml::from_str(text)?;
    if file.profiles.is_empty() {
        return Err(BriefError::Config("no profiles defined".into()));
    }
    for profile in &file.profiles {
        profile
            .thresholds
            .validate()
            .map_err(|e| BriefError::Config(format!("profile {}: {e}", profile.name)))?;
    }
    Ok(file.profiles)
}

pub fn parse_aerodromes(text: &str) -> Result<Vec<Station>> {
    let file: AerodromesFile = serde_yaml::from_str(text)?;
    let mut seen = HashSet::new();
    for station in &file.aerodromes {
        if station.ident.trim().is_empty() {
            return Err(BriefError::Config("aerodrome with empty ident".into()));
        }
        if station.runways.is_empty() {
            return Err(BriefError::Config(format!("aerodrome {} has no runways", station.ident)));
        }
        if !seen.insert(station.ident.to_ascii_uppercase()) {
            return Err(BriefError::Config(format!("duplicate aerodrome {}", station.ident)));
        }
    }
    Ok(file.aerodromes)
}

pub fn parse_routes(text: &str) -> Result<Vec<RouteDef>> {
    let file: RoutesFile = serde_yaml::from_str(text)?;
    Ok(file.routes)
}

/// The `PPL` profile, else the first one.
pub fn default_profile(profiles: &[Profile]) -> Option<&Profile> {
    profiles
        .iter()
        .find(|p| p.licence_tier == DEFAULT_TIER)
        .or_else(|| profiles.first())
}

/// Profile by name, or the default when `name` is `None`.
pub fn select_profile<'a>(profiles: &'a [Profile], name: Option<&str>) -> Result<&'a Profile> {
    match name {
        Some(name) => profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| BriefError::Config(format!("unknown profile: {name}"))),
        None => default_profile(profiles).ok_or_else(|| BriefError::Config("no profiles defined".into())),
    }
}

// ---------------------------------------------------------------------------
// Data directory
// ---------------------------------------------------------------------------

/// Loaded contents of a data directory.
#[derive(Debug, Clone)]
pub struct DataPack {
    pub profiles: Vec<Profile>,
    pub aerodromes: Vec<Station>,
    pub routes: Vec<RouteDef>,
}

impl DataPack {
    /// Load all three files. `routes.yaml` is optional.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let profiles = parse_profiles(&read(&data_dir.join(PROFILES_FILE))?)?;
        let aerodromes = parse_aerodromes(&read(&data_dir.join(AERODROMES_FILE))?)?;
        let routes_path = data_dir.join(ROUTES_FILE);
        let routes = if routes_path.exists() {
            parse_routes(&read(&routes_path)?)?
        } else {
            Vec::new()
        };
        debug!(
            profiles = profiles.len(),
            aerodromes = aerodromes.len(),
            routes = routes.len(),
            dir = %data_dir.display(),
            "data pack loaded"
        );
        Ok(DataPack {
            profiles,
            aerodromes,
            routes,
        })
    }

    pub fn station(&self, ident: &str) -> Option<&Station> {
        self.aerodromes.iter().find(|s| s.ident.eq_ignore_ascii_case(ident))
    }

    /// Stations for a brief cycle: all aerodromes when `idents` is empty,
    /// else each listed one once, in first-mention order.
    pub fn select_stations(&self, idents: &[String]) -> Result<Vec<&Station>> {
        if idents.is_empty() {
            return Ok(self.aerodromes.iter().collect());
        }
        let mut seen = HashSet::new();
        let mut stations = Vec::with_capacity(idents.len());
        for ident in idents {
            let station = self
                .station(ident)
                .ok_or_else(|| BriefError::Config(format!("unknown aerodrome: {ident}")))?;
            if seen.insert(station.ident.to_ascii_uppercase()) {
                stations.push(station);
            }
        }
        Ok(stations)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| BriefError::Config(format!("{}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
