//! Workload and stability scores.
//!
//! Both are weighted sums over named inputs. Each input is clamped to [0, 1]
//! before weighting. The three largest non-zero contributions are reported,
//! largest first, ties in input order.

use serde::Serialize;

use crate::types::round1;

const WORKLOAD_HIGH: f64 = 66.0;
const WORKLOAD_MEDIUM: f64 = 33.0;
const STABILITY_UNSTABLE: f64 = 40.0;
const STABILITY_VARIABLE: f64 = 70.0;
const TOP_FACTORS: usize = 3;

/// Workload inputs as ratios against profile limits or 0/1 indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WorkloadInputs {
    pub crosswind_ratio: f64,
    pub gust_ratio: f64,
    pub da_ratio: f64,
    pub convective: f64,
    pub night: f64,
    pub rapid_change: f64,
}

impl WorkloadInputs {
    fn weighted(&self) -> [(&'static str, f64, f64); 6] {
        [
            ("crosswind_ratio", self.crosswind_ratio, 25.0),
            ("gust_ratio", self.gust_ratio, 15.0),
            ("da_ratio", self.da_ratio, 20.0),
            ("convective", self.convective, 20.0),
            ("night", self.night, 10.0),
            ("rapid_change", self.rapid_change, 10.0),
        ]
    }
}

/// Stability penalty inputs, each 0..1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StabilityInputs {
    pub wind_shift: f64,
    pub gust_spread: f64,
    pub metar_taf_mismatch: f64,
    pub qnh_fall: f64,
    pub speci: f64,
}

impl StabilityInputs {
    fn weighted(&self) -> [(&'static str, f64, f64); 5] {
        [
            ("wind_shift", self.wind_shift, 25.0),
            ("gust_spread", self.gust_spread, 20.0),
            ("metar_taf_mismatch", self.metar_taf_mismatch, 20.0),
            ("qnh_fall", self.qnh_fall, 20.0),
            ("speci", self.speci, 15.0),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkloadCategory {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StabilityCategory {
    Stable,
    Variable,
    Unstable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadScore {
    /// 0..100, higher is busier.
    pub score: f64,
    pub category: WorkloadCategory,
    pub top_contributors: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityScore {
    /// 0..100, lower is less stable.
    pub score: f64,
    pub category: StabilityCategory,
    pub drivers: Vec<&'static str>,
}

/// Sum of clamped, weighted inputs plus the ranked non-zero contributors.
fn weigh(inputs: &[(&'static str, f64, f64)]) -> (f64, Vec<&'static str>) {
    let mut total = 0.0;
    let mut contributors: Vec<(&'static str, f64)> = Vec::new();
    for &(name, value, weight) in inputs {
        let contribution = clamp_unit(value) * weight;
        total += contribution;
        if contribution > 0.0 {
            contributors.push((name, round1(contribution)));
        }
    }
    // Stable sort keeps input order among equal contributions
    contributors.sort_by(|a, b| b.1.total_cmp(&a.1));
    let top = contributors
        .into_iter()
        .take(TOP_FACTORS)
        .map(|(name, _)| name)
        .collect();
    (total, top)
}

/// NaN counts as zero.
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub fn workload_score(inputs: &WorkloadInputs) -> WorkloadScore {
    let (total, top) = weigh(&inputs.weighted());
    let score = round1(total.min(100.0));
    let category = if score >= WORKLOAD_HIGH {
        WorkloadCategory::High
    } else if score >= WORKLOAD_MEDIUM {
        WorkloadCategory::Medium
    } else {
        WorkloadCategory::Low
    };
    WorkloadScore {
        score,
        category,
        top_contributors: top,
    }
}

pub fn stability_score(inputs: &StabilityInputs) -> StabilityScore {
    let (penalty, drivers) = weigh(&inputs.weighted());
    let score = round1((100.0 - penalty).max(0.0));
    let category = if score < STABILITY_UNSTABLE {
        StabilityCategory::Unstable
    } else if score < STABILITY_VARIABLE {
        StabilityCategory::Variable
    } else {
        StabilityCategory::Stable
    };
    StabilityScore {
        score,
        category,
        drivers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workload_all_inputs_maxed() {
        let w = workload_score(&WorkloadInputs {
            crosswind_ratio: 1.0,
            gust_ratio: 1.0,
            da_ratio: 1.0,
            convective: 1.0,
            night: 1.0,
            rapid_change: 1.0,
        });
        assert_eq!(w.score, 100.0);
        assert_eq!(w.category, WorkloadCategory::High);
        assert_eq!(w.top_contributors, vec!["crosswind_ratio", "da_ratio", "convective"]);
    }

    #[test]
    fn test_workload_inputs_are_clamped() {
        let w = workload_score(&WorkloadInputs {
            crosswind_ratio: 3.0,
            gust_ratio: -2.0,
            ..Default::default()
        });
        assert_eq!(w.score, 25.0);
        assert_eq!(w.category, WorkloadCategory::Low);
        assert_eq!(w.top_contributors, vec!["crosswind_ratio"]);
    }

    #[test]
    fn test_workload_medium_band() {
        let w = workload_score(&WorkloadInputs {
            convective: 1.0,
            night: 1.0,
            gust_ratio: 0.2,
            ..Default::default()
        });
        assert_eq!(w.score, 33.0);
        assert_eq!(w.category, WorkloadCategory::Medium);
        assert_eq!(w.top_contributors, vec!["convective", "night", "gust_ratio"]);
    }

    #[test]
    fn test_workload_empty() {
        let w = workload_score(&WorkloadInputs::default());
        assert_eq!(w.score, 0.0);
        assert!(w.top_contributors.is_empty());
    }

    #[test]
    fn test_stability_all_inputs_maxed() {
        let s = stability_score(&StabilityInputs {
            wind_shift: 1.0,
            gust_spread: 1.0,
            metar_taf_mismatch: 1.0,
            qnh_fall: 1.0,
            speci: 1.0,
        });
        assert_eq!(s.score, 0.0);
        assert_eq!(s.category, StabilityCategory::Unstable);
        assert_eq!(s.drivers, vec!["wind_shift", "gust_spread", "metar_taf_mismatch"]);
    }

    #[test]
    fn test_stability_bands() {
        let calm = stability_score(&StabilityInputs::default());
        assert_eq!(calm.score, 100.0);
        assert_eq!(calm.category, StabilityCategory::Stable);

        let variable = stability_score(&StabilityInputs {
            metar_taf_mismatch: 1.0,
            qnh_fall: 1.0,
            ..Default::default()
        });
        assert_eq!(variable.score, 60.0);
        assert_eq!(variable.category, StabilityCategory::Variable);
        assert_eq!(variable.drivers, vec!["metar_taf_mismatch", "qnh_fall"]);
    }

    #[test]
    fn test_nan_input_ignored() {
        let s = stability_score(&StabilityInputs {
            wind_shift: f64::NAN,
            ..Default::default()
        });
        assert_eq!(s.score, 100.0);
    }
}
