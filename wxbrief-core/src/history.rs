//! Per-station observation history.
//!
//! A series holds at most [`MAX_HISTORY`] snapshots, oldest first. Stores hand
//! out a copy of the series, the caller appends the current cycle, and writes
//! the whole capped series back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metar::DecodedMetar;
use crate::types::Result;

pub const MAX_HISTORY: usize = 200;

/// One observation cycle for one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub timestamp: Option<DateTime<Utc>>,
    pub wind_speed_kt: Option<i32>,
    pub wind_dir_deg: Option<i32>,
    pub qnh_hpa: Option<i32>,
    pub temp_c: Option<i32>,
    pub dewpoint_c: Option<i32>,
    pub visibility_m: Option<i32>,
    /// Reported ceiling, or the cloud-base estimate when none was reported.
    pub ceiling_ft_est: Option<i32>,
}

impl HistorySnapshot {
    pub fn from_metar(metar: &DecodedMetar, ceiling_ft_est: Option<i32>) -> Self {
        HistorySnapshot {
            timestamp: metar.observed_time_utc,
            wind_speed_kt: metar.wind_speed_kt,
            wind_dir_deg: metar.wind_dir_deg,
            qnh_hpa: metar.qnh_hpa,
            temp_c: metar.temp_c,
            dewpoint_c: metar.dewpoint_c,
            visibility_m: metar.visibility_m,
            ceiling_ft_est,
        }
    }

    /// Temperature minus dewpoint.
    pub fn spread_c(&self) -> Option<i32> {
        Some(self.temp_c? - self.dewpoint_c?)
    }
}

/// Time-ordered snapshots for one station, capped at [`MAX_HISTORY`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<HistorySnapshot>", into = "Vec<HistorySnapshot>")]
pub struct HistorySeries {
    entries: Vec<HistorySnapshot>,
}

impl From<Vec<HistorySnapshot>> for HistorySeries {
    fn from(entries: Vec<HistorySnapshot>) -> Self {
        HistorySeries::from_entries(entries)
    }
}

impl From<HistorySeries> for Vec<HistorySnapshot> {
    fn from(series: HistorySeries) -> Self {
        series.entries
    }
}

impl HistorySeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored entries, keeping only the most recent.
    pub fn from_entries(mut entries: Vec<HistorySnapshot>) -> Self {
        if entries.len() > MAX_HISTORY {
            let start = entries.len() - MAX_HISTORY;
            entries.drain(..start);
        }
        HistorySeries { entries }
    }

    pub fn push(&mut self, snapshot: HistorySnapshot) {
        self.entries.push(snapshot);
        if self.entries.len() > MAX_HISTORY {
            let start = self.entries.len() - MAX_HISTORY;
            self.entries.drain(..start);
            debug!(dropped = start, "history trimmed");
        }
    }

    pub fn entries(&self) -> &[HistorySnapshot] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistorySnapshot> {
        self.entries.last()
    }

    /// Last two snapshots as (previous, current).
    pub fn last_pair(&self) -> Option<(&HistorySnapshot, &HistorySnapshot)> {
        match self.entries.as_slice() {
            [.., prev, curr] => Some((prev, curr)),
            _ => None,
        }
    }

    /// Last `n` values of one field, oldest first.
    pub fn recent<T>(&self, n: usize, field: impl Fn(&HistorySnapshot) -> T) -> Vec<T> {
        let start = self.entries.len().saturating_sub(n);
        self.entries[start..].iter().map(field).collect()
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Keyed persistence of history series.
///
/// Writes take `&mut self`, so a store has one writer at a time. Loading an
/// unknown station yields an empty series.
pub trait HistoryStore {
    fn load(&self, ident: &str) -> Result<HistorySeries>;

    /// Replace the stored series for `ident` with `series`.
    fn save(&mut self, ident: &str, series: &HistorySeries) -> Result<()>;
}

/// History kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    series: HashMap<String, HistorySeries>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self, ident: &str) -> Result<HistorySeries> {
        Ok(self.series.get(ident).cloned().unwrap_or_default())
    }

    fn save(&mut self, ident: &str, series: &HistorySeries) -> Result<()> {
        self.series.insert(ident.to_string(), series.clone());
        Ok(())
    }
}
