//! wxbrief-core: decoding and risk evaluation for pilot weather briefs.
//!
//! No network and no database. Products come in through the traits in
//! [`source`], history through [`history::HistoryStore`]. The CLI crate
//! supplies the concrete sources and the SQLite store.

pub mod altimetry;
pub mod brief;
pub mod change;
pub mod config;
pub mod flags;
pub mod history;
pub mod metar;
pub mod notam;
pub mod route;
pub mod scoring;
pub mod source;
pub mod sun;
pub mod taf;
pub mod types;
pub mod wind;

// Re-export commonly used types at crate root
pub use brief::{evaluate_station, fetch_and_evaluate, StationBrief};
pub use config::{DataPack, Profile};
pub use flags::{FlagCode, Severity};
pub use history::{HistorySeries, HistorySnapshot, HistoryStore, MemoryHistoryStore};
pub use metar::{decode_metar, DecodedMetar};
pub use route::{evaluate_route, RouteBrief, RouteDef};
pub use taf::{decode_taf, DecodedTaf};
pub use types::*;
