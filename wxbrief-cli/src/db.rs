//! SQLite history store: WAL mode, one row per snapshot.
//!
//! Each save replaces a station's series inside one transaction, so readers
//! never see a half-written series.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqlResult, Row};
use std::path::Path;

use wxbrief_core::history::{HistorySeries, HistorySnapshot, HistoryStore};
use wxbrief_core::{BriefError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ident TEXT NOT NULL,
    seq INTEGER NOT NULL,
    timestamp TEXT,
    wind_speed_kt INTEGER,
    wind_dir_deg INTEGER,
    qnh_hpa INTEGER,
    temp_c INTEGER,
    dewpoint_c INTEGER,
    visibility_m INTEGER,
    ceiling_ft_est INTEGER
);

CREATE INDEX IF NOT EXISTS idx_history_ident_seq ON history(ident, seq);
"#;

fn store_err(e: rusqlite::Error) -> BriefError {
    BriefError::Store(e.to_string())
}

/// Per-station row counts.
#[derive(Debug, Clone, PartialEq)]
pub struct StationCount {
    pub ident: String,
    pub snapshots: u64,
}

/// SQLite database holding observation history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &str) -> SqlResult<Self> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = Path::new(path).parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            Connection::open(path)?
        };

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Database { conn })
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> SqlResult<Self> {
        Self::open(":memory:")
    }

    fn load_series(&self, ident: &str) -> SqlResult<Vec<HistorySnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, wind_speed_kt, wind_dir_deg, qnh_hpa, temp_c, dewpoint_c,
                    visibility_m, ceiling_ft_est
             FROM history WHERE ident = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![ident], snapshot_from_row)?;
        rows.collect()
    }

    fn replace_series(&mut self, ident: &str, series: &HistorySeries) -> SqlResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM history WHERE ident = ?1", params![ident])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO history (ident, seq, timestamp, wind_speed_kt, wind_dir_deg, qnh_hpa,
                                      temp_c, dewpoint_c, visibility_m, ceiling_ft_est)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for (seq, s) in series.entries().iter().enumerate() {
                stmt.execute(params![
                    ident,
                    seq as i64,
                    s.timestamp.map(|t| t.to_rfc3339()),
                    s.wind_speed_kt,
                    s.wind_dir_deg,
                    s.qnh_hpa,
                    s.temp_c,
                    s.dewpoint_c,
                    s.visibility_m,
                    s.ceiling_ft_est,
                ])?;
            }
        }
        tx.commit()
    }

    /// Stations with stored history, by ident.
    pub fn station_counts(&self) -> SqlResult<Vec<StationCount>> {
        let mut stmt = self
            .conn
            .prepare("SELECT ident, COUNT(*) FROM history GROUP BY ident ORDER BY ident")?;
        let rows = stmt.query_map([], |row| {
            Ok(StationCount {
                ident: row.get(0)?,
                snapshots: row.get::<_, i64>(1)? as u64,
            })
        })?;
        rows.collect()
    }
}

fn snapshot_from_row(row: &Row<'_>) -> SqlResult<HistorySnapshot> {
    let timestamp: Option<String> = row.get(0)?;
    Ok(HistorySnapshot {
        // Unparseable timestamps degrade to unknown
        timestamp: timestamp
            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
            .map(|t| t.with_timezone(&Utc)),
        wind_speed_kt: row.get(1)?,
        wind_dir_deg: row.get(2)?,
        qnh_hpa: row.get(3)?,
        temp_c: row.get(4)?,
        dewpoint_c: row.get(5)?,
        visibility_m: row.get(6)?,
        ceiling_ft_est: row.get(7)?,
    })
}

impl HistoryStore for Database {
    fn load(&self, ident: &str) -> Result<HistorySeries> {
        let entries = self.load_series(ident).map_err(store_err)?;
        Ok(HistorySeries::from_entries(entries))
    }

    fn save(&mut self, ident: &str, series: &HistorySeries) -> Result<()> {
        self.replace_series(ident, series).map_err(store_err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
