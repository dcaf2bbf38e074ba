//! SQLite persistence for per-window item statistics
//!
//! One `item_stats` table keyed by `(item_id, window_start)`, so a
//! rerun over the same window replaces the record instead of stacking
//! duplicates. Timestamps are stored as unix seconds.

use crate::stats::PriceStats;
use crate::window::Window;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
    Io(std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Capability to persist one statistics record per (item, window),
/// idempotent on that key
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn upsert_stats(
        &self,
        item_id: u32,
        window: &Window,
        stats: &PriceStats,
    ) -> Result<(), StoreError>;
}

/// A statistics record as read back from the store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoredStats {
    pub window_start: i64,
    pub avg: f64,
    pub stdev: f64,
    pub num: u64,
}

/// SQLite implementation of [`StatsStore`]
pub struct SqliteStatsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStatsStore {
    /// Open (creating if needed) the database and run the schema
    /// migration. Enables WAL mode.
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS item_stats (
                item_id         INTEGER NOT NULL,
                window_start    INTEGER NOT NULL,
                window_end      INTEGER NOT NULL,
                avg             REAL NOT NULL,
                stdev           REAL NOT NULL,
                num             INTEGER NOT NULL,
                med             REAL NOT NULL,
                min_price       REAL NOT NULL,
                max_price       REAL NOT NULL,
                updated_at      INTEGER NOT NULL,
                created_at      INTEGER NOT NULL,
                PRIMARY KEY (item_id, window_start)
            )
            "#,
            [],
        )?;

        log::info!("📊 Opened stats database at {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Read back all records of one item whose window starts inside
    /// `[from, to)` unix seconds, ascending by window start.
    pub fn fetch_stats_range(
        &self,
        item_id: u32,
        from: i64,
        to: i64,
    ) -> Result<Vec<StoredStats>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT window_start, avg, stdev, num FROM item_stats
             WHERE item_id = ?1 AND window_start >= ?2 AND window_start < ?3
             ORDER BY window_start ASC",
        )?;

        let rows = stmt.query_map(rusqlite::params![item_id, from, to], |row| {
            Ok(StoredStats {
                window_start: row.get(0)?,
                avg: row.get(1)?,
                stdev: row.get(2)?,
                num: row.get::<_, i64>(3)? as u64,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

#[async_trait]
impl StatsStore for SqliteStatsStore {
    /// Upsert one record keyed by (item_id, window_start). `created_at`
    /// is preserved on update, `updated_at` always refreshed.
    async fn upsert_stats(
        &self,
        item_id: u32,
        window: &Window,
        stats: &PriceStats,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().timestamp();

        conn.execute(
            r#"
            INSERT INTO item_stats (
                item_id, window_start, window_end,
                avg, stdev, num, med, min_price, max_price,
                updated_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            ON CONFLICT(item_id, window_start) DO UPDATE SET
                window_end = excluded.window_end,
                avg = excluded.avg,
                stdev = excluded.stdev,
                num = excluded.num,
                med = excluded.med,
                min_price = excluded.min_price,
                max_price = excluded.max_price,
                updated_at = excluded.updated_at
            "#,
            rusqlite::params![
                item_id,
                window.start.timestamp(),
                window.end.timestamp(),
                stats.avg,
                stats.stdev,
                stats.num as i64,
                stats.med,
                stats.min,
                stats.max,
                now,
            ],
        )?;

        Ok(())
    }
}
