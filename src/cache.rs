//! TTL key/value cache backed by SQLite.
//!
//! Values are stored as a JSON envelope `{"timestamp": <epoch-millis>,
//! "value": <payload>}` under binary keys. Freshness is decided on read: a
//! record at least as old as the configured period is treated as absent.
//! Keys share a `s:<provider>:` namespace prefix so one provider's records
//! can be dropped with a single range delete without touching the others.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_CACHE_PERIOD_HOURS, MAX_CACHE_PERIOD_HOURS};

/// Appended to a prefix to form the lower bound of a range delete; sorts
/// before every character the key vocabulary uses.
const RANGE_LOWER: char = '!';

/// Appended to a prefix to form the exclusive upper bound; sorts after
/// every character the key vocabulary uses.
const RANGE_UPPER: char = '~';

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("could not encode cache value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("cache lock poisoned")]
    LockPoisoned,
}

/// Envelope written to the store; the write time decides freshness on read.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord<T> {
    timestamp: i64,
    value: T,
}

pub struct TtlCache {
    conn: Mutex<Connection>,
    max_age_ms: i64,
}

impl TtlCache {
    /// Opens (or creates) the cache database at `db_path` with a freshness
    /// window of `cache_period_hours`. Periods outside 1..=150 hours fall
    /// back to the default.
    pub fn new(db_path: &Path, cache_period_hours: i64) -> Result<Self, CacheError> {
        let hours = clamp_period_hours(cache_period_hours);
        Self::with_max_age(db_path, Duration::from_secs(hours as u64 * 3600))
    }

    /// Opens a cache with an explicit freshness window, bypassing the
    /// configured-hours clamp.
    pub fn with_max_age(db_path: &Path, max_age: Duration) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let cache = Self {
            conn: Mutex::new(conn),
            max_age_ms: max_age.as_millis() as i64,
        };

        cache.create_schema()?;

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Get current timestamp in milliseconds since UNIX epoch
    fn current_timestamp_ms() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before UNIX epoch")
            .as_millis() as i64
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                key BLOB PRIMARY KEY,
                record TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(())
    }

    /// Returns the fresh value stored under `key`, or `None`.
    ///
    /// Expired records, corrupt records and store errors all come back as a
    /// miss so callers recompute instead of failing.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let conn = match self.lock_conn() {
            Ok(conn) => conn,
            Err(e) => {
                warn!("cache read for '{}' failed: {}", key, e);
                return None;
            }
        };

        let raw: String = match conn.query_row(
            "SELECT record FROM records WHERE key = ?1",
            [key.as_bytes()],
            |row| row.get(0),
        ) {
            Ok(raw) => raw,
            Err(rusqlite::Error::QueryReturnedNoRows) => return None,
            Err(e) => {
                warn!("cache read for '{}' failed: {}", key, e);
                return None;
            }
        };

        let record: CacheRecord<T> = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                debug!("discarding corrupt cache record for '{}': {}", key, e);
                return None;
            }
        };

        if Self::current_timestamp_ms() - record.timestamp >= self.max_age_ms {
            debug!("cache record for '{}' has expired", key);
            return None;
        }

        Some(record.value)
    }

    /// Stores `value` under `key`, stamped with the current time. An
    /// existing record is replaced and its age reset.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let record = serde_json::to_string(&CacheRecord {
            timestamp: Self::current_timestamp_ms(),
            value,
        })?;

        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO records (key, record) VALUES (?1, ?2)",
            (key.as_bytes(), record),
        )?;

        Ok(())
    }

    /// Deletes every record whose key starts with `prefix` and returns how
    /// many were removed.
    pub fn remove_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let lower = format!("{prefix}{RANGE_LOWER}").into_bytes();
        let upper = format!("{prefix}{RANGE_UPPER}").into_bytes();

        let conn = self.lock_conn()?;
        let removed = conn.execute(
            "DELETE FROM records WHERE key >= ?1 AND key < ?2",
            (lower, upper),
        )?;

        Ok(removed)
    }
}

fn clamp_period_hours(hours: i64) -> i64 {
    if (1..=MAX_CACHE_PERIOD_HOURS).contains(&hours) {
        hours
    } else {
        warn!(
            "cache period of {} hours is out of range, using {} hours",
            hours, DEFAULT_CACHE_PERIOD_HOURS
        );
        DEFAULT_CACHE_PERIOD_HOURS
    }
}
