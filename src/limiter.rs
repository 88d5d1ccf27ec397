// src/limiter.rs

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Days, Local, Utc};

/// Attempts used by one client in the current window.
///
/// `count` only grows within a window; the record is reinitialized the first
/// time `reset_at` is found to be in the past.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

/// Verdict returned by the limiter.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rate limit store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Key-value backend for rate-limit records.
///
/// The in-process `MemoryStore` serializes each call behind a mutex; the
/// read-modify-write across `get`/`set` is still racy under true
/// parallelism, which is accepted for this quota. A backend with atomic
/// increment can be swapped in behind this trait without touching callers.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError>;
    fn set(&self, key: &str, record: RateLimitRecord) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
    /// Keys whose window ended before `now`, for the housekeeping sweep.
    fn expired_keys(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError>;
}

/// In-memory record store. Contents are lost on restart, which matches the
/// source behavior and is fine: expired or missing records are treated the
/// same way.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(records.get(key).cloned())
    }

    fn set(&self, key: &str, record: RateLimitRecord) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| StoreError(e.to_string()))?;
        records.insert(key.to_string(), record);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| StoreError(e.to_string()))?;
        records.remove(key);
        Ok(())
    }

    fn expired_keys(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(records
            .iter()
            .filter(|(_, r)| r.reset_at < now)
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// Bounds how many generation requests a client key may issue per calendar
/// day. Windows reset at the next local midnight.
pub struct RateLimiter {
    store: Box<dyn RateLimitStore>,
    limit: u32,
}

impl RateLimiter {
    pub fn new(store: Box<dyn RateLimitStore>, limit: u32) -> Self {
        Self { store, limit }
    }

    pub fn in_memory(limit: u32) -> Self {
        Self::new(Box::new(MemoryStore::new()), limit)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Consume one attempt for `key` if the quota allows it.
    ///
    /// Within one window at most `limit` calls return `allowed = true` for a
    /// given key. A store read failure fails open: an unrelated
    /// infrastructure hiccup must not block legitimate use.
    pub fn check_and_consume(&self, key: &str) -> Verdict {
        self.check_and_consume_at(key, Utc::now())
    }

    pub fn check_and_consume_at(&self, key: &str, now: DateTime<Utc>) -> Verdict {
        let record = match self.store.get(key) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Rate limit store read failed, allowing request: {}", e);
                return Verdict {
                    allowed: true,
                    remaining: self.limit.saturating_sub(1),
                    reset_at: next_local_midnight(now),
                };
            }
        };

        let mut record = match record {
            Some(record) if record.reset_at > now => record,
            // Absent or expired: start a fresh window.
            _ => RateLimitRecord {
                count: 0,
                reset_at: next_local_midnight(now),
            },
        };

        if record.count >= self.limit {
            return Verdict {
                allowed: false,
                remaining: 0,
                reset_at: record.reset_at,
            };
        }

        record.count += 1;
        let verdict = Verdict {
            allowed: true,
            remaining: self.limit - record.count,
            reset_at: record.reset_at,
        };

        if let Err(e) = self.store.set(key, record) {
            tracing::warn!("Rate limit store write failed: {}", e);
        }

        verdict
    }

    /// Report the quota state for `key` without consuming an attempt.
    pub fn peek(&self, key: &str) -> Verdict {
        self.peek_at(key, Utc::now())
    }

    pub fn peek_at(&self, key: &str, now: DateTime<Utc>) -> Verdict {
        let record = match self.store.get(key) {
            Ok(Some(record)) if record.reset_at > now => record,
            _ => {
                return Verdict {
                    allowed: true,
                    remaining: self.limit,
                    reset_at: next_local_midnight(now),
                };
            }
        };

        Verdict {
            allowed: record.count < self.limit,
            remaining: self.limit.saturating_sub(record.count),
            reset_at: record.reset_at,
        }
    }

    /// Remove records whose window has passed. Purely bounds memory; expired
    /// records are treated as absent either way.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let keys = match self.store.expired_keys(now) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Rate limit sweep skipped: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            match self.store.delete(&key) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to evict rate limit record {}: {}", key, e),
            }
        }
        removed
    }
}

/// Start of the next calendar day in the server's local timezone.
fn next_local_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&Local);
    let tomorrow = local.date_naive() + Days::new(1);
    tomorrow
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        // DST edge where local midnight does not exist: fall back to +24h.
        .unwrap_or(now + chrono::Duration::days(1))
}
