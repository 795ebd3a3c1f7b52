//! In-process store with Redis semantics.
//!
//! Supports per-entry expiry, sets and glob scans. Not distributed: each
//! process has its own state. Intended for local development
//! (`memory://`) and tests.
//!
//! Expired entries are dropped when touched, on every scan, and by a sweep
//! every `SWEEP_INTERVAL` writes. Tag index sets carry no expiry, as in
//! Redis; they are removed by tag invalidation or `clear`, so a process that
//! keeps tagging under ever-new tags without invalidating them grows.

use super::{glob_match, CacheStore, StoreConnector};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const INVALID_EXPIRE: &str = "invalid expire time in 'set' command";

/// Number of writes between sweeps of expired entries.
const SWEEP_INTERVAL: u64 = 256;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
    writes: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty, reachable store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            writes: AtomicU64::new(0),
        }
    }

    /// Simulates an outage (`false`) or recovery (`true`).
    ///
    /// While unavailable every command and every connection attempt fails
    /// with a connection error; stored data is kept.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns true unless an outage is being simulated.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Number of live (non-expired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.lock().values().filter(|e| !e.is_expired(now)).count()
    }

    /// Returns true if no live keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored keys, expired ones not yet swept included.
    #[cfg(test)]
    fn stored(&self) -> usize {
        self.entries.lock().len()
    }

    fn sweep_expired(entries: &mut HashMap<String, Entry>) {
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));
    }

    fn check_available(&self) -> CacheResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(CacheError::ConnectionFailed("memory store unavailable".to_string()))
        }
    }

    /// Runs `f` on the entry map after dropping `key` if it has expired.
    fn with_live<R>(&self, key: &str, f: impl FnOnce(&mut HashMap<String, Entry>) -> R) -> CacheResult<R> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|e| e.is_expired(Instant::now())) {
            entries.remove(key);
        }
        Ok(f(&mut entries))
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.with_live(key, |entries| match entries.get(key) {
            None => Ok(None),
            Some(Entry { value: Value::Str(s), .. }) => Ok(Some(s.clone())),
            Some(_) => Err(CacheError::Backend(WRONGTYPE.to_string())),
        })?
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        let expires_at = Some(ttl_secs)
            .filter(|&secs| secs > 0)
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)))
            .ok_or_else(|| CacheError::Backend(INVALID_EXPIRE.to_string()))?;

        let sweep = (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0;
        self.with_live(key, |entries| {
            if sweep {
                Self::sweep_expired(entries);
            }
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Str(value.to_string()),
                    expires_at: Some(expires_at),
                },
            );
        })
    }

    async fn del(&self, keys: &[String]) -> CacheResult<u64> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let mut deleted = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired(now) {
                    deleted += 1;
                }
            }
        }
        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        self.with_live(key, |entries| entries.contains_key(key))
    }

    async fn ttl(&self, key: &str) -> CacheResult<i64> {
        self.with_live(key, |entries| match entries.get(key) {
            None => -2,
            Some(Entry { expires_at: None, .. }) => -1,
            Some(Entry { expires_at: Some(at), .. }) => {
                let remaining = at.saturating_duration_since(Instant::now());
                // Rounded to the nearest second, as Redis does.
                i64::try_from((remaining.as_millis() + 500) / 1000).unwrap_or(i64::MAX)
            }
        })
    }

    async fn incr_by(&self, key: &str, delta: i64) -> CacheResult<i64> {
        self.with_live(key, |entries| {
            let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: Value::Str("0".to_string()),
                expires_at: None,
            });

            let Value::Str(current) = &mut entry.value else {
                return Err(CacheError::Backend(WRONGTYPE.to_string()));
            };

            let next = current
                .parse::<i64>()
                .map_err(|_| CacheError::Backend("value is not an integer or out of range".to_string()))?
                .checked_add(delta)
                .ok_or_else(|| CacheError::Backend("increment or decrement would overflow".to_string()))?;

            *current = next.to_string();
            Ok(next)
        })?
    }

    async fn sadd(&self, key: &str, member: &str) -> CacheResult<()> {
        self.with_live(key, |entries| {
            let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: Value::Set(HashSet::new()),
                expires_at: None,
            });

            match &mut entry.value {
                Value::Set(members) => {
                    members.insert(member.to_string());
                    Ok(())
                }
                Value::Str(_) => Err(CacheError::Backend(WRONGTYPE.to_string())),
            }
        })?
    }

    async fn smembers(&self, key: &str) -> CacheResult<Vec<String>> {
        self.with_live(key, |entries| match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry { value: Value::Set(members), .. }) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(CacheError::Backend(WRONGTYPE.to_string())),
        })?
    }

    async fn scan_match(&self, pattern: &str) -> CacheResult<Vec<String>> {
        self.check_available()?;
        let mut entries = self.entries.lock();
        Self::sweep_expired(&mut entries);

        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check_available()
    }
}

/// Connector handing out a shared `MemoryStore`.
///
/// Connection attempts fail while the store simulates an outage.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
}

impl MemoryConnector {
    /// Creates a connector for `store`.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> CacheResult<Arc<dyn CacheStore>> {
        self.store.ping().await?;
        Ok(self.store.clone())
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}
