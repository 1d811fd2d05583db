use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::SessionKind;
use crate::session::SessionData;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Identifies one session dataset request.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub year: u16,
    pub event: String,
    pub kind: SessionKind,
}

struct CacheEntry {
    data: Arc<SessionData>,
    fetched_at: Instant,
}

/// Time-bounded cache of loaded session datasets, queried before any
/// external fetch.
pub struct SessionCache {
    ttl: Duration,
    entries: HashMap<SessionKey, CacheEntry>,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the cached dataset for `key` unless its entry has outlived
    /// the TTL.
    pub fn get(&self, key: &SessionKey) -> Option<Arc<SessionData>> {
        let entry = self.entries.get(key)?;
        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        Some(Arc::clone(&entry.data))
    }

    pub fn insert(&mut self, key: SessionKey, data: Arc<SessionData>) {
        self.entries.insert(
            key,
            CacheEntry {
                data,
                fetched_at: Instant::now(),
            },
        );
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

/// Event names per season, kept for the process lifetime.
#[derive(Default)]
pub struct ScheduleCache {
    years: HashMap<u16, Vec<String>>,
}

impl ScheduleCache {
    pub fn get(&self, year: u16) -> Option<&[String]> {
        self.years.get(&year).map(|e| e.as_slice())
    }

    pub fn insert(&mut self, year: u16, events: Vec<String>) {
        self.years.insert(year, events);
    }
}
