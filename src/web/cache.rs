//! Generated pages kept in memory and regenerated after a fixed interval.

use axum::http::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub status: StatusCode,
    pub html: String,
}

impl RenderedPage {
    pub fn ok(html: String) -> Self {
        Self {
            status: StatusCode::OK,
            html,
        }
    }

    pub fn not_found(html: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            html,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Lookup {
    Fresh(RenderedPage),
    /// Older than its revalidation interval; still servable while a new copy
    /// is generated.
    Stale(RenderedPage),
    Missing,
}

struct CachedPage {
    page: RenderedPage,
    generated_at: Instant,
}

/// Upper bound on cached not-found pages. Requests for arbitrary uids each
/// produce one, so they are kept apart from real pages and evicted oldest
/// first.
pub const NOT_FOUND_CAPACITY: usize = 256;

pub struct PageCache {
    pages: RwLock<HashMap<String, CachedPage>>,
    not_found: RwLock<HashMap<String, CachedPage>>,
    not_found_capacity: usize,
    in_flight: Mutex<HashSet<String>>,
}

impl Default for PageCache {
    fn default() -> Self {
        Self::with_not_found_capacity(NOT_FOUND_CAPACITY)
    }
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_not_found_capacity(capacity: usize) -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
            not_found: RwLock::new(HashMap::new()),
            not_found_capacity: capacity,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn lookup(&self, key: &str, ttl: Duration) -> Lookup {
        let pages = self.pages.read().unwrap();
        let not_found = self.not_found.read().unwrap();
        match pages.get(key).or_else(|| not_found.get(key)) {
            Some(cached) if cached.generated_at.elapsed() < ttl => Lookup::Fresh(cached.page.clone()),
            Some(cached) => Lookup::Stale(cached.page.clone()),
            None => Lookup::Missing,
        }
    }

    pub fn store(&self, key: &str, page: RenderedPage) {
        let cached = CachedPage {
            page,
            generated_at: Instant::now(),
        };
        let mut pages = self.pages.write().unwrap();
        let mut not_found = self.not_found.write().unwrap();

        if cached.page.status != StatusCode::NOT_FOUND {
            not_found.remove(key);
            pages.insert(key.to_string(), cached);
            return;
        }

        pages.remove(key);
        if self.not_found_capacity == 0 {
            return;
        }
        if !not_found.contains_key(key) && not_found.len() >= self.not_found_capacity {
            let oldest = not_found
                .iter()
                .min_by_key(|(_, c)| c.generated_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                not_found.remove(&oldest);
            }
        }
        not_found.insert(key.to_string(), cached);
    }

    pub fn len(&self) -> usize {
        self.pages.read().unwrap().len() + self.not_found.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claims generation of `key`. Returns false when another generation of
    /// the same page is already running.
    pub fn begin_generation(&self, key: &str) -> bool {
        self.in_flight.lock().unwrap().insert(key.to_string())
    }

    pub fn end_generation(&self, key: &str) {
        self.in_flight.lock().unwrap().remove(key);
    }

    pub fn is_generating(&self, key: &str) -> bool {
        self.in_flight.lock().unwrap().contains(key)
    }
}
