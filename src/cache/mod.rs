// src/cache/mod.rs
//! Slug -> parsed audit, refreshed on demand once older than the
//! revalidation window. At most one load per slug is in flight, and every
//! caller that joins it receives that load's outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::audit::AuditData;
use crate::storage::DocumentLoader;
use crate::utils::error::AuditError;

type Outcome = Result<Arc<AuditData>, AuditError>;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Arc<AuditData>,
    parsed_at: Instant,
}

/// One load of one slug, shared by every caller that joined it.
#[derive(Default)]
struct Flight {
    outcome: OnceCell<Outcome>,
}

/// A caller's membership in a flight. The last member to leave removes the
/// flight from the in-flight map, whether it finished or was abandoned.
struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<String, Arc<Flight>>>,
    slug: String,
    flight: Option<Arc<Flight>>,
}

impl FlightGuard<'_> {
    fn outcome(&self) -> &OnceCell<Outcome> {
        match &self.flight {
            Some(flight) => &flight.outcome,
            None => unreachable!("flight is only taken on drop"),
        }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Every clone and drop of a flight happens under this lock, so the
        // reference count below is exact: the map's copy plus ours.
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(flight) = self.flight.take() {
            let registered = in_flight
                .get(&self.slug)
                .map_or(false, |current| Arc::ptr_eq(current, &flight));
            if registered && Arc::strong_count(&flight) == 2 {
                in_flight.remove(&self.slug);
            }
            drop(flight);
        }
    }
}

/// Counters for logging; never consulted by the cache itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub refreshes: u64,
    pub stale_serves: u64,
    /// Callers handed the outcome of a load another caller ran.
    pub coalesced: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    refreshes: AtomicU64,
    stale_serves: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

pub struct AuditCache {
    loader: DocumentLoader,
    revalidate: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
    in_flight: Mutex<HashMap<String, Arc<Flight>>>,
    counters: Counters,
}

impl AuditCache {
    pub fn new(loader: DocumentLoader) -> Self {
        let revalidate = loader.config().revalidate;
        Self {
            loader,
            revalidate,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn loader(&self) -> &DocumentLoader {
        &self.loader
    }

    /// Cached value and whether it is still inside the window.
    fn lookup(&self, slug: &str) -> Option<(Arc<AuditData>, bool)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(slug)
            .map(|entry| (Arc::clone(&entry.data), entry.parsed_at.elapsed() < self.revalidate))
    }

    /// Joins the slug's flight, registering a new one if none is running.
    /// The flag is true when this caller registered it.
    fn join_flight(&self, slug: &str) -> (FlightGuard<'_>, bool) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let mut registered = false;
        let flight = Arc::clone(in_flight.entry(slug.to_string()).or_insert_with(|| {
            registered = true;
            Arc::new(Flight::default())
        }));
        let guard = FlightGuard {
            in_flight: &self.in_flight,
            slug: slug.to_string(),
            flight: Some(flight),
        };
        (guard, registered)
    }

    /// Fresh hits return immediately. A stale value is served as-is while
    /// another caller refreshes it; without any value, callers share the
    /// single in-flight load, including its failure.
    pub async fn get(&self, slug: &str) -> Result<Arc<AuditData>, AuditError> {
        let stale = match self.lookup(slug) {
            Some((data, true)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Cache hit for {}", slug);
                return Ok(data);
            }
            Some((data, false)) => Some(data),
            None => None,
        };

        let (flight, registered) = self.join_flight(slug);
        if let Some(stale) = stale {
            if !registered && !flight.outcome().initialized() {
                self.counters.stale_serves.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Refresh of {} in flight, serving stale copy", slug);
                return Ok(stale);
            }
        }

        let mut loaded_here = false;
        let outcome = flight
            .outcome()
            .get_or_init(|| {
                loaded_here = true;
                self.refresh(slug)
            })
            .await
            .clone();
        if !loaded_here {
            self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Joined in-flight load of {}", slug);
        }
        outcome
    }

    /// Re-parses from the loader. Runs once per flight.
    async fn refresh(&self, slug: &str) -> Outcome {
        // The previous flight may have stored a fresh copy after our lookup.
        if let Some((data, true)) = self.lookup(slug) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(data);
        }

        tracing::debug!("Refreshing cached audit {}", slug);
        match self.loader.load_by_slug(slug).await {
            Ok(data) => {
                let data = Arc::new(data);
                let entry = CacheEntry {
                    data: Arc::clone(&data),
                    parsed_at: Instant::now(),
                };
                self.entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(slug.to_string(), entry);
                self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                Ok(data)
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                if self.invalidate(slug) {
                    tracing::warn!("Evicted {} from cache after failed refresh: {}", slug, e);
                }
                Err(e)
            }
        }
    }

    /// Drops one entry. Returns whether it was cached.
    pub fn invalidate(&self, slug: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(slug)
            .is_some()
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads currently registered, finished or not.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            stale_serves: self.counters.stale_serves.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::LoaderConfig;
    use tempfile::TempDir;

    const SAMPLE: &str = include_str!("../../tests/fixtures/sample_audit.md");
    const SLUG: &str = "acme-coffee-co-2025-01-15";

    fn cache_with(document: &str) -> (TempDir, AuditCache) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("acme.md"), document).unwrap();
        let config = LoaderConfig::default().with_audits_dir(dir.path());
        (dir, AuditCache::new(DocumentLoader::new(config)))
    }

    fn cache_with_sample() -> (TempDir, AuditCache) {
        cache_with(SAMPLE)
    }

    fn without_summary() -> String {
        let start = SAMPLE.find("## Executive Summary").unwrap();
        let end = SAMPLE.find("## Trust Node Coverage").unwrap();
        format!("{}{}", &SAMPLE[..start], &SAMPLE[end..])
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_hits_do_not_touch_the_loader() {
        let (dir, cache) = cache_with_sample();
        let first = cache.get(SLUG).await.unwrap();

        // Even with the document gone, the window still serves the cached copy.
        std::fs::remove_file(dir.path().join("acme.md")).unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        let second = cache.get(SLUG).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().refreshes, 1);

        // Past the window the refresh fails and the entry is evicted.
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(matches!(cache.get(SLUG).await, Err(AuditError::DocumentNotFound(_))));
        assert!(cache.is_empty());
        assert_eq!(cache.stats().failures, 1);
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_are_reparsed() {
        let (dir, cache) = cache_with_sample();
        cache.get(SLUG).await.unwrap();

        let edited = SAMPLE.replace("**Overall Score:** 6.5/10", "**Overall Score:** 8.5/10");
        std::fs::write(dir.path().join("acme.md"), edited).unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        let refreshed = cache.get(SLUG).await.unwrap();
        assert_eq!(refreshed.executive_summary.overall_score, 8.5);
        assert_eq!(cache.stats().refreshes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_share_one_parse() {
        let (_dir, cache) = cache_with_sample();
        let (a, b, c) = tokio::join!(cache.get(SLUG), cache.get(SLUG), cache.get(SLUG));
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
        let stats = cache.stats();
        assert_eq!(stats.refreshes, 1);
        assert_eq!(stats.hits + stats.coalesced, 2);
        assert_eq!(cache.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_gets_of_a_malformed_document_share_one_failure() {
        let (_dir, cache) = cache_with(&without_summary());
        // Keeps the flight registered until every caller below has joined it.
        let (member, _) = cache.join_flight(SLUG);
        let (a, b, c, d) = tokio::join!(cache.get(SLUG), cache.get(SLUG), cache.get(SLUG), cache.get(SLUG));
        for outcome in [a, b, c, d] {
            assert!(matches!(outcome, Err(AuditError::MalformedDocument { .. })));
        }
        let stats = cache.stats();
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.coalesced, 3);
        assert_eq!(cache.in_flight_count(), 1);
        drop(member);
        assert_eq!(cache.in_flight_count(), 0);

        // A later request is a new load, not a replay of the old outcome.
        assert!(cache.get(SLUG).await.is_err());
        assert_eq!(cache.stats().failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_copy_is_served_while_refresh_is_in_flight() {
        let (_dir, cache) = cache_with_sample();
        let original = cache.get(SLUG).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        // Another caller's refresh is registered but has not finished.
        let (running, registered) = cache.join_flight(SLUG);
        assert!(registered);

        let served = cache.get(SLUG).await.unwrap();
        assert!(Arc::ptr_eq(&served, &original));
        assert_eq!(cache.stats().stale_serves, 1);
        assert_eq!(cache.stats().refreshes, 1);

        // Abandoning that refresh lets the next caller load again.
        drop(running);
        assert_eq!(cache.in_flight_count(), 0);
        let refreshed = cache.get(SLUG).await.unwrap();
        assert!(!Arc::ptr_eq(&refreshed, &original));
        assert_eq!(cache.stats().refreshes, 2);
    }

    #[tokio::test]
    async fn unknown_slugs_leave_nothing_behind() {
        let (_dir, cache) = cache_with_sample();
        for i in 0..50 {
            let slug = format!("bogus-{}", i);
            assert!(matches!(cache.get(&slug).await, Err(AuditError::DocumentNotFound(_))));
        }
        assert_eq!(cache.in_flight_count(), 0);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().failures, 50);
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let (_dir, cache) = cache_with_sample();
        cache.get(SLUG).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.invalidate(SLUG));
        assert!(!cache.invalidate(SLUG));
        cache.get(SLUG).await.unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
