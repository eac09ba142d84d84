//! Snapshot fetching with TTL caching and single-flight refresh.
//!
//! [`FeedFetcher`] owns the current [`FeedSnapshot`]. A snapshot younger than
//! the configured TTL is served as is. Otherwise the first caller to notice
//! takes the refresh lock, fetches all three documents from its
//! [`FeedSource`], normalizes them, and swaps the new snapshot in. Callers
//! that arrive while a refresh is running get the previous snapshot, or wait
//! for the refresh if there is none yet.
//!
//! A failed refresh never replaces a good snapshot. Callers keep receiving
//! the last good one and only see [`BikeshareError::FeedUnavailable`] when
//! no snapshot was ever built.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use bikeshare::fetch::FeedFetcher;
//! use bikeshare::source::DirFeedSource;
//!
//! let fetcher = FeedFetcher::new(DirFeedSource::new("/data/gbfs"), Duration::from_secs(60));
//! let snapshot = fetcher.get_snapshot()?;
//! println!("{} stations", snapshot.stations.len());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{BikeshareError, Result};
use crate::feed::{
    parse_document, FeedKind, FreeBikeStatusData, StationInformationData, StationStatusData,
};
use crate::model::FeedSnapshot;
use crate::normalize::normalize;

/// Default snapshot time-to-live in seconds.
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Somewhere the raw GBFS documents come from.
pub trait FeedSource: Send + Sync {
    /// Retrieve the raw body of one document.
    fn fetch(&self, kind: FeedKind) -> Result<Vec<u8>>;

    /// Short human-readable description, used in logs.
    fn describe(&self) -> String;
}

impl<T: FeedSource + ?Sized> FeedSource for Arc<T> {
    fn fetch(&self, kind: FeedKind) -> Result<Vec<u8>> {
        (**self).fetch(kind)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Statistics about snapshot usage.
#[derive(Debug, Clone, Default)]
pub struct FeedStats {
    /// Requests served from a fresh snapshot, or from the previous snapshot
    /// while another caller was refreshing.
    pub cache_hits: u64,
    /// Successful refreshes.
    pub refreshes: u64,
    /// Refresh attempts that failed.
    pub failed_refreshes: u64,
    /// Requests answered with a stale snapshot after a failed refresh.
    pub degraded_serves: u64,
    /// Age of the current snapshot, if any.
    pub snapshot_age: Option<Duration>,
    pub stations: usize,
    pub free_bikes: usize,
    /// Upstream `last_updated` of the current snapshot.
    pub last_updated: Option<u64>,
}

impl FeedStats {
    /// Fraction of lookups that did not trigger a fetch (0.0 to 1.0).
    ///
    /// Returns 0.0 if nothing has been requested yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.refreshes + self.failed_refreshes;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// Owns the current snapshot and refreshes it from a [`FeedSource`].
pub struct FeedFetcher {
    source: Box<dyn FeedSource>,
    ttl: Duration,
    current: RwLock<Option<Arc<FeedSnapshot>>>,
    /// Held for the duration of a refresh.
    refresh_lock: Mutex<()>,
    cache_hits: AtomicU64,
    refreshes: AtomicU64,
    failed_refreshes: AtomicU64,
    degraded_serves: AtomicU64,
}

impl FeedFetcher {
    /// Create a fetcher. No request is made until the first lookup.
    pub fn new(source: impl FeedSource + 'static, ttl: Duration) -> Self {
        Self::from_boxed(Box::new(source), ttl)
    }

    pub fn from_boxed(source: Box<dyn FeedSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            cache_hits: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            failed_refreshes: AtomicU64::new(0),
            degraded_serves: AtomicU64::new(0),
        }
    }

    /// Get a complete snapshot, refreshing it if it is older than the TTL.
    ///
    /// # Errors
    ///
    /// [`BikeshareError::FeedUnavailable`] if the refresh failed and no
    /// earlier snapshot exists.
    pub fn get_snapshot(&self) -> Result<Arc<FeedSnapshot>> {
        let current = self.current();
        if let Some(snapshot) = self.fresh(&current) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(snapshot);
        }

        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => match current {
                Some(previous) => {
                    tracing::debug!("Refresh in flight, serving previous snapshot");
                    self.cache_hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(previous);
                }
                None => self
                    .refresh_lock
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
            },
        };

        // Another caller may have refreshed while we waited for the lock.
        if let Some(snapshot) = self.fresh(&self.current()) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(snapshot);
        }

        match self.load() {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => match self.current() {
                Some(stale) => {
                    self.degraded_serves.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        error = %err,
                        age_secs = stale.age().as_secs(),
                        "Feed refresh failed, serving stale snapshot"
                    );
                    Ok(stale)
                }
                None => Err(BikeshareError::FeedUnavailable {
                    reason: err.to_string(),
                }),
            },
        }
    }

    /// Refresh now regardless of the current snapshot's age.
    ///
    /// Unlike [`Self::get_snapshot`] a failure is returned to the caller,
    /// though any existing snapshot stays current.
    pub fn refresh(&self) -> Result<Arc<FeedSnapshot>> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.load()
    }

    /// The current snapshot, however old.
    pub fn current(&self) -> Option<Arc<FeedSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the snapshot time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Describe where documents are fetched from.
    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Get usage statistics.
    pub fn stats(&self) -> FeedStats {
        let current = self.current();
        FeedStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            refreshes: self.refreshes.load(Ordering::Relaxed),
            failed_refreshes: self.failed_refreshes.load(Ordering::Relaxed),
            degraded_serves: self.degraded_serves.load(Ordering::Relaxed),
            snapshot_age: current.as_ref().map(|s| s.age()),
            stations: current.as_ref().map_or(0, |s| s.stations.len()),
            free_bikes: current.as_ref().map_or(0, |s| s.free_bikes.len()),
            last_updated: current.as_ref().and_then(|s| s.last_updated),
        }
    }

    fn fresh(&self, snapshot: &Option<Arc<FeedSnapshot>>) -> Option<Arc<FeedSnapshot>> {
        snapshot
            .as_ref()
            .filter(|s| s.age() < self.ttl)
            .cloned()
    }

    /// Fetch, parse and publish a new snapshot. Caller holds the refresh lock.
    fn load(&self) -> Result<Arc<FeedSnapshot>> {
        let started = Instant::now();
        let snapshot = match self.build() {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                self.failed_refreshes.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    source = %self.source.describe(),
                    error = %err,
                    "Feed refresh failed"
                );
                return Err(err);
            }
        };

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        self.refreshes.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            stations = snapshot.stations.len(),
            free_bikes = snapshot.free_bikes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Feed snapshot refreshed"
        );
        Ok(snapshot)
    }

    fn build(&self) -> Result<FeedSnapshot> {
        let [info, status, free] = self.fetch_all()?;

        let info = parse_document::<StationInformationData>(FeedKind::StationInformation, &info)?;
        let status = parse_document::<StationStatusData>(FeedKind::StationStatus, &status)?;
        let free = parse_document::<FreeBikeStatusData>(FeedKind::FreeBikeStatus, &free)?;

        let normalized = normalize(&info, &status, &free);
        Ok(FeedSnapshot::new(
            normalized.stations,
            normalized.free_bikes,
            status.last_updated,
        ))
    }

    /// Fetch the three documents in parallel. Any failure aborts the refresh.
    fn fetch_all(&self) -> Result<[Vec<u8>; 3]> {
        let source = &*self.source;
        let [info, status, free] = thread::scope(|scope| {
            FeedKind::ALL
                .map(|kind| (kind, scope.spawn(move || source.fetch(kind))))
                .map(|(kind, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(BikeshareError::FetchFailed {
                            feed: kind.name().to_string(),
                            reason: "fetch thread panicked".to_string(),
                        })
                    })
                })
        });
        Ok([info?, status?, free?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticFeedSource;
    use std::sync::atomic::AtomicBool;
    use std::sync::{mpsc, Barrier};

    const INFO: &str = r#"{"data": {"stations": [
        {"station_id": "A", "name": "Ferry Building", "lat": 37.7955, "lon": -122.3937}
    ]}}"#;
    const STATUS: &str = r#"{"last_updated": 1700000000, "data": {"stations": [
        {"station_id": "A", "num_bikes_available": 3, "num_docks_available": 2}
    ]}}"#;
    const FREE: &str = r#"{"data": {"bikes": []}}"#;

    /// Wraps a static source and fails every fetch while `failing` is set.
    struct FlakySource {
        inner: StaticFeedSource,
        failing: AtomicBool,
    }

    impl FeedSource for FlakySource {
        fn fetch(&self, kind: FeedKind) -> Result<Vec<u8>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(BikeshareError::FetchFailed {
                    feed: kind.name().to_string(),
                    reason: "HTTP 503".to_string(),
                });
            }
            self.inner.fetch(kind)
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    /// Wraps a static source; while `gated` is set, a station information
    /// fetch reports on `entered` and blocks until `release` receives.
    struct GatedSource {
        inner: StaticFeedSource,
        gated: AtomicBool,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl FeedSource for GatedSource {
        fn fetch(&self, kind: FeedKind) -> Result<Vec<u8>> {
            if kind == FeedKind::StationInformation && self.gated.load(Ordering::SeqCst) {
                self.entered.lock().unwrap().send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            self.inner.fetch(kind)
        }

        fn describe(&self) -> String {
            "gated".to_string()
        }
    }

    fn flaky(failing: bool) -> Arc<FlakySource> {
        Arc::new(FlakySource {
            inner: StaticFeedSource::new(INFO, STATUS, FREE),
            failing: AtomicBool::new(failing),
        })
    }

    #[test]
    fn test_snapshot_reused_within_ttl() {
        let source = Arc::new(StaticFeedSource::new(INFO, STATUS, FREE));
        let fetcher = FeedFetcher::new(source.clone(), Duration::from_secs(60));

        let first = fetcher.get_snapshot().unwrap();
        let second = fetcher.get_snapshot().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(), 3);
        assert_eq!(first.stations.len(), 1);
        assert_eq!(first.last_updated, Some(1_700_000_000));

        let stats = fetcher.stats();
        assert_eq!(stats.refreshes, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_expired_snapshot_refetched() {
        let source = Arc::new(StaticFeedSource::new(INFO, STATUS, FREE));
        let fetcher = FeedFetcher::new(source.clone(), Duration::ZERO);

        let first = fetcher.get_snapshot().unwrap();
        let second = fetcher.get_snapshot().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(source.fetch_count(), 6);
        assert_eq!(fetcher.stats().refreshes, 2);
    }

    #[test]
    fn test_cold_start_failure_is_feed_unavailable() {
        let fetcher = FeedFetcher::new(flaky(true), Duration::from_secs(60));

        let err = fetcher.get_snapshot().unwrap_err();
        assert!(matches!(err, BikeshareError::FeedUnavailable { .. }));
        assert!(err.to_string().contains("HTTP 503"));
        assert!(fetcher.current().is_none());
        assert_eq!(fetcher.stats().failed_refreshes, 1);
    }

    #[test]
    fn test_failed_refresh_serves_stale_snapshot() {
        let source = flaky(false);
        let fetcher = FeedFetcher::new(source.clone(), Duration::ZERO);

        let good = fetcher.get_snapshot().unwrap();
        source.failing.store(true, Ordering::SeqCst);

        let served = fetcher.get_snapshot().unwrap();
        assert!(Arc::ptr_eq(&good, &served));

        let stats = fetcher.stats();
        assert_eq!(stats.refreshes, 1);
        assert_eq!(stats.failed_refreshes, 1);
        assert_eq!(stats.degraded_serves, 1);

        // Recovery publishes a new snapshot.
        source.failing.store(false, Ordering::SeqCst);
        let recovered = fetcher.get_snapshot().unwrap();
        assert!(!Arc::ptr_eq(&good, &recovered));
    }

    #[test]
    fn test_forced_refresh_reports_failure_but_keeps_snapshot() {
        let source = flaky(false);
        let fetcher = FeedFetcher::new(source.clone(), Duration::from_secs(60));
        let good = fetcher.refresh().unwrap();

        source.failing.store(true, Ordering::SeqCst);
        assert!(fetcher.refresh().is_err());
        assert!(Arc::ptr_eq(&good, &fetcher.current().unwrap()));
    }

    #[test]
    fn test_unparseable_document_aborts_refresh() {
        let source = StaticFeedSource::new(INFO, "not json", FREE);
        let fetcher = FeedFetcher::new(source, Duration::from_secs(60));

        let err = fetcher.get_snapshot().unwrap_err();
        assert!(matches!(err, BikeshareError::FeedUnavailable { .. }));
        assert!(err.to_string().contains("station_status"));
    }

    #[test]
    fn test_concurrent_callers_share_one_refresh() {
        let source = Arc::new(StaticFeedSource::new(INFO, STATUS, FREE));
        let fetcher = FeedFetcher::new(source.clone(), Duration::from_secs(60));
        let barrier = Barrier::new(8);

        let snapshots: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        fetcher.get_snapshot().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(source.fetch_count(), 3);
        assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_stale_snapshot_served_while_refresh_in_flight() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let source = Arc::new(GatedSource {
            inner: StaticFeedSource::new(INFO, STATUS, FREE),
            gated: AtomicBool::new(false),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        // Every snapshot is expired as soon as it is built
        let fetcher = FeedFetcher::new(source.clone(), Duration::ZERO);

        let stale = fetcher.get_snapshot().unwrap();
        assert_eq!(source.inner.fetch_count(), 3);
        source.gated.store(true, Ordering::SeqCst);

        let fresh = thread::scope(|scope| {
            let fetcher = &fetcher;
            let refreshing = scope.spawn(move || fetcher.get_snapshot().unwrap());
            entered_rx.recv().unwrap();

            let hits_before = fetcher.stats().cache_hits;
            let (served_tx, served_rx) = mpsc::channel();
            scope.spawn(move || served_tx.send(fetcher.get_snapshot().unwrap()).unwrap());
            let served = served_rx.recv_timeout(Duration::from_secs(5));
            let stats = fetcher.stats();

            release_tx.send(()).unwrap();
            let fresh = refreshing.join().unwrap();

            let served = served.expect("caller waited for the in-flight refresh");
            assert!(Arc::ptr_eq(&stale, &served));
            assert_eq!(stats.cache_hits, hits_before + 1);
            assert_eq!(stats.refreshes, 1);
            fresh
        });

        assert!(!Arc::ptr_eq(&stale, &fresh));
        // Only the gated refresh fetched again
        assert_eq!(source.inner.fetch_count(), 6);
        assert_eq!(fetcher.stats().refreshes, 2);
    }
}
