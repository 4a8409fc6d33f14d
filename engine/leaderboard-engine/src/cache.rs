//! Read-through, compute-once leaderboard cache
//!
//! A stored snapshot is final and returned as-is. On a miss, callers for the
//! same match queue behind a per-match lock, so only the first one computes;
//! the rest find the snapshot it persisted. Across processes the store's
//! conditional write picks a single winner and losers adopt the stored copy.

use crate::error::{with_timeout, LeaderboardError, Result};
use crate::ranking::RankingEngine;
use crate::types::{LeaderboardSnapshot, MatchId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use snapshot_store::{SnapshotStore, WriteOutcome};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Point-in-time copy of the cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Served straight from the store
    pub hits: u64,
    /// Store had nothing on first read
    pub misses: u64,
    /// Found the snapshot after waiting on another caller's computation
    pub shared: u64,
    /// Ranking computations started
    pub computations: u64,
    /// Snapshots persisted by this cache
    pub writes: u64,
    /// Conditional writes lost to another writer
    pub lost_races: u64,
}

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    shared: AtomicU64,
    computations: AtomicU64,
    writes: AtomicU64,
    lost_races: AtomicU64,
}

impl CacheCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            shared: self.shared.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            lost_races: self.lost_races.load(Ordering::Relaxed),
        }
    }
}

/// Holds one match's lock entry; drops the entry when no one else needs it
struct LockLease<'a> {
    locks: &'a DashMap<MatchId, Arc<Mutex<()>>>,
    match_id: &'a str,
    lock: Arc<Mutex<()>>,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        // Two references left means only the map and this lease hold it.
        self.locks.remove_if(self.match_id, |_, lock| Arc::strong_count(lock) == 2);
    }
}

/// Serves leaderboards, computing each at most once and persisting the result
pub struct LeaderboardCache {
    engine: Arc<RankingEngine>,
    store: Arc<dyn SnapshotStore<LeaderboardSnapshot>>,
    locks: DashMap<MatchId, Arc<Mutex<()>>>,
    io_timeout: Duration,
    counters: CacheCounters,
}

impl LeaderboardCache {
    pub fn new(
        engine: Arc<RankingEngine>,
        store: Arc<dyn SnapshotStore<LeaderboardSnapshot>>,
    ) -> Self {
        let io_timeout = engine.io_timeout();
        Self { engine, store, locks: DashMap::new(), io_timeout, counters: CacheCounters::default() }
    }

    /// Leaderboard for `match_id`, computed and persisted on first request.
    ///
    /// Empty leaderboards are returned but not stored, so a later call
    /// recomputes once predictions exist. The caller must only pass matches
    /// whose results are final: stored snapshots are never refreshed.
    pub async fn get(&self, match_id: &str) -> Result<LeaderboardSnapshot> {
        if let Some(snapshot) = self.read_stored(match_id).await? {
            CacheCounters::bump(&self.counters.hits);
            debug!("Leaderboard cache hit for match {}", match_id);
            return Ok(snapshot);
        }
        CacheCounters::bump(&self.counters.misses);
        debug!("Leaderboard cache miss for match {}", match_id);

        let lease = self.lease(match_id);
        let _guard = lease.lock.lock().await;
        self.fill(match_id).await
    }

    /// Stored snapshot for `match_id`, without computing on a miss
    pub async fn peek(&self, match_id: &str) -> Result<Option<LeaderboardSnapshot>> {
        self.read_stored(match_id).await
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Number of matches with a live lock entry
    pub fn pending_locks(&self) -> usize {
        self.locks.len()
    }

    pub fn engine(&self) -> &Arc<RankingEngine> {
        &self.engine
    }

    fn lease<'a>(&'a self, match_id: &'a str) -> LockLease<'a> {
        let lock = self
            .locks
            .entry(match_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        LockLease { locks: &self.locks, match_id, lock }
    }

    /// Runs with the match lock held
    async fn fill(&self, match_id: &str) -> Result<LeaderboardSnapshot> {
        if let Some(snapshot) = self.read_stored(match_id).await? {
            CacheCounters::bump(&self.counters.shared);
            debug!("Leaderboard for match {} was filled while waiting", match_id);
            return Ok(snapshot);
        }

        CacheCounters::bump(&self.counters.computations);
        let snapshot = self.engine.compute(match_id).await?;

        if snapshot.is_empty() {
            debug!("Leaderboard for match {} is empty, not persisting", match_id);
            return Ok(snapshot);
        }

        let outcome = with_timeout(self.io_timeout, "snapshot write", async {
            Ok(self.store.write_if_absent(match_id, &snapshot).await?)
        })
        .await?;

        match outcome {
            WriteOutcome::Written => {
                CacheCounters::bump(&self.counters.writes);
                info!(
                    "Persisted leaderboard for match {} ({} entries) to {} store",
                    match_id,
                    snapshot.len(),
                    self.store.backend_name()
                );
                Ok(snapshot)
            }
            WriteOutcome::AlreadyExists => {
                CacheCounters::bump(&self.counters.lost_races);
                warn!(
                    "Leaderboard for match {} was written by another writer, using stored copy",
                    match_id
                );
                self.read_stored(match_id).await?.ok_or_else(|| {
                    LeaderboardError::storage(format!(
                        "snapshot for match {} reported present but could not be read",
                        match_id
                    ))
                })
            }
        }
    }

    async fn read_stored(&self, match_id: &str) -> Result<Option<LeaderboardSnapshot>> {
        with_timeout(self.io_timeout, "snapshot read", async {
            Ok(self.store.read(match_id).await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryMatchRegistry, InMemoryPerformanceIndex, InMemoryPredictionSource};
    use crate::types::{Match, MatchStatus, PlayerMatchTarget, Prediction};
    use chrono::Utc;
    use snapshot_store::{InMemorySnapshotStore, StoredRecord};

    struct Fixture {
        cache: LeaderboardCache,
        store: InMemorySnapshotStore,
        source: InMemoryPredictionSource,
    }

    async fn fixture(predictions: usize) -> Fixture {
        let registry = InMemoryMatchRegistry::new();
        registry
            .upsert(Match {
                id: "m1".to_string(),
                team_a: "Sri Lanka".to_string(),
                team_b: "New Zealand".to_string(),
                venue: "Galle".to_string(),
                scheduled_at: Utc::now(),
                description: None,
                status: MatchStatus::Completed,
            })
            .await;

        let source = InMemoryPredictionSource::new().with_latency(Duration::from_millis(20));
        for i in 0..predictions {
            source
                .submit(Prediction {
                    id: format!("pred-{i}"),
                    user_id: format!("user-{i}"),
                    user_label: format!("User {i}"),
                    match_id: "m1".to_string(),
                    player_ids: vec!["p1".to_string(), "p2".to_string()],
                    submitted_at: Utc::now(),
                })
                .await;
        }

        let index = InMemoryPerformanceIndex::new();
        index
            .set_target(PlayerMatchTarget {
                player_id: "p1".to_string(),
                match_id: "m1".to_string(),
                target: 10.0,
                actual: Some(12.0),
            })
            .await;

        let engine = RankingEngine::new(
            Arc::new(registry),
            Arc::new(source.clone()),
            Arc::new(index),
            10,
            Duration::from_secs(2),
        );

        let store = InMemorySnapshotStore::new();
        let cache = LeaderboardCache::new(Arc::new(engine), Arc::new(store.clone()));
        Fixture { cache, store, source }
    }

    #[tokio::test]
    async fn test_second_get_is_a_hit() {
        let fx = fixture(3).await;

        let first = fx.cache.get("m1").await.unwrap();
        let second = fx.cache.get("m1").await.unwrap();

        assert_eq!(first, second);
        let stats = fx.cache.stats();
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(fx.source.calls(), 1);
        assert_eq!(fx.cache.pending_locks(), 0);
    }

    #[tokio::test]
    async fn test_empty_leaderboard_is_not_persisted() {
        let fx = fixture(0).await;

        assert!(fx.cache.get("m1").await.unwrap().is_empty());
        assert!(fx.cache.get("m1").await.unwrap().is_empty());

        assert!(fx.store.is_empty().await);
        assert!(fx.cache.peek("m1").await.unwrap().is_none());
        assert_eq!(fx.cache.stats().computations, 2);
        assert_eq!(fx.cache.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_unknown_match_propagates_not_found() {
        let fx = fixture(1).await;
        let result = fx.cache.get("ghost").await;
        assert!(matches!(result, Err(LeaderboardError::MatchNotFound(_))));
        assert_eq!(fx.cache.pending_locks(), 0);
    }

    #[tokio::test]
    async fn test_store_outage_is_storage_unavailable() {
        let fx = fixture(1).await;
        fx.store.set_offline(true);

        let result = fx.cache.get("m1").await;
        assert!(matches!(result, Err(LeaderboardError::StorageUnavailable(_))));
    }

    #[tokio::test]
    async fn test_existing_snapshot_is_served_without_computing() {
        let fx = fixture(2).await;

        let mut foreign = LeaderboardSnapshot::empty("m1", 10, Utc::now());
        foreign.total_predictions = 99;
        SnapshotStore::<LeaderboardSnapshot>::write_if_absent(&fx.store, "m1", &foreign)
            .await
            .unwrap();

        let served = fx.cache.get("m1").await.unwrap();
        assert_eq!(served.total_predictions, 99);
        assert_eq!(fx.cache.stats().computations, 0);
        assert_eq!(fx.source.calls(), 0);
    }

    /// Lets another "process" write between our miss and our conditional write
    struct LateWriterStore {
        inner: InMemorySnapshotStore,
        foreign: LeaderboardSnapshot,
    }

    #[async_trait::async_trait]
    impl SnapshotStore<LeaderboardSnapshot> for LateWriterStore {
        async fn read_record(
            &self,
            key: &str,
        ) -> snapshot_store::Result<Option<StoredRecord<LeaderboardSnapshot>>> {
            self.inner.read_record(key).await
        }

        async fn write_if_absent(
            &self,
            key: &str,
            value: &LeaderboardSnapshot,
        ) -> snapshot_store::Result<WriteOutcome> {
            self.inner.write_if_absent(key, &self.foreign).await?;
            self.inner.write_if_absent(key, value).await
        }

        fn backend_name(&self) -> &'static str {
            "late-writer"
        }
    }

    #[tokio::test]
    async fn test_lost_write_race_adopts_stored_copy() {
        let fx = fixture(2).await;
        let mut foreign = LeaderboardSnapshot::empty("m1", 10, Utc::now());
        foreign.total_predictions = 42;

        let store = LateWriterStore { inner: InMemorySnapshotStore::new(), foreign };
        let cache = LeaderboardCache::new(fx.cache.engine().clone(), Arc::new(store));

        let served = cache.get("m1").await.unwrap();
        assert_eq!(served.total_predictions, 42);

        let stats = cache.stats();
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.lost_races, 1);
        assert_eq!(stats.writes, 0);
    }

    #[tokio::test]
    async fn test_cancelled_get_leaves_no_partial_state() {
        let fx = fixture(2).await;

        // Drop the request while the prediction fetch is still sleeping.
        let cancelled =
            tokio::time::timeout(Duration::from_millis(5), fx.cache.get("m1")).await;
        assert!(cancelled.is_err());

        let record: Option<StoredRecord<LeaderboardSnapshot>> =
            fx.store.read_record("m1").await.unwrap();
        assert!(record.is_none());
        assert_eq!(fx.cache.pending_locks(), 0);

        let snapshot = fx.cache.get("m1").await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }
}
