//! Read-through cache over on-chain queries.
//!
//! Each key owns a `OnceCell` holding the outcome of its read. The first
//! caller for an uncached key runs the external read; concurrent callers for
//! the same key wait on that cell and share its outcome, failures included.
//! A failed outcome is dropped from the map as soon as it is observed, so the
//! next caller reads again and errors are never cached.
//!
//! Entries live until `clear` is called. Queries that need point-in-time
//! freshness put the block number in the key (see `BalanceKey`).

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::OnceCell;

use chainwatch_common::error::Result;

/// A fallible, read-only external query.
#[async_trait]
pub trait ChainReader<K, V>: Send + Sync {
    async fn read(&self, key: &K) -> Result<V>;
}

/// A cached value and the cache generation it was fetched in.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub generation: u64,
}

/// Key for an ERC-20 `balanceOf` query, optionally pinned to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BalanceKey {
    pub account: Address,
    pub block: Option<u64>,
}

impl BalanceKey {
    pub fn latest(account: Address) -> Self {
        Self {
            account,
            block: None,
        }
    }

    pub fn at_block(account: Address, block: u64) -> Self {
        Self {
            account,
            block: Some(block),
        }
    }
}

/// Token balance lookups, the only cached query monitors currently use.
pub type BalanceFetcher = CachedFetcher<BalanceKey, U256>;

/// In-process cache with in-flight deduplication.
pub struct CachedFetcher<K, V> {
    reader: Arc<dyn ChainReader<K, V>>,
    entries: DashMap<K, Arc<OnceCell<Result<CacheEntry<V>>>>>,
    generation: AtomicU64,
    external_reads: AtomicU64,
}

impl<K, V> CachedFetcher<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(reader: Arc<dyn ChainReader<K, V>>) -> Self {
        Self {
            reader,
            entries: DashMap::new(),
            generation: AtomicU64::new(0),
            external_reads: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `key`, reading it once on a miss.
    pub async fn get(&self, key: &K) -> Result<V> {
        // Clone the cell out so the shard lock is released before awaiting.
        let cell = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(Ok(entry)) = cell.get() {
            tracing::trace!(key = ?key, "Cache hit");
            return Ok(entry.value.clone());
        }

        let outcome = cell
            .get_or_init(|| async {
                self.external_reads.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = ?key, "Cache miss, reading from chain");
                self.reader
                    .read(key)
                    .await
                    .map(|value| CacheEntry {
                        value,
                        generation: self.generation.load(Ordering::Relaxed),
                    })
                    .inspect_err(|e| {
                        tracing::warn!(key = ?key, error = %e, "External read failed");
                    })
            })
            .await;

        match outcome {
            Ok(entry) => Ok(entry.value.clone()),
            Err(error) => {
                // Only evict the failed cell; a retry may already have replaced it.
                self.entries
                    .remove_if(key, |_, current| Arc::ptr_eq(current, &cell));
                Err(error.clone())
            }
        }
    }

    /// The cached entry for `key`, without reading.
    pub fn peek(&self, key: &K) -> Option<CacheEntry<V>> {
        self.entries
            .get(key)
            .and_then(|cell| cell.get().and_then(|outcome| outcome.as_ref().ok().cloned()))
    }

    /// Drop every entry and start a new generation.
    pub fn clear(&self) {
        self.entries.clear();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(generation, "Cache cleared");
    }

    /// Number of external reads attempted so far, failed ones included.
    pub fn external_reads(&self) -> u64 {
        self.external_reads.load(Ordering::Relaxed)
    }

    /// Number of keys holding a value.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.value().get(), Some(Ok(_))))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use chainwatch_common::error::MonitorError;

    struct Echo;

    #[async_trait]
    impl ChainReader<u64, u64> for Echo {
        async fn read(&self, key: &u64) -> Result<u64> {
            if *key == 0 {
                return Err(MonitorError::ExternalRead("zero".to_string()));
            }
            Ok(key * 2)
        }
    }

    /// Sleeps, then fails every read.
    #[derive(Default)]
    struct SlowOutage {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainReader<u64, u64> for SlowOutage {
        async fn read(&self, _key: &u64) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(MonitorError::ExternalRead("timeout".to_string()))
        }
    }

    #[tokio::test]
    async fn test_hit_after_miss() {
        let fetcher: CachedFetcher<u64, u64> = CachedFetcher::new(Arc::new(Echo));
        assert_eq!(fetcher.get(&21).await.unwrap(), 42);
        assert_eq!(fetcher.get(&21).await.unwrap(), 42);
        assert_eq!(fetcher.external_reads(), 1);
        assert_eq!(fetcher.peek(&21).unwrap().generation, 0);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let fetcher: CachedFetcher<u64, u64> = CachedFetcher::new(Arc::new(Echo));
        assert!(fetcher.get(&0).await.is_err());
        assert!(fetcher.get(&0).await.is_err());
        assert_eq!(fetcher.external_reads(), 2);
        assert!(fetcher.peek(&0).is_none());
        assert!(fetcher.is_empty());
        assert_eq!(fetcher.entries.len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_share_a_failed_read() {
        let reader = Arc::new(SlowOutage::default());
        let fetcher: CachedFetcher<u64, u64> = CachedFetcher::new(reader.clone());

        let (a, b, c, d) = tokio::join!(
            fetcher.get(&7),
            fetcher.get(&7),
            fetcher.get(&7),
            fetcher.get(&7)
        );

        for result in [a, b, c, d] {
            assert!(matches!(result, Err(MonitorError::ExternalRead(_))));
        }
        assert_eq!(reader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.entries.len(), 0);

        // A later call is not served the old failure.
        assert!(fetcher.get(&7).await.is_err());
        assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_starts_new_generation() {
        let fetcher: CachedFetcher<u64, u64> = CachedFetcher::new(Arc::new(Echo));
        fetcher.get(&1).await.unwrap();
        fetcher.clear();
        assert!(fetcher.is_empty());

        fetcher.get(&1).await.unwrap();
        assert_eq!(fetcher.external_reads(), 2);
        assert_eq!(fetcher.peek(&1).unwrap().generation, 1);
    }

    #[test]
    fn test_balance_keys_differ_by_block() {
        let account = Address::repeat_byte(0x01);
        assert_ne!(BalanceKey::latest(account), BalanceKey::at_block(account, 10));
        assert_ne!(BalanceKey::at_block(account, 10), BalanceKey::at_block(account, 11));
    }
}
