//! MokaProjectionCache - `moka` による ProjectionCache
//!
//! TTL と最大エントリ数でエントリを捨てます。
//! version の比較と書き込みは `and_compute_with` でキー単位にアトミックに行います。

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};

use crate::ports::{CacheError, ProjectionCache};

#[derive(Debug, Clone)]
struct Versioned {
    version: u64,
    body: String,
}

#[derive(Clone)]
pub struct MokaProjectionCache {
    cache: Cache<String, Versioned>,
}

impl MokaProjectionCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Drop a user's projection (e.g. when the cart is deleted).
    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }
}

#[async_trait]
impl ProjectionCache for MokaProjectionCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).await.map(|entry| entry.body))
    }

    async fn set(&self, key: &str, value: String, version: u64) -> Result<bool, CacheError> {
        let result = self
            .cache
            .entry(key.to_string())
            .and_compute_with(|current| {
                let op = match current {
                    Some(entry) if entry.value().version > version => Op::Nop,
                    _ => Op::Put(Versioned {
                        version,
                        body: value,
                    }),
                };
                std::future::ready(op)
            })
            .await;
        Ok(!matches!(result, CompResult::Unchanged(_)))
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.cache.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> MokaProjectionCache {
        MokaProjectionCache::new(10, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn set_get_exists() {
        let cache = cache();

        assert!(!cache.exists("42").await.unwrap());
        assert_eq!(cache.get("42").await.unwrap(), None);

        assert!(cache.set("42", "{}".to_string(), 1).await.unwrap());

        assert!(cache.exists("42").await.unwrap());
        assert_eq!(cache.get("42").await.unwrap().as_deref(), Some("{}"));
    }

    #[rstest::rstest]
    #[case::newer(1, 2, true, "b")]
    #[case::same(2, 2, true, "b")]
    #[case::older(3, 2, false, "a")]
    #[tokio::test]
    async fn set_keeps_the_newest_version(
        #[case] first: u64,
        #[case] second: u64,
        #[case] stored: bool,
        #[case] expected: &str,
    ) {
        let cache = cache();
        cache.set("1", "a".to_string(), first).await.unwrap();

        assert_eq!(cache.set("1", "b".to_string(), second).await.unwrap(), stored);
        assert_eq!(cache.get("1").await.unwrap().as_deref(), Some(expected));
    }

    #[tokio::test]
    async fn invalidate_removes_entry() {
        let cache = cache();
        cache.set("1", "a".to_string(), 1).await.unwrap();
        cache.invalidate("1").await;
        assert_eq!(cache.get("1").await.unwrap(), None);
    }
}
