//! Pipeline configuration.
//!
//! Durations are carried as integer millis / secs so the struct reads from
//! plain env vars or JSON.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CartError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// Broker partition count (P). Partition key = `uid mod P`.
    pub partitions: u32,
    /// Stores kept in the cached projection (N).
    pub recent_stores: usize,
    pub page_size: u32,
    /// Pages `1..=cacheable_pages` may be served from the projection.
    pub cacheable_pages: u32,
    /// Producer send attempts (K).
    pub producer_max_attempts: u32,
    /// Linear backoff unit: the wait after attempt `i` is `i * unit`.
    pub backoff_unit_ms: u64,
    /// Version conflicts tolerated by one merge before it gives up.
    pub merge_max_conflicts: u32,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    pub topic: String,
    pub consumer_group: String,
    pub max_message_bytes: usize,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            partitions: 16,
            recent_stores: 10,
            page_size: 20,
            cacheable_pages: 2,
            producer_max_attempts: 3,
            backoff_unit_ms: 1_000,
            merge_max_conflicts: 5,
            cache_ttl_secs: 30 * 60,
            cache_capacity: 100_000,
            topic: "cart.add_item".to_string(),
            consumer_group: "cart-merger".to_string(),
            max_message_bytes: 64 * 1024,
        }
    }
}

impl CartConfig {
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), CartError> {
        let checks = [
            (self.partitions == 0, "partitions must be at least 1"),
            (self.recent_stores == 0, "recent_stores must be at least 1"),
            (self.page_size == 0, "page_size must be at least 1"),
            (self.cacheable_pages == 0, "cacheable_pages must be at least 1"),
            (
                self.producer_max_attempts == 0,
                "producer_max_attempts must be at least 1",
            ),
            (self.topic.is_empty(), "topic must not be empty"),
            (self.consumer_group.is_empty(), "consumer_group must not be empty"),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(CartError::Validation((*message).to_string())),
            None => Ok(()),
        }
    }
}
