//! Writes the bounded recency projection of a cart into the cache.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{CartDocument, UserId};
use crate::error::Result;
use crate::ports::{ProjectionCache, cache_key};

#[derive(Clone)]
pub struct Projector {
    cache: Arc<dyn ProjectionCache>,
    recent_stores: usize,
}

impl Projector {
    pub fn new(cache: Arc<dyn ProjectionCache>, recent_stores: usize) -> Self {
        Self {
            cache,
            recent_stores,
        }
    }

    pub fn recent_stores(&self) -> usize {
        self.recent_stores
    }

    /// Overwrite the cached projection with the first N stores of `doc`,
    /// unless the cache already holds one built from a newer `version`.
    pub async fn write(&self, doc: &CartDocument, version: u64) -> Result<bool> {
        let raw = doc.recent_stores(self.recent_stores).to_json()?;
        let stored = self.cache.set(&cache_key(doc.uid), raw, version).await?;
        if !stored {
            debug!(uid = %doc.uid, version, "newer projection already cached, skipping");
        }
        Ok(stored)
    }

    /// Cached projection of `uid`, if any.
    pub async fn read(&self, uid: UserId) -> Result<Option<CartDocument>> {
        match self.cache.get(&cache_key(uid)).await? {
            Some(raw) => Ok(Some(CartDocument::from_json(&raw)?)),
            None => Ok(None),
        }
    }
}
