//! FailingCache - バックエンド障害を返す ProjectionCache（テスト用）

use async_trait::async_trait;

use crate::ports::{CacheError, ProjectionCache};

/// Cache whose writes always fail. Reads fail too unless built with
/// `writes_only`, in which case they behave like an empty cache.
pub(crate) struct FailingCache {
    fail_reads: bool,
}

impl FailingCache {
    pub(crate) fn everything() -> Self {
        Self { fail_reads: true }
    }

    pub(crate) fn writes_only() -> Self {
        Self { fail_reads: false }
    }

    fn down() -> CacheError {
        CacheError::Backend("connection refused".to_string())
    }
}

#[async_trait]
impl ProjectionCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        if self.fail_reads {
            return Err(Self::down());
        }
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _version: u64) -> Result<bool, CacheError> {
        Err(Self::down())
    }

    async fn exists(&self, _key: &str) -> Result<bool, CacheError> {
        if self.fail_reads {
            return Err(Self::down());
        }
        Ok(false)
    }
}
