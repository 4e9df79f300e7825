//! ProjectionCache port - 直近 N 店舗分のドキュメントを保持する KV キャッシュ
//!
//! キーは uid の十進文字列、値はシリアライズ済みの projection。
//! エントリの寿命はキャッシュ側が決めます。
//!
//! 値には元になった行の version が付きます。`set` は保持中の version より
//! 古い projection を捨てるので、遅れて届いた書き込みが新しい内容を上書きしません。

use async_trait::async_trait;

use crate::domain::UserId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ProjectionCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` built from document `version`.
    ///
    /// Returns `false` when the entry already holds a newer version and the
    /// write was dropped. An equal version overwrites.
    async fn set(&self, key: &str, value: String, version: u64) -> Result<bool, CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}

/// Cache key for a user's projection.
pub fn cache_key(uid: UserId) -> String {
    uid.get().to_string()
}
