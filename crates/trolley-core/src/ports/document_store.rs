//! DocumentStore port - カートドキュメントの正本（source of truth）
//!
//! 1 ユーザー 1 行、`sku_json` にドキュメント全体をテキストで保持します。
//! 行は `version` を持ち、上書きは compare-and-swap です。
//!
//! # 実装
//! - **InMemoryDocumentStore**: 開発・テスト用
//! - **PgDocumentStore**: `postgres` feature

use async_trait::async_trait;

use crate::domain::UserId;

/// StoreError は DocumentStore の操作エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Row already exists (create) or its version moved on (overwrite).
    #[error("version conflict on {0}")]
    Conflict(UserId),

    #[error("no document for {0}")]
    NotFound(UserId),

    #[error("backend failure: {0}")]
    Backend(String),
}

/// One persisted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub user_id: UserId,
    pub sku_json: String,
    pub version: u64,
}

/// DocumentStore は per-user の cart 行を読み書きする
///
/// # 設計原則
/// - 「行が無い」はエラーではなく `false` / `None`
/// - create は既存行があれば `Conflict`
/// - overwrite は `expected_version` が一致しなければ `Conflict`
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn exists(&self, uid: UserId) -> Result<bool, StoreError>;

    async fn load(&self, uid: UserId) -> Result<Option<StoredDocument>, StoreError>;

    /// Insert the first row for `uid`. Returns the new version.
    async fn create(&self, uid: UserId, sku_json: &str) -> Result<u64, StoreError>;

    /// Replace the row if it is still at `expected_version`. Returns the new version.
    async fn overwrite(
        &self,
        uid: UserId,
        sku_json: &str,
        expected_version: u64,
    ) -> Result<u64, StoreError>;
}
