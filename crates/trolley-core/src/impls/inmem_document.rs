//! InMemoryDocumentStore - 開発・テスト用の DocumentStore
//!
//! # 実装詳細
//! - HashMap<UserId, Row> を tokio の RwLock で保護
//! - version は行ごとに 1 から単調増加

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::UserId;
use crate::ports::{DocumentStore, StoreError, StoredDocument};

#[derive(Debug, Clone)]
struct Row {
    sku_json: String,
    version: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    rows: RwLock<HashMap<UserId, Row>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn exists(&self, uid: UserId) -> Result<bool, StoreError> {
        Ok(self.rows.read().await.contains_key(&uid))
    }

    async fn load(&self, uid: UserId) -> Result<Option<StoredDocument>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&uid).map(|row| StoredDocument {
            user_id: uid,
            sku_json: row.sku_json.clone(),
            version: row.version,
        }))
    }

    async fn create(&self, uid: UserId, sku_json: &str) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&uid) {
            return Err(StoreError::Conflict(uid));
        }
        rows.insert(
            uid,
            Row {
                sku_json: sku_json.to_string(),
                version: 1,
            },
        );
        Ok(1)
    }

    async fn overwrite(
        &self,
        uid: UserId,
        sku_json: &str,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(&uid) else {
            return Err(StoreError::NotFound(uid));
        };
        if row.version != expected_version {
            return Err(StoreError::Conflict(uid));
        }
        row.sku_json = sku_json.to_string();
        row.version += 1;
        Ok(row.version)
    }
}
