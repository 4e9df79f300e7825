//! StaticCatalog - プロセス内の HydrationClient
//!
//! sku ごとの表示・価格情報を HashMap で保持します。CLI とテスト用。

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::SkuId;
use crate::ports::{HydratedSku, HydrationClient, HydrationError, HydrationRequest};

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: HashMap<SkuId, HydratedSku>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, sku_id: SkuId, entry: HydratedSku) -> Self {
        self.entries.insert(sku_id, entry);
        self
    }

    pub fn insert(&mut self, sku_id: SkuId, entry: HydratedSku) {
        self.entries.insert(sku_id, entry);
    }
}

#[async_trait]
impl HydrationClient for StaticCatalog {
    async fn hydrate(&self, request: HydrationRequest) -> Result<Vec<HydratedSku>, HydrationError> {
        request
            .items
            .iter()
            .map(|item| {
                self.entries
                    .get(&item.sku_id)
                    .cloned()
                    .ok_or_else(|| HydrationError::Rejected(format!("unknown {}", item.sku_id)))
            })
            .collect()
    }
}
