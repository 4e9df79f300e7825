//! HydrationClient port - 価格・表示情報を返す下流サービス
//!
//! レスポンスの i 番目はリクエストの i 番目に対応します（位置で対応付け）。

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::SkuId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HydrationError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("expected {expected} items, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationItem {
    pub sku_id: SkuId,
    pub version_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydrationRequest {
    pub items: Vec<HydrationItem>,
    pub page: u32,
    pub page_size: u32,
}

/// Authoritative display and pricing data for one sku.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydratedSku {
    pub creator_id: i64,
    pub name: String,
    pub style_image: String,
    pub unit_price: Decimal,
    pub discount: Option<Decimal>,
}

#[async_trait]
pub trait HydrationClient: Send + Sync {
    async fn hydrate(&self, request: HydrationRequest) -> Result<Vec<HydratedSku>, HydrationError>;
}
