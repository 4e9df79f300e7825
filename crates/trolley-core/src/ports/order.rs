//! OrderService port - 購入フローで注文を作成する下流サービス

use async_trait::async_trait;

use crate::domain::{CartLine, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("transport: {0}")]
    Transport(String),
}

#[async_trait]
pub trait OrderService: Send + Sync {
    /// Create an order for `lines`, returning its id.
    async fn create_order(&self, uid: UserId, lines: &[CartLine]) -> Result<String, OrderError>;
}
