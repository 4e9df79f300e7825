//! InMemoryOrderService - 開発用の OrderService
//!
//! 注文 id は ULID。作成した注文はメモリに保持します。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use ulid::Ulid;

use crate::domain::{CartLine, UserId};
use crate::ports::{OrderError, OrderService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub uid: UserId,
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Default)]
pub struct InMemoryOrderService {
    orders: Mutex<HashMap<String, PlacedOrder>>,
}

impl InMemoryOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, order_id: &str) -> Option<PlacedOrder> {
        self.orders.lock().await.get(order_id).cloned()
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn create_order(&self, uid: UserId, lines: &[CartLine]) -> Result<String, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::Rejected("empty order".to_string()));
        }
        let order_id = format!("order-{}", Ulid::new());
        self.orders.lock().await.insert(
            order_id.clone(),
            PlacedOrder {
                uid,
                lines: lines.to_vec(),
            },
        );
        Ok(order_id)
    }
}
