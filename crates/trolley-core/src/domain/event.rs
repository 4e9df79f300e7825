//! Wire messages and requests that mutate a cart.

use serde::{Deserialize, Serialize};

use super::ids::{ShopId, SkuId, UserId};
use crate::error::CartError;

/// "Add item" event as it travels through the broker.
///
/// Wire form: `{"uid": 42, "sku_id": 7, "shop_id": 1, "count": 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItemEvent {
    pub uid: UserId,
    pub sku_id: SkuId,
    pub shop_id: ShopId,
    pub count: i64,
}

impl AddItemEvent {
    /// Build a validated event. `count` must be positive.
    pub fn new(uid: UserId, shop_id: ShopId, sku_id: SkuId, count: i64) -> Result<Self, CartError> {
        let event = Self {
            uid,
            sku_id,
            shop_id,
            count,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<(), CartError> {
        if self.count <= 0 {
            return Err(CartError::Validation(format!(
                "count must be positive, got {}",
                self.count
            )));
        }
        Ok(())
    }

    /// Partition key for this event's owner.
    pub fn partition_key(&self, partitions: u32) -> String {
        partition_key(self.uid, partitions)
    }
}

/// Decimal string of `uid mod partitions`.
///
/// Negative ids map into `0..partitions` as well (euclidean remainder).
pub fn partition_key(uid: UserId, partitions: u32) -> String {
    let partitions = i64::from(partitions.max(1));
    uid.get().rem_euclid(partitions).to_string()
}

/// One `(store, sku)` pair to remove from a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SkuRef {
    pub shop_id: ShopId,
    pub sku_id: SkuId,
}

/// Removal of one or more skus from a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSkuRequest {
    pub uid: UserId,
    pub items: Vec<SkuRef>,
}

impl DeleteSkuRequest {
    pub fn new(uid: UserId, items: Vec<SkuRef>) -> Self {
        Self { uid, items }
    }

    pub(crate) fn matches(&self, shop_id: ShopId, sku_id: SkuId) -> bool {
        self.items
            .iter()
            .any(|item| item.shop_id == shop_id && item.sku_id == sku_id)
    }
}
