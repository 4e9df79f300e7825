//! Flattened cart lines and their hydrated form.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{ShopId, SkuId};
use crate::error::CartError;

/// One `(store, sku, count)` tuple taken from a cart document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub shop_id: ShopId,
    pub sku_id: SkuId,
    pub count: i64,
}

/// A cart line enriched with authoritative catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartGoods {
    pub shop_id: ShopId,
    pub sku_id: SkuId,
    pub count: i64,
    pub creator_id: i64,
    pub name: String,
    pub style_image: String,
    pub unit_price: Decimal,
    pub discount: Option<Decimal>,
}

impl CartGoods {
    /// `(unit_price - discount) * count`, never below zero.
    pub fn line_total(&self) -> Decimal {
        let unit = self.unit_price - self.discount.unwrap_or(Decimal::ZERO);
        (unit * Decimal::from(self.count)).max(Decimal::ZERO)
    }
}

/// A validated `(page, page_size)` pair, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Page {
    pub fn new(number: i64, size: i64) -> Result<Self, CartError> {
        let number = u32::try_from(number)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| CartError::Validation(format!("page must be positive, got {number}")))?;
        let size = u32::try_from(size)
            .ok()
            .filter(|s| *s > 0)
            .ok_or_else(|| {
                CartError::Validation(format!("page size must be positive, got {size}"))
            })?;
        Ok(Self { number, size })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// The slice of `lines` this page covers (possibly empty).
    pub fn window<'a, T>(&self, lines: &'a [T]) -> &'a [T] {
        let size = self.size as usize;
        let start = (self.number as usize - 1).saturating_mul(size);
        if start >= lines.len() {
            return &[];
        }
        let end = start.saturating_add(size).min(lines.len());
        &lines[start..end]
    }
}
