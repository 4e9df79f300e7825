//! Domain identifiers (strongly-typed IDs).
//!
//! ユーザー・店舗・SKU の ID はすべて wire 上では int64 ですが、
//! Phantom type パターンで型を分け、`UserId` と `ShopId` を混同できないようにしています。
//!
//! ## Phantom Type パターン
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時の型安全性を提供します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"user-", "shop-", "sku-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// JSON 上は素の整数としてシリアライズされます（`#[serde(transparent)]`）。
///
/// # 例
/// ```ignore
/// let uid = UserId::new(42);
/// let shop = ShopId::new(42);
/// // uid と shop は異なる型なので、混同できない
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: i64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub const fn new(value: i64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// 内部の整数値を取得
    pub const fn get(self) -> i64 {
        self.value
    }
}

impl<T: IdMarker> From<i64> for Id<T> {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn prefix() -> &'static str {
        "user-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shop {}

impl IdMarker for Shop {
    fn prefix() -> &'static str {
        "shop-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sku {}

impl IdMarker for Sku {
    fn prefix() -> &'static str {
        "sku-"
    }
}

/// Owner of a cart document.
pub type UserId = Id<User>;

/// Store (shop) grouping inside a cart.
pub type ShopId = Id<Shop>;

/// Purchasable item.
pub type SkuId = Id<Sku>;
