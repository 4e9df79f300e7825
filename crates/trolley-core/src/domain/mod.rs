//! Domain model (IDs, cart document, events, goods).
//!
//! - ids: 型付き ID（UserId, ShopId, SkuId）
//! - cart: CartDocument と merge 操作（I/O なし）
//! - event: broker を流れる AddItemEvent と削除リクエスト
//! - goods: flatten された行と hydrate 後の商品

pub mod cart;
pub mod event;
pub mod goods;
pub mod ids;

pub use cart::{CartDocument, RecentStores, SkuEntry, StoreEntry};
pub use event::{AddItemEvent, DeleteSkuRequest, SkuRef, partition_key};
pub use goods::{CartGoods, CartLine, Page};
pub use ids::{ShopId, SkuId, UserId};
