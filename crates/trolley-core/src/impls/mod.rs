//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryDocumentStore**: 開発・テスト用の正本
//! - **PgDocumentStore**: PostgreSQL（`postgres` feature）
//! - **MokaProjectionCache**: moka による projection キャッシュ
//! - **InMemoryOrderService**: 開発用の注文サービス
//! - **InMemoryBroker**: 開発用のパーティション付き broker
//! - **StaticCatalog**: プロセス内の HydrationClient

#[cfg(test)]
pub(crate) mod failing_cache;
pub mod inmem_broker;
pub mod inmem_document;
pub mod inmem_orders;
pub mod moka_cache;
#[cfg(feature = "postgres")]
pub mod pg_document;
pub mod static_catalog;

// 主要な型を再エクスポート
#[cfg(test)]
pub(crate) use self::failing_cache::FailingCache;
pub use self::inmem_broker::InMemoryBroker;
pub use self::inmem_document::InMemoryDocumentStore;
pub use self::inmem_orders::{InMemoryOrderService, PlacedOrder};
pub use self::moka_cache::MokaProjectionCache;
#[cfg(feature = "postgres")]
pub use self::pg_document::PgDocumentStore;
pub use self::static_catalog::StaticCatalog;
