//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（RDB, KV キャッシュ, broker, 下流 RPC）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - DocumentStore が source of truth（正本）
//! - ProjectionCache は直近 N 店舗分の写し（消えても良い）
//! - MessageBroker は AddItemEvent の配送のみ

pub mod broker;
pub mod clock;
pub mod document_store;
pub mod hydration;
pub mod order;
pub mod projection_cache;

// 主要な trait を再エクスポート
pub use self::broker::{
    BrokerError, BrokerMessage, Delivery, MessageBroker, SendFailure, SendReport, Subscription,
};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::document_store::{DocumentStore, StoreError, StoredDocument};
pub use self::hydration::{
    HydratedSku, HydrationClient, HydrationError, HydrationItem, HydrationRequest,
};
pub use self::order::{OrderError, OrderService};
pub use self::projection_cache::{CacheError, ProjectionCache, cache_key};
