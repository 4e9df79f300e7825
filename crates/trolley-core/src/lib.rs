//! trolley-core
//!
//! Eventually-consistent per-user shopping carts.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, cart document と merge 操作, events, goods）
//! - **ports**: 抽象化レイヤー（DocumentStore, ProjectionCache, MessageBroker, HydrationClient, OrderService, Clock）
//! - **impls**: 実装（in-memory / moka / PostgreSQL）
//! - **app**: アプリケーションロジック（producer, consumer, merger, reader, service, builder）
//! - **config / error / observability**: 設定・エラー型・consumer の統計

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;

pub use crate::config::CartConfig;
pub use crate::error::{CartError, Result};
