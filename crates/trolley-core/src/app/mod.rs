//! App - アプリケーション層
//!
//! ports を組み合わせてカートのパイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **CartEventProducer**: AddItemEvent の送信（線形バックオフ付きリトライ）
//! - **ConsumerGroup**: broker から受け取ったイベントを merge するループ
//! - **CartMerger**: DocumentStore への CAS merge と projection の更新
//! - **CartReader**: cache-aside の読み取り経路
//! - **CartService**: 上記をまとめた入口
//! - **CartAppBuilder**: 構築とワイヤリング

pub mod builder;
pub mod consumer;
pub mod merge;
pub mod producer;
pub mod projection;
pub mod reader;
pub mod refresh;
pub mod retry;
pub mod service;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, CartApp, CartAppBuilder};
pub use self::consumer::{ConsumeOutcome, ConsumerGroup, handle_delivery};
pub use self::merge::{CartMerger, Merged};
pub use self::producer::CartEventProducer;
pub use self::projection::Projector;
pub use self::reader::{CartReader, ShowCart};
pub use self::refresh::{RefreshOutcome, RefreshTask};
pub use self::retry::RetryPolicy;
pub use self::service::CartService;
