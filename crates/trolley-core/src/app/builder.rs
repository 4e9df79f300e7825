//! CartAppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 必須コンポーネント（broker, store, cache, hydration, orders）が揃っているか
//! - `CartConfig::validate()` が通るか
//!
//! を build() 時にまとめて検証し、不足は一度に報告します。

use std::sync::Arc;

use super::consumer::ConsumerGroup;
use super::merge::CartMerger;
use super::producer::CartEventProducer;
use super::projection::Projector;
use super::reader::CartReader;
use super::retry::RetryPolicy;
use super::service::CartService;
use crate::config::CartConfig;
use crate::error::Result;
use crate::observability::ConsumerStats;
use crate::ports::{
    Clock, DocumentStore, HydrationClient, MessageBroker, OrderService, ProjectionCache,
    SystemClock,
};

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing components: {0:?}")]
    MissingComponents(Vec<&'static str>),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// # 使用例
/// ```ignore
/// let app = CartAppBuilder::new(CartConfig::default())
///     .broker(broker)
///     .store(store)
///     .cache(cache)
///     .hydration(catalog)
///     .orders(orders)
///     .build()?;
/// let consumers = app.start_consumers(2).await?;
/// ```
#[derive(Default)]
pub struct CartAppBuilder {
    config: CartConfig,
    broker: Option<Arc<dyn MessageBroker>>,
    store: Option<Arc<dyn DocumentStore>>,
    cache: Option<Arc<dyn ProjectionCache>>,
    hydration: Option<Arc<dyn HydrationClient>>,
    orders: Option<Arc<dyn OrderService>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CartAppBuilder {
    pub fn new(config: CartConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn broker(mut self, broker: Arc<dyn MessageBroker>) -> Self {
        self.broker = Some(broker);
        self
    }

    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn ProjectionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn hydration(mut self, hydration: Arc<dyn HydrationClient>) -> Self {
        self.hydration = Some(hydration);
        self
    }

    pub fn orders(mut self, orders: Arc<dyn OrderService>) -> Self {
        self.orders = Some(orders);
        self
    }

    /// Defaults to `SystemClock`.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> std::result::Result<CartApp, BuildError> {
        let mut missing = Vec::new();
        if self.broker.is_none() {
            missing.push("broker");
        }
        if self.store.is_none() {
            missing.push("store");
        }
        if self.cache.is_none() {
            missing.push("cache");
        }
        if self.hydration.is_none() {
            missing.push("hydration");
        }
        if self.orders.is_none() {
            missing.push("orders");
        }
        let (Some(broker), Some(store), Some(cache), Some(hydration), Some(orders)) = (
            self.broker,
            self.store,
            self.cache,
            self.hydration,
            self.orders,
        ) else {
            return Err(BuildError::MissingComponents(missing));
        };

        let config = self.config;
        config
            .validate()
            .map_err(|err| BuildError::InvalidConfig(err.to_string()))?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let projector = Projector::new(cache, config.recent_stores);
        let merger = Arc::new(CartMerger::new(
            Arc::clone(&store),
            projector.clone(),
            clock,
            config.merge_max_conflicts,
        ));
        let producer = CartEventProducer::new(
            Arc::clone(&broker),
            config.topic.clone(),
            config.partitions,
            RetryPolicy::linear(config.producer_max_attempts, config.backoff_unit()),
        );
        let reader = CartReader::new(
            store,
            projector,
            hydration,
            config.page_size,
            config.cacheable_pages,
        );

        Ok(CartApp {
            service: CartService::new(producer, Arc::clone(&merger), reader, orders),
            merger,
            broker,
            stats: Arc::new(ConsumerStats::new()),
            config,
        })
    }
}

/// Wired cart pipeline.
pub struct CartApp {
    pub service: CartService,
    pub merger: Arc<CartMerger>,
    pub stats: Arc<ConsumerStats>,
    pub config: CartConfig,
    broker: Arc<dyn MessageBroker>,
}

impl CartApp {
    /// Join `members` consumers to the configured group.
    pub async fn start_consumers(&self, members: usize) -> Result<ConsumerGroup> {
        ConsumerGroup::spawn(
            members,
            Arc::clone(&self.broker),
            &self.config.topic,
            &self.config.consumer_group,
            Arc::clone(&self.merger),
            Arc::clone(&self.stats),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryBroker, InMemoryDocumentStore, MokaProjectionCache, StaticCatalog};
    use crate::domain::{CartLine, UserId};
    use crate::ports::OrderError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct NoOrders;

    #[async_trait]
    impl OrderService for NoOrders {
        async fn create_order(
            &self,
            _uid: UserId,
            _lines: &[CartLine],
        ) -> std::result::Result<String, OrderError> {
            Err(OrderError::Transport("offline".into()))
        }
    }

    fn complete(config: CartConfig) -> CartAppBuilder {
        CartAppBuilder::new(config)
            .broker(Arc::new(InMemoryBroker::new(4, 1024)))
            .store(Arc::new(InMemoryDocumentStore::new()))
            .cache(Arc::new(MokaProjectionCache::new(10, Duration::from_secs(60))))
            .hydration(Arc::new(StaticCatalog::new()))
            .orders(Arc::new(NoOrders))
    }

    #[test]
    fn build_success() {
        assert!(complete(CartConfig::default()).build().is_ok());
    }

    #[test]
    fn build_reports_every_missing_component() {
        let result = CartAppBuilder::new(CartConfig::default())
            .store(Arc::new(InMemoryDocumentStore::new()))
            .orders(Arc::new(NoOrders))
            .build();
        assert!(matches!(
            result,
            Err(BuildError::MissingComponents(missing)) if missing == vec!["broker", "cache", "hydration"]
        ));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let config = CartConfig {
            partitions: 0,
            ..CartConfig::default()
        };
        assert!(matches!(
            complete(config).build(),
            Err(BuildError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn consumers_join_configured_group() {
        let app = complete(CartConfig::default()).build().unwrap();
        let group = app.start_consumers(3).await.unwrap();
        assert_eq!(group.member_ids().len(), 3);
        assert!(group.member_ids().iter().all(|id| id.starts_with("cart-merger-")));
        group.shutdown_and_join().await;
    }
}
