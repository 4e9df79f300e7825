//! trolley - drive the cart pipeline end to end with in-process adapters.
//!
//! # Usage
//!
//! ```bash
//! # add a few items for user 42, let the consumers merge them, print page 1
//! trolley --uid 42 --add 1:7:2 --add 1:7:3 --add 2:9:1
//!
//! # same, then check out shop 1 / sku 7
//! trolley --uid 42 --add 1:7:2 --add 2:9:1 --checkout 1:7:2
//! ```
//!
//! Items are `shop:sku:count`. Settings also come from `TROLLEY_*` env vars
//! or a `.env` file.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use trolley_core::app::{CartAppBuilder, RefreshOutcome};
use trolley_core::domain::{CartLine, ShopId, SkuId, UserId};
use trolley_core::impls::{
    InMemoryBroker, InMemoryDocumentStore, InMemoryOrderService, MokaProjectionCache,
    StaticCatalog,
};
use trolley_core::ports::HydratedSku;
use trolley_core::CartConfig;

#[derive(Parser)]
#[command(name = "trolley")]
#[command(author, version, about = "Cart pipeline driver")]
struct Cli {
    /// Cart owner
    #[arg(long, env = "TROLLEY_UID", default_value_t = 42)]
    uid: i64,

    /// Item to add, as `shop:sku:count` (repeatable)
    #[arg(long = "add", value_name = "SHOP:SKU:COUNT")]
    adds: Vec<Item>,

    /// Line to check out after the adds, as `shop:sku:count` (repeatable)
    #[arg(long = "checkout", value_name = "SHOP:SKU:COUNT")]
    checkout: Vec<Item>,

    /// Page to show
    #[arg(long, default_value_t = 1)]
    page: i64,

    /// Consumer group members
    #[arg(long, env = "TROLLEY_CONSUMERS", default_value_t = 2)]
    consumers: usize,

    #[arg(long, env = "TROLLEY_PARTITIONS", default_value_t = 16)]
    partitions: u32,

    /// Stores kept in the cached projection
    #[arg(long, env = "TROLLEY_RECENT_STORES", default_value_t = 10)]
    recent_stores: usize,

    #[arg(long, env = "TROLLEY_PAGE_SIZE", default_value_t = 20)]
    page_size: u32,

    /// Producer backoff unit in milliseconds
    #[arg(long, env = "TROLLEY_BACKOFF_MS", default_value_t = 1_000)]
    backoff_ms: u64,

    /// How long to wait for the consumers to drain, in milliseconds
    #[arg(long, env = "TROLLEY_DRAIN_TIMEOUT_MS", default_value_t = 5_000)]
    drain_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy)]
struct Item {
    shop: i64,
    sku: i64,
    count: i64,
}

impl FromStr for Item {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [shop, sku, count] = parts.as_slice() else {
            bail!("expected shop:sku:count, got {s:?}");
        };
        Ok(Self {
            shop: shop.parse().context("shop id")?,
            sku: sku.parse().context("sku id")?,
            count: count.parse().context("count")?,
        })
    }
}

impl Item {
    fn line(&self) -> CartLine {
        CartLine {
            shop_id: ShopId::new(self.shop),
            sku_id: SkuId::new(self.sku),
            count: self.count,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "trolley=info".into()))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CartConfig {
        partitions: cli.partitions,
        recent_stores: cli.recent_stores,
        page_size: cli.page_size,
        backoff_unit_ms: cli.backoff_ms,
        ..CartConfig::default()
    };

    let broker = Arc::new(InMemoryBroker::new(config.partitions, config.max_message_bytes));
    let app = CartAppBuilder::new(config.clone())
        .broker(broker.clone())
        .store(Arc::new(InMemoryDocumentStore::new()))
        .cache(Arc::new(MokaProjectionCache::new(
            config.cache_capacity,
            config.cache_ttl(),
        )))
        .hydration(Arc::new(catalog(&cli.adds)))
        .orders(Arc::new(InMemoryOrderService::new()))
        .build()?;

    let consumers = app.start_consumers(cli.consumers).await?;
    let assignment = broker
        .assignment(&config.topic, &config.consumer_group)
        .await;
    info!(?assignment, "partitions assigned");

    let uid = UserId::new(cli.uid);
    for item in &cli.adds {
        app.service
            .add_item(uid, ShopId::new(item.shop), SkuId::new(item.sku), item.count)
            .await
            .with_context(|| format!("add {}:{}:{}", item.shop, item.sku, item.count))?;
    }

    wait_for_consumers(&app.stats, cli.adds.len() as u64, cli.drain_timeout_ms).await?;

    if !cli.checkout.is_empty() {
        let lines = cli.checkout.iter().map(Item::line).collect();
        let order_id = app.service.checkout(uid, lines).await?;
        println!("order: {order_id}");
    }

    let shown = app.service.show_cart_goods(uid, cli.page).await?;
    println!("{}", serde_json::to_string_pretty(&shown.goods)?);
    let total: Decimal = shown.goods.iter().map(|goods| goods.line_total()).sum();
    println!("total: {total}");

    if let Some(refresh) = shown.refresh
        && let RefreshOutcome::Failed(err) = refresh.outcome().await
    {
        tracing::warn!(error = %err, "cache warm-up failed");
    }

    info!(stats = ?app.stats.snapshot(), "shutting down");
    consumers.shutdown_and_join().await;
    Ok(())
}

async fn wait_for_consumers(
    stats: &trolley_core::observability::ConsumerStats,
    expected: u64,
    timeout_ms: u64,
) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while stats.snapshot().handled() < expected {
        if tokio::time::Instant::now() >= deadline {
            bail!(
                "consumers handled {} of {expected} events before timing out",
                stats.snapshot().handled()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

/// Catalog entries for every sku mentioned on the command line.
fn catalog(items: &[Item]) -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    for item in items {
        catalog.insert(
            SkuId::new(item.sku),
            HydratedSku {
                creator_id: item.shop,
                name: format!("sku {}", item.sku),
                style_image: format!("https://img.example/sku/{}.png", item.sku),
                unit_price: Decimal::new(item.sku * 100 + 99, 2),
                discount: None,
            },
        );
    }
    catalog
}
