//! CartService - 呼び出し側から見た唯一の入口
//!
//! - add_item: 検証してイベントを publish（merge は consumer 側で非同期）
//! - show_cart_goods: cache-aside の読み取り
//! - remove_skus: DeleteSku を CAS merge で直接適用
//! - checkout: 注文作成 → 成功したら購入数をカートから差し引く（0 になった sku は削除）

use std::sync::Arc;

use tracing::{info, warn};

use super::merge::CartMerger;
use super::producer::CartEventProducer;
use super::reader::{CartReader, ShowCart};
use crate::domain::{AddItemEvent, CartLine, DeleteSkuRequest, ShopId, SkuId, SkuRef, UserId};
use crate::error::{CartError, Result};
use crate::ports::OrderService;

pub struct CartService {
    producer: CartEventProducer,
    merger: Arc<CartMerger>,
    reader: CartReader,
    orders: Arc<dyn OrderService>,
}

impl CartService {
    pub fn new(
        producer: CartEventProducer,
        merger: Arc<CartMerger>,
        reader: CartReader,
        orders: Arc<dyn OrderService>,
    ) -> Self {
        Self {
            producer,
            merger,
            reader,
            orders,
        }
    }

    /// Queue an add. The cart reflects it once a consumer merged the event.
    pub async fn add_item(
        &self,
        uid: UserId,
        shop_id: ShopId,
        sku_id: SkuId,
        count: i64,
    ) -> Result<()> {
        let event = AddItemEvent::new(uid, shop_id, sku_id, count)?;
        self.producer.publish(&event).await
    }

    pub async fn show_cart_goods(&self, uid: UserId, page: i64) -> Result<ShowCart> {
        self.reader.show_cart_goods(uid, page).await
    }

    /// Whether `uid` has a persisted cart. A missing row is `false`, not an error.
    pub async fn has_cart(&self, uid: UserId) -> Result<bool> {
        Ok(self.merger.store().exists(uid).await?)
    }

    /// Remove skus from the cart. Returns how many entries went away.
    pub async fn remove_skus(&self, uid: UserId, items: Vec<SkuRef>) -> Result<usize> {
        if items.is_empty() {
            return Err(CartError::Validation("no skus to remove".to_string()));
        }
        self.merger
            .delete_skus(&DeleteSkuRequest::new(uid, items))
            .await
    }

    /// Create an order for `lines`, then take the purchased counts out of
    /// the cart. A sku bought in full leaves the cart; a partial purchase
    /// leaves the remainder.
    ///
    /// The cart is left untouched when the order fails. A failure to clean
    /// the cart after the order went through is logged, and the order id is
    /// still returned.
    pub async fn checkout(&self, uid: UserId, lines: Vec<CartLine>) -> Result<String> {
        if lines.is_empty() {
            return Err(CartError::Validation("checkout needs at least one line".to_string()));
        }
        if let Some(line) = lines.iter().find(|line| line.count <= 0) {
            return Err(CartError::Validation(format!(
                "count must be positive, got {} for {}",
                line.count, line.sku_id
            )));
        }

        let order_id = self.orders.create_order(uid, &lines).await?;
        info!(%uid, %order_id, lines = lines.len(), "order created");

        if let Err(err) = self.merger.deduct(uid, &lines).await {
            warn!(%uid, %order_id, error = %err, "order created but cart cleanup failed");
        }
        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::projection::Projector;
    use crate::app::retry::RetryPolicy;
    use crate::domain::CartDocument;
    use crate::impls::{InMemoryBroker, InMemoryDocumentStore, MokaProjectionCache, StaticCatalog};
    use crate::ports::{DocumentStore, OrderError, SystemClock};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingOrders {
        fail: bool,
        seen: Mutex<Vec<Vec<CartLine>>>,
    }

    #[async_trait]
    impl OrderService for RecordingOrders {
        async fn create_order(
            &self,
            _uid: UserId,
            lines: &[CartLine],
        ) -> std::result::Result<String, OrderError> {
            self.seen.lock().unwrap().push(lines.to_vec());
            if self.fail {
                return Err(OrderError::Rejected("out of stock".into()));
            }
            Ok("order-1".to_string())
        }
    }

    fn service(orders: Arc<RecordingOrders>) -> (CartService, Arc<InMemoryDocumentStore>) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let cache = Arc::new(MokaProjectionCache::new(100, Duration::from_secs(60)));
        let projector = Projector::new(cache, 10);
        let merger = Arc::new(CartMerger::new(
            store.clone(),
            projector.clone(),
            Arc::new(SystemClock),
            5,
        ));
        let producer = CartEventProducer::new(
            Arc::new(InMemoryBroker::new(4, 1024)),
            "cart.add_item",
            4,
            RetryPolicy::linear(1, Duration::from_millis(1)),
        );
        let reader = CartReader::new(
            store.clone(),
            projector,
            Arc::new(StaticCatalog::new()),
            10,
            2,
        );
        (CartService::new(producer, merger, reader, orders), store)
    }

    fn line(shop: i64, sku: i64, count: i64) -> CartLine {
        CartLine {
            shop_id: ShopId::new(shop),
            sku_id: SkuId::new(sku),
            count,
        }
    }

    async fn seed(service: &CartService, uid: i64, items: &[(i64, i64, i64)]) {
        for &(shop, sku, count) in items {
            let event =
                AddItemEvent::new(UserId::new(uid), ShopId::new(shop), SkuId::new(sku), count)
                    .unwrap();
            service.merger.add_item(&event).await.unwrap();
        }
    }

    async fn document(store: &InMemoryDocumentStore, uid: i64) -> CartDocument {
        let row = store.load(UserId::new(uid)).await.unwrap().unwrap();
        CartDocument::from_json(&row.sku_json).unwrap()
    }

    #[rstest::rstest]
    #[case::empty(vec![])]
    #[case::zero_count(vec![line(1, 1, 0)])]
    #[tokio::test]
    async fn checkout_rejects_bad_lines(#[case] lines: Vec<CartLine>) {
        let orders = Arc::new(RecordingOrders::default());
        let (service, _) = service(orders.clone());

        let err = service.checkout(UserId::new(1), lines).await.unwrap_err();

        assert!(matches!(err, CartError::Validation(_)));
        assert!(orders.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn checkout_removes_purchased_lines() {
        let orders = Arc::new(RecordingOrders::default());
        let (service, store) = service(orders.clone());
        seed(&service, 1, &[(1, 7, 5), (2, 9, 1)]).await;

        let order_id = service
            .checkout(UserId::new(1), vec![line(1, 7, 5)])
            .await
            .unwrap();

        assert_eq!(order_id, "order-1");
        let doc = document(&store, 1).await;
        assert_eq!(doc.count_of(ShopId::new(1), SkuId::new(7)), 0);
        assert!(doc.lines().iter().all(|line| line.sku_id != SkuId::new(7)));
        assert_eq!(doc.count_of(ShopId::new(2), SkuId::new(9)), 1);
    }

    #[tokio::test]
    async fn partial_checkout_keeps_the_remainder() {
        let orders = Arc::new(RecordingOrders::default());
        let (service, store) = service(orders.clone());
        seed(&service, 1, &[(1, 7, 5)]).await;

        service
            .checkout(UserId::new(1), vec![line(1, 7, 2)])
            .await
            .unwrap();

        assert_eq!(orders.seen.lock().unwrap()[0], vec![line(1, 7, 2)]);
        assert_eq!(document(&store, 1).await.count_of(ShopId::new(1), SkuId::new(7)), 3);
    }

    #[tokio::test]
    async fn failed_order_leaves_cart_alone() {
        let orders = Arc::new(RecordingOrders {
            fail: true,
            ..RecordingOrders::default()
        });
        let (service, store) = service(orders);
        seed(&service, 1, &[(1, 7, 5)]).await;

        let err = service
            .checkout(UserId::new(1), vec![line(1, 7, 5)])
            .await
            .unwrap_err();

        assert!(matches!(err, CartError::Order(OrderError::Rejected(_))));
        assert_eq!(document(&store, 1).await.count_of(ShopId::new(1), SkuId::new(7)), 5);
    }

    #[tokio::test]
    async fn remove_skus_and_has_cart() {
        let (service, _) = service(Arc::new(RecordingOrders::default()));
        assert!(!service.has_cart(UserId::new(3)).await.unwrap());

        seed(&service, 3, &[(1, 1, 1), (1, 2, 1)]).await;
        assert!(service.has_cart(UserId::new(3)).await.unwrap());

        let removed = service
            .remove_skus(
                UserId::new(3),
                vec![SkuRef {
                    shop_id: ShopId::new(1),
                    sku_id: SkuId::new(2),
                }],
            )
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn add_item_validates_before_publishing() {
        let (service, _) = service(Arc::new(RecordingOrders::default()));
        let err = service
            .add_item(UserId::new(1), ShopId::new(1), SkuId::new(1), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
    }
}
