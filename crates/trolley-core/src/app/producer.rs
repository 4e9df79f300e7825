//! CartEventProducer - AddItemEvent を broker に送る
//!
//! # フロー
//! 1. イベントを検証・シリアライズし、partition key（`uid mod P`）を計算
//! 2. broker に 1 件送る
//! 3. 失敗（メッセージ単位の失敗報告 or 送信エラー）なら `i * unit` 待って再送
//! 4. K 回すべて失敗したら、全 attempt のエラー文を連結して返す
//!
//! sleep はキャンセルされません（呼び出し側の deadline では短縮されない）。

use std::sync::Arc;

use tracing::{debug, warn};

use super::retry::RetryPolicy;
use crate::domain::AddItemEvent;
use crate::error::{CartError, Result};
use crate::ports::{BrokerMessage, MessageBroker};

pub struct CartEventProducer {
    broker: Arc<dyn MessageBroker>,
    topic: String,
    partitions: u32,
    retry: RetryPolicy,
}

impl CartEventProducer {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        topic: impl Into<String>,
        partitions: u32,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            broker,
            topic: topic.into(),
            partitions,
            retry,
        }
    }

    /// Queue an "add item" event. Returns once the broker accepted it.
    pub async fn publish(&self, event: &AddItemEvent) -> Result<()> {
        event.validate()?;
        let payload = serde_json::to_vec(event)?;
        let key = event.partition_key(self.partitions);

        let mut errors = Vec::new();
        for attempt in 1..=self.retry.max_attempts {
            let message = BrokerMessage {
                topic: self.topic.clone(),
                key: key.clone(),
                payload: payload.clone(),
            };

            match self.broker.send(vec![message]).await {
                Ok(report) if report.is_success() => {
                    debug!(uid = %event.uid, partition = %key, attempt, "add-item event sent");
                    return Ok(());
                }
                Ok(report) => errors.push(format!("attempt {attempt}: {}", report.describe())),
                Err(err) => errors.push(format!("attempt {attempt}: {err}")),
            }

            if self.retry.has_next(attempt) {
                let delay = self.retry.next_delay(attempt);
                warn!(
                    uid = %event.uid,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "send failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(CartError::SendExhausted {
            attempts: self.retry.max_attempts,
            errors: errors.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ShopId, SkuId, UserId};
    use crate::ports::{BrokerError, SendFailure, SendReport, Subscription};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Fails the first `failures` sends, recording when each send happened.
    struct FlakyBroker {
        failures: u32,
        calls: Mutex<Vec<(Instant, BrokerMessage)>>,
    }

    impl FlakyBroker {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(Instant, BrokerMessage)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageBroker for FlakyBroker {
        async fn send(
            &self,
            messages: Vec<BrokerMessage>,
        ) -> std::result::Result<SendReport, BrokerError> {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.len() as u32;
            calls.extend(messages.into_iter().map(|m| (Instant::now(), m)));
            if n < self.failures {
                return Ok(SendReport {
                    failures: vec![SendFailure {
                        index: 0,
                        reason: format!("leader unavailable #{}", n + 1),
                    }],
                });
            }
            Ok(SendReport::default())
        }

        async fn subscribe(
            &self,
            _topic: &str,
            _group: &str,
        ) -> std::result::Result<Subscription, BrokerError> {
            Err(BrokerError::Backend("not supported".into()))
        }
    }

    fn event(uid: i64) -> AddItemEvent {
        AddItemEvent::new(UserId::new(uid), ShopId::new(1), SkuId::new(7), 2).unwrap()
    }

    fn producer(broker: Arc<FlakyBroker>, attempts: u32) -> CartEventProducer {
        CartEventProducer::new(
            broker,
            "cart.add_item",
            16,
            RetryPolicy::linear(attempts, Duration::from_secs(1)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn first_success_sends_once() {
        let broker = Arc::new(FlakyBroker::new(0));
        producer(broker.clone(), 3).publish(&event(42)).await.unwrap();

        let calls = broker.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1.key, "10");
        assert_eq!(calls[0].1.topic, "cart.add_item");
        let decoded: AddItemEvent = serde_json::from_slice(&calls[0].1.payload).unwrap();
        assert_eq!(decoded, event(42));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let broker = Arc::new(FlakyBroker::new(2));
        producer(broker.clone(), 3).publish(&event(1)).await.unwrap();
        assert_eq!(broker.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_exactly_k_attempts_with_growing_backoff() {
        let broker = Arc::new(FlakyBroker::new(u32::MAX));
        let err = producer(broker.clone(), 4)
            .publish(&event(1))
            .await
            .unwrap_err();

        let calls = broker.calls();
        assert_eq!(calls.len(), 4);

        let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1].0 - w[0].0).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3)
            ]
        );

        match err {
            CartError::SendExhausted { attempts, errors } => {
                assert_eq!(attempts, 4);
                for i in 1..=4 {
                    assert!(errors.contains(&format!("attempt {i}:")), "{errors}");
                }
                assert!(errors.contains("leader unavailable #4"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn invalid_event_is_not_sent() {
        let broker = Arc::new(FlakyBroker::new(0));
        let bad = AddItemEvent {
            uid: UserId::new(1),
            sku_id: SkuId::new(1),
            shop_id: ShopId::new(1),
            count: 0,
        };
        let err = producer(broker.clone(), 3).publish(&bad).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        assert!(broker.calls().is_empty());
    }
}
