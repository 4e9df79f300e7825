//! ConsumerGroup - broker から AddItemEvent を受け取り merge するループ
//!
//! # フロー
//! 1. member ごとに subscribe し、ループを spawn
//! 2. delivery を decode / validate（失敗したら捨てる）
//! 3. CartMerger で merge（失敗はログのみ、再送しない）
//! 4. shutdown が来たら処理中の merge を終えてから抜ける
//!
//! projection の書き込み失敗は merge の成功を取り消しません。

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use super::merge::CartMerger;
use crate::domain::AddItemEvent;
use crate::error::Result;
use crate::observability::ConsumerStats;
use crate::ports::{Delivery, MessageBroker, Subscription};

/// What happened to one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Merged,
    /// Undecodable or invalid payload; dropped, never retried.
    Malformed,
    /// Merge failed; logged and dropped.
    Failed,
}

/// Consumer group handle.
/// - `request_shutdown()` で全 member のループが止まる
/// - `shutdown_and_join()` で全 member の終了を待てる
pub struct ConsumerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    member_ids: Vec<String>,
}

impl ConsumerGroup {
    /// Join `members` consumers to `group` on `topic` and start their loops.
    pub async fn spawn(
        members: usize,
        broker: Arc<dyn MessageBroker>,
        topic: &str,
        group: &str,
        merger: Arc<CartMerger>,
        stats: Arc<ConsumerStats>,
    ) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(members);
        let mut member_ids = Vec::with_capacity(members);
        for _ in 0..members {
            let subscription = broker.subscribe(topic, group).await?;
            member_ids.push(subscription.member_id().to_string());

            let merger = Arc::clone(&merger);
            let stats = Arc::clone(&stats);
            let mut rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                consume_loop(subscription, merger, stats, &mut rx).await;
            }));
        }

        info!(topic, group, members, "consumer group started");
        Ok(Self {
            shutdown_tx,
            joins,
            member_ids,
        })
    }

    pub fn member_ids(&self) -> &[String] {
        &self.member_ids
    }

    /// Request shutdown for all members.
    /// In-flight merges finish; no new deliveries are taken.
    pub fn request_shutdown(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all members.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn consume_loop(
    mut subscription: Subscription,
    merger: Arc<CartMerger>,
    stats: Arc<ConsumerStats>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // recv は「待つ」ので select で shutdown と競合させる
        let delivery = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    // sender dropped: nobody can stop us any more, treat as shutdown
                    break;
                }
                continue;
            }
            delivery = subscription.recv() => delivery,
        };

        let Some(delivery) = delivery else {
            warn!(member = subscription.member_id(), "subscription closed, consumer exiting");
            break;
        };

        handle_delivery(&merger, &stats, &delivery).await;
    }
}

/// Decode one delivery and merge it into the owner's cart.
///
/// Never fails: malformed payloads and merge errors are logged and the
/// message is dropped.
#[instrument(skip_all, fields(partition = delivery.partition, offset = delivery.offset))]
pub async fn handle_delivery(
    merger: &CartMerger,
    stats: &ConsumerStats,
    delivery: &Delivery,
) -> ConsumeOutcome {
    let event = match serde_json::from_slice::<AddItemEvent>(&delivery.payload) {
        Ok(event) => event,
        Err(err) => {
            error!(error = %err, "undecodable add-item payload, dropping");
            stats.record_malformed();
            return ConsumeOutcome::Malformed;
        }
    };
    if let Err(err) = event.validate() {
        error!(uid = %event.uid, error = %err, "invalid add-item event, dropping");
        stats.record_malformed();
        return ConsumeOutcome::Malformed;
    }

    match merger.add_item(&event).await {
        Ok(merged) => {
            stats.record_conflicts(merged.conflicts);
            stats.record_merged();
            ConsumeOutcome::Merged
        }
        Err(err) => {
            error!(uid = %event.uid, error = %err, "cart merge failed, dropping event");
            stats.record_failed();
            ConsumeOutcome::Failed
        }
    }
}
