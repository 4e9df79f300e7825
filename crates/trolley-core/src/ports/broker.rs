//! MessageBroker port - パーティション付きメッセージ配送
//!
//! - send: 1 回の呼び出しで複数メッセージを送り、メッセージ単位の失敗を報告
//! - subscribe: consumer group に参加し、割り当てられたパーティションの配送を受け取る
//!
//! 同じ key（= パーティション）のメッセージは 1 つの member に順番通り届きます。
//! それ以上の順序保証はありません。

use async_trait::async_trait;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("broker closed")]
    Closed,

    #[error("backend failure: {0}")]
    Backend(String),
}

/// Outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: String,
    pub payload: Vec<u8>,
}

/// Failure of one message inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub index: usize,
    pub reason: String,
}

/// Per-batch outcome: empty `failures` means every message was accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    pub failures: Vec<SendFailure>,
}

impl SendReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// One line listing every failed message.
    pub fn describe(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("message {}: {}", f.index, f.reason))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Membership in a consumer group.
///
/// Dropping it leaves the group; the broker reassigns its partitions on the
/// next send.
pub struct Subscription {
    member_id: String,
    rx: mpsc::UnboundedReceiver<Delivery>,
}

impl Subscription {
    pub fn new(member_id: String, rx: mpsc::UnboundedReceiver<Delivery>) -> Self {
        Self { member_id, rx }
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    /// Next delivery; `None` once the broker side is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn send(&self, messages: Vec<BrokerMessage>) -> Result<SendReport, BrokerError>;

    async fn subscribe(&self, topic: &str, group: &str) -> Result<Subscription, BrokerError>;
}
