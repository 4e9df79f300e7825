//! InMemoryBroker - 開発用のパーティション付き broker
//!
//! # 実装詳細
//! - topic ごとに `partitions` 個のパーティション（key をパースして `key mod P`）
//! - consumer group ごとに member 一覧とパーティションの持ち主を持つ
//!   - 持ち主のいないパーティション p は最初の send で `members[p % members.len()]` が取る
//!   - 一度取ったパーティションは、その member の subscription が落ちるまで手放さない
//! - member が 1 人もいない group には backlog として溜め、次の subscribe で流す
//! - `max_message_bytes` を超える payload はメッセージ単位の失敗として報告
//!
//! 同じパーティションのメッセージは持ち主のチャネルに順番通り入ります。
//! member が増えても持ち主は変わらないので、あるパーティションのメッセージを
//! 2 つの member が同時に処理することはありません。持ち主が抜けたときは、
//! その member が受け取り済みで未処理のメッセージは失われます。

use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;
use ulid::Ulid;

use crate::ports::{
    BrokerError, BrokerMessage, Delivery, MessageBroker, SendFailure, SendReport, Subscription,
};

struct Member {
    id: String,
    tx: mpsc::UnboundedSender<Delivery>,
}

#[derive(Default)]
struct GroupState {
    /// Join order.
    members: Vec<Member>,
    /// partition -> member id, claimed on first delivery.
    owners: HashMap<u32, String>,
    backlog: VecDeque<Delivery>,
}

impl GroupState {
    /// Hand `delivery` to the member owning its partition, pruning members
    /// whose subscription was dropped. Falls back to the backlog.
    fn route(&mut self, delivery: Delivery) {
        let mut delivery = delivery;
        while !self.members.is_empty() {
            let idx = self.owner_index(delivery.partition);
            match self.members[idx].tx.send(delivery) {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    let gone = self.members.remove(idx);
                    self.owners.retain(|_, owner| *owner != gone.id);
                    debug!(member = %gone.id, "member left, releasing its partitions");
                    delivery = returned;
                }
            }
        }
        self.backlog.push_back(delivery);
    }

    /// Index of the member owning `partition`. An unowned partition is
    /// claimed by `members[partition % members.len()]`.
    fn owner_index(&mut self, partition: u32) -> usize {
        if let Some(owner) = self.owners.get(&partition)
            && let Some(idx) = self.members.iter().position(|m| &m.id == owner)
        {
            return idx;
        }
        let idx = partition as usize % self.members.len();
        self.owners.insert(partition, self.members[idx].id.clone());
        idx
    }

    fn flush_backlog(&mut self) {
        let pending: Vec<Delivery> = self.backlog.drain(..).collect();
        for delivery in pending {
            self.route(delivery);
        }
    }
}

#[derive(Default)]
struct TopicState {
    next_offset: HashMap<u32, u64>,
    groups: HashMap<String, GroupState>,
    /// Messages sent before any group existed.
    orphaned: VecDeque<Delivery>,
}

struct BrokerState {
    topics: HashMap<String, TopicState>,
    closed: bool,
}

pub struct InMemoryBroker {
    partitions: u32,
    max_message_bytes: usize,
    state: Mutex<BrokerState>,
}

impl InMemoryBroker {
    pub fn new(partitions: u32, max_message_bytes: usize) -> Self {
        Self {
            partitions: partitions.max(1),
            max_message_bytes,
            state: Mutex::new(BrokerState {
                topics: HashMap::new(),
                closed: false,
            }),
        }
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Partition a key lands on: numeric keys map `key mod P`, anything else
    /// is hashed.
    pub fn partition_for(&self, key: &str) -> u32 {
        let partitions = u64::from(self.partitions);
        let slot = match key.parse::<i64>() {
            Ok(n) => n.rem_euclid(partitions as i64) as u64,
            Err(_) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                hasher.finish() % partitions
            }
        };
        slot as u32
    }

    /// Current `member_id -> partitions` assignment for a group.
    ///
    /// Unowned partitions are reported where their next delivery would go.
    pub async fn assignment(&self, topic: &str, group: &str) -> HashMap<String, Vec<u32>> {
        let state = self.state.lock().await;
        let mut out: HashMap<String, Vec<u32>> = HashMap::new();
        let Some(group) = state
            .topics
            .get(topic)
            .and_then(|t| t.groups.get(group))
        else {
            return out;
        };
        let live: Vec<&Member> = group.members.iter().filter(|m| !m.tx.is_closed()).collect();
        if live.is_empty() {
            return out;
        }
        for partition in 0..self.partitions {
            let owner = group
                .owners
                .get(&partition)
                .and_then(|owner| live.iter().find(|m| &m.id == owner));
            let member = owner.unwrap_or(&live[partition as usize % live.len()]);
            out.entry(member.id.clone()).or_default().push(partition);
        }
        out
    }

    /// Stop accepting sends and subscriptions; open subscriptions end.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.topics.clear();
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn send(&self, messages: Vec<BrokerMessage>) -> Result<SendReport, BrokerError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(BrokerError::Closed);
        }

        let mut report = SendReport::default();
        for (index, message) in messages.into_iter().enumerate() {
            if message.topic.is_empty() {
                report.failures.push(SendFailure {
                    index,
                    reason: "empty topic".to_string(),
                });
                continue;
            }
            if message.payload.len() > self.max_message_bytes {
                report.failures.push(SendFailure {
                    index,
                    reason: format!(
                        "payload of {} bytes exceeds {}",
                        message.payload.len(),
                        self.max_message_bytes
                    ),
                });
                continue;
            }

            let partition = self.partition_for(&message.key);
            let topic = state.topics.entry(message.topic.clone()).or_default();
            let offset = topic.next_offset.entry(partition).or_insert(0);
            let delivery = Delivery {
                topic: message.topic,
                partition,
                offset: *offset,
                key: message.key,
                payload: message.payload,
            };
            *offset += 1;

            if topic.groups.is_empty() {
                topic.orphaned.push_back(delivery);
                continue;
            }
            for group in topic.groups.values_mut() {
                group.route(delivery.clone());
            }
        }
        Ok(report)
    }

    async fn subscribe(&self, topic: &str, group: &str) -> Result<Subscription, BrokerError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(BrokerError::Closed);
        }

        let topic_state = state.topics.entry(topic.to_string()).or_default();
        let first_group = topic_state.groups.is_empty();
        let orphaned: Vec<Delivery> = if first_group {
            topic_state.orphaned.drain(..).collect()
        } else {
            Vec::new()
        };

        let group_state = topic_state.groups.entry(group.to_string()).or_default();
        group_state.backlog.extend(orphaned);

        let (tx, rx) = mpsc::unbounded_channel();
        let member_id = format!("{group}-{}", Ulid::new());
        group_state.members.push(Member {
            id: member_id.clone(),
            tx,
        });
        group_state.flush_backlog();

        debug!(topic, group, member = %member_id, "member joined");
        Ok(Subscription::new(member_id, rx))
    }
}
