//! Cart document and the merge operations applied to it.
//!
//! Design:
//! - `stores` is kept in MRU order (most recently touched store first).
//! - The order is maintained incrementally by `insert_sku`; nothing resorts
//!   the list implicitly.
//! - At most one `StoreEntry` per store id, at most one `SkuEntry` per sku id
//!   within a store.
//!
//! Linear scans are fine here: a cart holds a handful of stores and skus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{AddItemEvent, DeleteSkuRequest};
use super::goods::CartLine;
use super::ids::{ShopId, SkuId, UserId};

/// Quantity of one sku inside a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuEntry {
    pub sku_id: SkuId,
    pub count: i64,
}

/// All skus a user holds from one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntry {
    pub store_id: ShopId,
    pub updated_at: DateTime<Utc>,
    pub skus: Vec<SkuEntry>,
}

/// Per-user cart, persisted as a single JSON blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartDocument {
    pub uid: UserId,
    #[serde(default)]
    pub stores: Vec<StoreEntry>,
}

impl CartDocument {
    /// Empty cart for `uid`.
    pub fn new(uid: UserId) -> Self {
        Self {
            uid,
            stores: Vec::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Merge an "add item" event into the cart.
    ///
    /// - Known store + known sku: `count` accumulates in place.
    /// - Known store + new sku: the sku is prepended to that store's list.
    /// - Either way the store moves to the front with `updated_at = now`.
    /// - Unknown store: a new store with a single sku is prepended.
    ///
    /// The caller validates `event.count`; accumulation saturates instead of
    /// wrapping.
    pub fn insert_sku(&mut self, event: &AddItemEvent, now: DateTime<Utc>) {
        let Some(idx) = self
            .stores
            .iter()
            .position(|store| store.store_id == event.shop_id)
        else {
            self.stores.insert(
                0,
                StoreEntry {
                    store_id: event.shop_id,
                    updated_at: now,
                    skus: vec![SkuEntry {
                        sku_id: event.sku_id,
                        count: event.count,
                    }],
                },
            );
            return;
        };

        let mut store = self.stores.remove(idx);
        match store.skus.iter_mut().find(|sku| sku.sku_id == event.sku_id) {
            Some(sku) => sku.count = sku.count.saturating_add(event.count),
            None => store.skus.insert(
                0,
                SkuEntry {
                    sku_id: event.sku_id,
                    count: event.count,
                },
            ),
        }
        store.updated_at = now;
        self.stores.insert(0, store);
    }

    /// Stable descending sort by `updated_at`.
    ///
    /// Not called by `insert_sku`. Use it after loading a document whose
    /// order cannot be trusted.
    pub fn sort_stores_by_updated_at(&mut self) {
        self.stores.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }

    /// Remove every sku matching one of the request's `(store, sku)` pairs.
    ///
    /// Stores left without skus stay in the document. Returns the number of
    /// removed sku entries.
    pub fn delete_sku(&mut self, request: &DeleteSkuRequest) -> usize {
        let mut removed = 0;
        for store in &mut self.stores {
            let before = store.skus.len();
            let store_id = store.store_id;
            store
                .skus
                .retain(|sku| !request.matches(store_id, sku.sku_id));
            removed += before - store.skus.len();
        }
        removed
    }

    /// Take purchased quantities out of the cart.
    ///
    /// Each line lowers its sku's count; an entry that reaches zero is
    /// removed. Lines for skus not in the cart are ignored. Store order and
    /// `updated_at` are left alone, and emptied stores stay like in
    /// `delete_sku`. Returns the number of sku entries that changed.
    pub fn deduct(&mut self, lines: &[CartLine]) -> usize {
        let mut touched = 0;
        for line in lines {
            let Some(store) = self
                .stores
                .iter_mut()
                .find(|store| store.store_id == line.shop_id)
            else {
                continue;
            };
            let Some(idx) = store.skus.iter().position(|sku| sku.sku_id == line.sku_id) else {
                continue;
            };
            let left = store.skus[idx].count.saturating_sub(line.count);
            if left > 0 {
                store.skus[idx].count = left;
            } else {
                store.skus.remove(idx);
            }
            touched += 1;
        }
        touched
    }

    /// First `min(n, len)` stores, borrowed.
    ///
    /// Serializes exactly like a `CartDocument`, so the cached projection can
    /// be read back with `CartDocument::from_json`.
    pub fn recent_stores(&self, n: usize) -> RecentStores<'_> {
        let end = n.min(self.stores.len());
        RecentStores {
            uid: self.uid,
            stores: &self.stores[..end],
        }
    }

    /// Flatten to `(store, sku, count)` lines, in document order.
    pub fn lines(&self) -> Vec<CartLine> {
        flatten(&self.stores)
    }

    /// Total quantity for one `(store, sku)` pair, 0 when absent.
    pub fn count_of(&self, shop_id: ShopId, sku_id: SkuId) -> i64 {
        self.stores
            .iter()
            .filter(|store| store.store_id == shop_id)
            .flat_map(|store| store.skus.iter())
            .filter(|sku| sku.sku_id == sku_id)
            .map(|sku| sku.count)
            .sum()
    }
}

/// Read-only prefix of a cart document.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RecentStores<'a> {
    pub uid: UserId,
    pub stores: &'a [StoreEntry],
}

impl RecentStores<'_> {
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn flatten(stores: &[StoreEntry]) -> Vec<CartLine> {
    stores
        .iter()
        .flat_map(|store| {
            store.skus.iter().map(move |sku| CartLine {
                shop_id: store.store_id,
                sku_id: sku.sku_id,
                count: sku.count,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::SkuRef;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn add(uid: i64, shop: i64, sku: i64, count: i64) -> AddItemEvent {
        AddItemEvent::new(UserId::new(uid), ShopId::new(shop), SkuId::new(sku), count).unwrap()
    }

    fn store_order(doc: &CartDocument) -> Vec<i64> {
        doc.stores.iter().map(|s| s.store_id.get()).collect()
    }

    #[test]
    fn same_sku_accumulates_into_one_entry() {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.insert_sku(&add(1, 10, 100, 2), t(0));
        doc.insert_sku(&add(1, 10, 100, 3), t(1));

        assert_eq!(doc.stores.len(), 1);
        assert_eq!(
            doc.stores[0].skus,
            vec![SkuEntry {
                sku_id: SkuId::new(100),
                count: 5
            }]
        );
    }

    #[test]
    fn touched_store_moves_to_front() {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.insert_sku(&add(1, 1, 11, 1), t(0));
        doc.insert_sku(&add(1, 2, 21, 1), t(1));
        doc.insert_sku(&add(1, 1, 12, 1), t(2));
        doc.insert_sku(&add(1, 3, 31, 1), t(3));

        assert_eq!(store_order(&doc), vec![3, 1, 2]);
        assert_eq!(doc.stores[1].updated_at, t(2));
    }

    #[test]
    fn new_sku_is_prepended_without_reordering_existing() {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.insert_sku(&add(1, 1, 11, 1), t(0));
        doc.insert_sku(&add(1, 1, 12, 1), t(1));
        doc.insert_sku(&add(1, 1, 11, 4), t(2));
        doc.insert_sku(&add(1, 1, 13, 1), t(3));

        let skus: Vec<(i64, i64)> = doc.stores[0]
            .skus
            .iter()
            .map(|s| (s.sku_id.get(), s.count))
            .collect();
        assert_eq!(skus, vec![(13, 1), (12, 1), (11, 5)]);
    }

    #[test]
    fn existing_sku_refreshes_store_recency() {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.insert_sku(&add(1, 1, 11, 1), t(0));
        doc.insert_sku(&add(1, 2, 21, 1), t(1));
        doc.insert_sku(&add(1, 1, 11, 1), t(2));

        assert_eq!(store_order(&doc), vec![1, 2]);
        assert_eq!(doc.stores[0].updated_at, t(2));
    }

    #[test]
    fn sort_restores_recency_order_stably() {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.stores = vec![
            StoreEntry {
                store_id: ShopId::new(1),
                updated_at: t(1),
                skus: vec![],
            },
            StoreEntry {
                store_id: ShopId::new(2),
                updated_at: t(5),
                skus: vec![],
            },
            StoreEntry {
                store_id: ShopId::new(3),
                updated_at: t(1),
                skus: vec![],
            },
        ];

        doc.sort_stores_by_updated_at();

        assert_eq!(store_order(&doc), vec![2, 1, 3]);
    }

    #[test]
    fn delete_only_touches_the_matching_pair() {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.insert_sku(&add(1, 1, 7, 2), t(0));
        doc.insert_sku(&add(1, 1, 8, 1), t(1));
        doc.insert_sku(&add(1, 2, 7, 4), t(2));
        let before = doc.clone();

        let removed = doc.delete_sku(&DeleteSkuRequest::new(
            UserId::new(1),
            vec![SkuRef {
                shop_id: ShopId::new(1),
                sku_id: SkuId::new(7),
            }],
        ));

        assert_eq!(removed, 1);
        assert_eq!(doc.stores[0], before.stores[0]);
        assert_eq!(doc.stores[1].updated_at, before.stores[1].updated_at);
        assert_eq!(
            doc.stores[1].skus,
            vec![SkuEntry {
                sku_id: SkuId::new(8),
                count: 1
            }]
        );
    }

    #[test]
    fn delete_keeps_emptied_store() {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.insert_sku(&add(1, 1, 7, 2), t(0));

        doc.delete_sku(&DeleteSkuRequest::new(
            UserId::new(1),
            vec![SkuRef {
                shop_id: ShopId::new(1),
                sku_id: SkuId::new(7),
            }],
        ));

        assert_eq!(doc.stores.len(), 1);
        assert!(doc.stores[0].skus.is_empty());
    }

    fn line(shop: i64, sku: i64, count: i64) -> CartLine {
        CartLine {
            shop_id: ShopId::new(shop),
            sku_id: SkuId::new(sku),
            count,
        }
    }

    #[rstest]
    #[case::partial(2, Some(3))]
    #[case::exact(5, None)]
    #[case::more_than_held(9, None)]
    fn deduct_lowers_count_and_drops_exhausted_entries(
        #[case] bought: i64,
        #[case] left: Option<i64>,
    ) {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.insert_sku(&add(1, 1, 7, 5), t(0));
        doc.insert_sku(&add(1, 1, 8, 1), t(1));
        let updated_at = doc.stores[0].updated_at;

        let touched = doc.deduct(&[line(1, 7, bought)]);

        assert_eq!(touched, 1);
        let remaining = doc.stores[0].skus.iter().find(|sku| sku.sku_id == SkuId::new(7));
        assert_eq!(remaining.map(|sku| sku.count), left);
        assert_eq!(doc.count_of(ShopId::new(1), SkuId::new(8)), 1);
        assert_eq!(doc.stores[0].updated_at, updated_at);
    }

    #[test]
    fn deduct_ignores_unknown_lines_and_keeps_emptied_store() {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.insert_sku(&add(1, 1, 7, 2), t(0));

        let touched = doc.deduct(&[line(1, 7, 2), line(1, 99, 1), line(5, 7, 1)]);

        assert_eq!(touched, 1);
        assert_eq!(doc.stores.len(), 1);
        assert!(doc.stores[0].skus.is_empty());
    }

    #[rstest]
    #[case::fewer_than_len(2, 2)]
    #[case::exactly_len(3, 3)]
    #[case::more_than_len(10, 3)]
    #[case::zero(0, 0)]
    fn recent_stores_is_an_order_preserving_prefix(#[case] n: usize, #[case] expected: usize) {
        let mut doc = CartDocument::new(UserId::new(1));
        for (i, shop) in [1, 2, 3].into_iter().enumerate() {
            doc.insert_sku(&add(1, shop, 1, 1), t(i as i64));
        }

        let recent = doc.recent_stores(n);

        assert_eq!(recent.len(), expected);
        assert_eq!(recent.stores, &doc.stores[..expected]);
    }

    #[test]
    fn recent_stores_reads_back_as_a_document() {
        let mut doc = CartDocument::new(UserId::new(9));
        doc.insert_sku(&add(9, 1, 1, 1), t(0));
        doc.insert_sku(&add(9, 2, 2, 1), t(1));

        let raw = doc.recent_stores(1).to_json().unwrap();
        let back = CartDocument::from_json(&raw).unwrap();

        assert_eq!(back.uid, UserId::new(9));
        assert_eq!(back.stores, doc.stores[..1].to_vec());
    }

    #[test]
    fn lines_follow_document_order() {
        let mut doc = CartDocument::new(UserId::new(1));
        doc.insert_sku(&add(1, 1, 7, 2), t(0));
        doc.insert_sku(&add(1, 2, 9, 1), t(1));

        let lines: Vec<(i64, i64, i64)> = doc
            .lines()
            .iter()
            .map(|l| (l.shop_id.get(), l.sku_id.get(), l.count))
            .collect();
        assert_eq!(lines, vec![(2, 9, 1), (1, 7, 2)]);
    }
}
