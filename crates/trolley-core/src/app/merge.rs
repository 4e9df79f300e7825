//! CartMerger - DocumentStore に対する read-modify-write
//!
//! # フロー
//! 1. 行を load（無ければ空ドキュメントから）
//! 2. merge 操作（insert / delete / deduct）を適用
//! 3. load 時の version を条件に create / overwrite
//! 4. `Conflict` なら 1 からやり直し（`max_conflicts` 回まで）
//! 5. 成功したら projection を書き直す（失敗はログのみ）
//!
//! 同じ uid への並行 merge は version で直列化されるので、更新が失われません。

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::projection::Projector;
use crate::domain::{AddItemEvent, CartDocument, CartLine, DeleteSkuRequest, UserId};
use crate::error::{CartError, Result};
use crate::ports::{Clock, DocumentStore, StoreError};

/// Result of one merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    pub document: CartDocument,
    pub version: u64,
    /// Conflicts hit before the write went through.
    pub conflicts: u32,
}

pub struct CartMerger {
    store: Arc<dyn DocumentStore>,
    projector: Projector,
    clock: Arc<dyn Clock>,
    max_conflicts: u32,
}

impl CartMerger {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        projector: Projector,
        clock: Arc<dyn Clock>,
        max_conflicts: u32,
    ) -> Self {
        Self {
            store,
            projector,
            clock,
            max_conflicts,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Merge an add-item event, creating the document on first write.
    pub async fn add_item(&self, event: &AddItemEvent) -> Result<Merged> {
        event.validate()?;
        let merged = self
            .update(event.uid, true, |doc, now| doc.insert_sku(event, now))
            .await?
            .ok_or(StoreError::NotFound(event.uid))?;
        self.refresh(&merged).await;
        Ok(merged)
    }

    /// Remove skus, returning how many entries went away.
    /// A user without a document gets 0 and no row is created.
    pub async fn delete_skus(&self, request: &DeleteSkuRequest) -> Result<usize> {
        // set by whichever attempt finally wins the CAS
        let removed = AtomicUsize::new(0);
        let merged = self
            .update(request.uid, false, |doc, _| {
                removed.store(doc.delete_sku(request), Ordering::Relaxed);
            })
            .await?;
        let Some(merged) = merged else {
            return Ok(0);
        };
        self.refresh(&merged).await;
        Ok(removed.load(Ordering::Relaxed))
    }

    /// Take purchased quantities out of the cart, returning how many sku
    /// entries changed. Like `delete_skus`, a missing document stays missing.
    pub async fn deduct(&self, uid: UserId, lines: &[CartLine]) -> Result<usize> {
        let touched = AtomicUsize::new(0);
        let merged = self
            .update(uid, false, |doc, _| {
                touched.store(doc.deduct(lines), Ordering::Relaxed);
            })
            .await?;
        let Some(merged) = merged else {
            return Ok(0);
        };
        self.refresh(&merged).await;
        Ok(touched.load(Ordering::Relaxed))
    }

    async fn refresh(&self, merged: &Merged) {
        let doc = &merged.document;
        if let Err(err) = self.projector.write(doc, merged.version).await {
            warn!(uid = %doc.uid, error = %err, "projection refresh failed");
        }
    }

    /// Compare-and-swap loop over the user's row.
    async fn update<F>(
        &self,
        uid: UserId,
        create_if_missing: bool,
        apply: F,
    ) -> Result<Option<Merged>>
    where
        F: Fn(&mut CartDocument, DateTime<Utc>) + Send + Sync,
    {
        let mut conflicts = 0;
        loop {
            let now = self.clock.now();
            let written = match self.store.load(uid).await? {
                Some(row) => {
                    let mut doc = CartDocument::from_json(&row.sku_json)?;
                    apply(&mut doc, now);
                    let raw = doc.to_json()?;
                    self.store
                        .overwrite(uid, &raw, row.version)
                        .await
                        .map(|version| (doc, version))
                }
                None if create_if_missing => {
                    let mut doc = CartDocument::new(uid);
                    apply(&mut doc, now);
                    let raw = doc.to_json()?;
                    self.store.create(uid, &raw).await.map(|version| (doc, version))
                }
                None => return Ok(None),
            };

            match written {
                Ok((document, version)) => {
                    return Ok(Some(Merged {
                        document,
                        version,
                        conflicts,
                    }));
                }
                // NotFound here means the row vanished between load and overwrite.
                Err(StoreError::Conflict(_) | StoreError::NotFound(_))
                    if conflicts < self.max_conflicts =>
                {
                    conflicts += 1;
                    debug!(%uid, conflicts, "document changed underneath, retrying merge");
                }
                Err(StoreError::Conflict(_)) => {
                    return Err(CartError::Conflict {
                        uid,
                        attempts: conflicts + 1,
                    });
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
