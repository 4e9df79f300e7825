//! CartReader - cache-aside の読み取り経路
//!
//! # フロー
//! 1. page を検証（不正なら副作用なしで拒否）
//! 2. page <= cacheable_pages なら projection を読む → hit なら hydrate して返す
//! 3. miss / 対象外 page なら DocumentStore から全体を読む
//!    - 行が無ければ空リスト（エラーではない）
//!    - hydrate して返し、projection の書き戻しを別タスクで起動
//!
//! hydrate の失敗はそのまま呼び出し元に返します（リトライしない）。
//! cache の読み取りエラーも返します。書き戻しの失敗はログのみ。
//!
//! 書き戻しは読んだ行の version 付きで行うので、その間に merge が書いた
//! 新しい projection を古い内容で上書きすることはありません。

use std::sync::Arc;

use tracing::{debug, instrument};

use super::projection::Projector;
use super::refresh::RefreshTask;
use crate::domain::{CartDocument, CartGoods, CartLine, Page, UserId};
use crate::error::Result;
use crate::ports::{
    DocumentStore, HydrationClient, HydrationError, HydrationItem, HydrationRequest,
};

/// Version id sent with every hydration item: "current published version".
const CURRENT_VERSION: i64 = 0;

/// Response of the read path.
#[derive(Debug)]
pub struct ShowCart {
    pub goods: Vec<CartGoods>,
    /// Present when the read went to the document store and scheduled a
    /// cache warm-up.
    pub refresh: Option<RefreshTask>,
}

impl ShowCart {
    fn from_cache(goods: Vec<CartGoods>) -> Self {
        Self {
            goods,
            refresh: None,
        }
    }
}

pub struct CartReader {
    store: Arc<dyn DocumentStore>,
    projector: Projector,
    hydration: Arc<dyn HydrationClient>,
    page_size: u32,
    cacheable_pages: u32,
}

impl CartReader {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        projector: Projector,
        hydration: Arc<dyn HydrationClient>,
        page_size: u32,
        cacheable_pages: u32,
    ) -> Self {
        Self {
            store,
            projector,
            hydration,
            page_size,
            cacheable_pages,
        }
    }

    /// Hydrated goods on `page` of `uid`'s cart.
    #[instrument(skip_all, fields(%uid, page))]
    pub async fn show_cart_goods(&self, uid: UserId, page: i64) -> Result<ShowCart> {
        let page = Page::new(page, i64::from(self.page_size))?;

        if page.number() <= self.cacheable_pages
            && let Some(projection) = self.projector.read(uid).await?
        {
            let lines = projection.lines();
            let window = page.window(&lines);
            // A short window on a full projection may be hiding stores past N.
            let may_be_truncated = projection.stores.len() >= self.projector.recent_stores();
            if window.len() == page.size() as usize || !may_be_truncated {
                debug!(page = page.number(), "served from projection");
                let goods = self.hydrate(window, page).await?;
                return Ok(ShowCart::from_cache(goods));
            }
            debug!(page = page.number(), "projection too short for page, reading document");
        }

        let Some(row) = self.store.load(uid).await? else {
            return Ok(ShowCart::from_cache(Vec::new()));
        };
        let document = CartDocument::from_json(&row.sku_json)?;
        let lines = document.lines();
        let goods = self.hydrate(page.window(&lines), page).await?;

        let projector = self.projector.clone();
        let version = row.version;
        let refresh = RefreshTask::spawn(async move {
            projector.write(&document, version).await.map(|_| ())
        });

        Ok(ShowCart {
            goods,
            refresh: Some(refresh),
        })
    }

    async fn hydrate(&self, lines: &[CartLine], page: Page) -> Result<Vec<CartGoods>> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let request = HydrationRequest {
            items: lines
                .iter()
                .map(|line| HydrationItem {
                    sku_id: line.sku_id,
                    version_id: CURRENT_VERSION,
                })
                .collect(),
            page: page.number(),
            page_size: page.size(),
        };
        let hydrated = self.hydration.hydrate(request).await?;
        if hydrated.len() != lines.len() {
            return Err(HydrationError::LengthMismatch {
                expected: lines.len(),
                actual: hydrated.len(),
            }
            .into());
        }

        Ok(lines
            .iter()
            .zip(hydrated)
            .map(|(line, sku)| CartGoods {
                shop_id: line.shop_id,
                sku_id: line.sku_id,
                count: line.count,
                creator_id: sku.creator_id,
                name: sku.name,
                style_image: sku.style_image,
                unit_price: sku.unit_price,
                discount: sku.discount,
            })
            .collect())
    }
}
