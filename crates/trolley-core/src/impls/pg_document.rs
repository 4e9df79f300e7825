//! PgDocumentStore - PostgreSQL による DocumentStore（`postgres` feature）
//!
//! ```sql
//! CREATE TABLE cart_document (
//!     user_id  BIGINT PRIMARY KEY,
//!     sku_json TEXT   NOT NULL,
//!     version  BIGINT NOT NULL
//! );
//! ```

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::UserId;
use crate::ports::{DocumentStore, StoreError, StoredDocument};

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn to_db_version(version: u64) -> Result<i64, StoreError> {
    i64::try_from(version)
        .map_err(|_| StoreError::Backend(format!("version {version} out of range")))
}

fn from_db_version(version: i64) -> Result<u64, StoreError> {
    u64::try_from(version).map_err(|_| StoreError::Backend(format!("negative version {version}")))
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn exists(&self, uid: UserId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM cart_document WHERE user_id = $1)",
        )
        .bind(uid.get())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)
    }

    async fn load(&self, uid: UserId) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT sku_json, version FROM cart_document WHERE user_id = $1",
        )
        .bind(uid.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some((sku_json, version)) => Ok(Some(StoredDocument {
                user_id: uid,
                sku_json,
                version: from_db_version(version)?,
            })),
            None => Ok(None),
        }
    }

    async fn create(&self, uid: UserId, sku_json: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO cart_document (user_id, sku_json, version) VALUES ($1, $2, 1) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(uid.get())
        .bind(sku_json)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(uid));
        }
        Ok(1)
    }

    async fn overwrite(
        &self,
        uid: UserId,
        sku_json: &str,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let expected = to_db_version(expected_version)?;
        let updated = sqlx::query_scalar::<_, i64>(
            "UPDATE cart_document SET sku_json = $2, version = version + 1 \
             WHERE user_id = $1 AND version = $3 RETURNING version",
        )
        .bind(uid.get())
        .bind(sku_json)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match updated {
            Some(version) => from_db_version(version),
            None if self.exists(uid).await? => Err(StoreError::Conflict(uid)),
            None => Err(StoreError::NotFound(uid)),
        }
    }
}
