use thiserror::Error;

use crate::domain::UserId;
use crate::ports::{BrokerError, CacheError, HydrationError, OrderError, StoreError};

#[derive(Debug, Error)]
pub enum CartError {
    /// Rejected before any side effect.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("document store: {0}")]
    Store(#[from] StoreError),

    #[error("cache: {0}")]
    Cache(#[from] CacheError),

    #[error("broker: {0}")]
    Broker(#[from] BrokerError),

    #[error("hydration: {0}")]
    Hydration(#[from] HydrationError),

    #[error("order service: {0}")]
    Order(#[from] OrderError),

    /// Every producer attempt failed; `errors` joins each attempt's message.
    #[error("send failed after {attempts} attempts: {errors}")]
    SendExhausted { attempts: u32, errors: String },

    /// The document row kept changing underneath the merge.
    #[error("cart of {uid} still conflicting after {attempts} attempts")]
    Conflict { uid: UserId, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, CartError>;
