//! RefreshTask - read path から切り離して動く projection の書き戻し
//!
//! spawn したタスクの結果は oneshot で受け取れます（受け取らなくても良い）。
//! `abort()` でキャンセル可能。呼び出し元のレスポンスはこの結果を待ちません。

use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{CartError, Result};

/// How a refresh ended.
#[derive(Debug)]
pub enum RefreshOutcome {
    Completed,
    Failed(CartError),
    /// Aborted, or the task panicked before reporting.
    Cancelled,
}

/// Handle to a spawned cache warm-up.
///
/// Dropping it detaches the task; it keeps running.
#[derive(Debug)]
pub struct RefreshTask {
    handle: JoinHandle<()>,
    outcome: oneshot::Receiver<Result<()>>,
}

impl RefreshTask {
    pub fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let result = work.await;
            if let Err(err) = &result {
                warn!(error = %err, "background cache refresh failed");
            }
            // receiver may already be dropped
            let _ = tx.send(result);
        });
        Self {
            handle,
            outcome: rx,
        }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Whether the task has ended, without consuming the handle.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the refresh to end.
    pub async fn outcome(self) -> RefreshOutcome {
        match self.outcome.await {
            Ok(Ok(())) => RefreshOutcome::Completed,
            Ok(Err(err)) => RefreshOutcome::Failed(err),
            Err(_) => RefreshOutcome::Cancelled,
        }
    }
}
