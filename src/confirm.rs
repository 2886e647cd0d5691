//! Polling confirmation of submitted transactions.

use std::{future::Future, time::Duration};

use alloy::primitives::TxHash;
use serde_json::json;
use tokio::time::{Instant, sleep_until};

use crate::{
    error::{DeployError, DeployResult, RpcError},
    rpc::RpcClient,
    types::{Receipt, ReceiptStatus},
};

/// Poll intervals below this are raised to it.
pub const POLL_INTERVAL_FLOOR: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct WaitConfig {
    /// Give up once this much time passed without a receipt.
    pub timeout: Duration,
    /// First delay between polls, and the floor for every later one.
    pub min_poll_interval: Duration,
    /// Delays double after each empty poll up to this cap.
    pub max_poll_interval: Duration,
    /// Consecutive transport failures tolerated while polling.
    pub max_transport_retries: u32,
}

impl WaitConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            min_poll_interval: Duration::from_millis(500),
            max_poll_interval: Duration::from_secs(5),
            max_transport_retries: 3,
        }
    }

    pub fn with_poll_interval(mut self, min: Duration, max: Duration) -> Self {
        self.min_poll_interval = min.max(POLL_INTERVAL_FLOOR);
        self.max_poll_interval = max.max(self.min_poll_interval);
        self
    }

    pub fn with_transport_retries(mut self, retries: u32) -> Self {
        self.max_transport_retries = retries;
        self
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

/// Where a confirmation wait currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Pending,
    Confirmed,
    Failed,
    TimedOut,
}

/// Ask the node once for the receipt of `hash`; `None` while not yet mined.
///
/// A receipt for any other transaction is a malformed answer.
pub async fn fetch_receipt<R: RpcClient>(rpc: &R, hash: TxHash) -> DeployResult<Option<Receipt>> {
    let method = "eth_getTransactionReceipt";
    let malformed = |reason: String| DeployError::transport(method, RpcError::Malformed(reason));
    let value = rpc
        .call(method, vec![json!(hash)])
        .await
        .map_err(|err| DeployError::transport(method, err))?;
    match Receipt::from_rpc(value).map_err(malformed)? {
        Some(receipt) if receipt.transaction_hash != hash => Err(malformed(format!(
            "receipt for {} while polling {hash}",
            receipt.transaction_hash
        ))),
        receipt => Ok(receipt),
    }
}

/// Polls a node until a transaction is mined.
///
/// A waiter holds no per-transaction state, so a hash whose wait timed out or
/// was cancelled can simply be waited on again.
pub struct ConfirmationWaiter<'a, R> {
    rpc: &'a R,
    config: WaitConfig,
}

impl<'a, R: RpcClient> ConfirmationWaiter<'a, R> {
    pub fn new(rpc: &'a R, config: WaitConfig) -> Self {
        Self { rpc, config }
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Wait for the receipt of `hash` until the configured timeout.
    pub async fn wait_for_receipt(&self, hash: TxHash) -> DeployResult<Receipt> {
        self.wait_for_receipt_until(hash, std::future::pending()).await
    }

    /// Wait for the receipt of `hash`, stopping early once `cancel` resolves.
    ///
    /// Returns the receipt on success, [`DeployError::TransactionReverted`] on a
    /// failed receipt and [`DeployError::ConfirmationTimeout`] when the timeout
    /// elapses or `cancel` fires. No poll is issued after either.
    ///
    /// Only connection-level failures are retried; node errors and malformed
    /// receipts are returned at once.
    pub async fn wait_for_receipt_until<C>(&self, hash: TxHash, cancel: C) -> DeployResult<Receipt>
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let min_interval = self.config.min_poll_interval.max(POLL_INTERVAL_FLOOR);
        let max_interval = self.config.max_poll_interval.max(min_interval);
        let mut interval = min_interval;
        let mut failures = 0u32;
        let timed_out = |cancelled: bool| {
            let elapsed = started.elapsed();
            tracing::warn!(%hash, ?elapsed, cancelled, state = ?WaitState::TimedOut, "stopped waiting for receipt");
            DeployError::ConfirmationTimeout {
                hash,
                elapsed,
                cancelled,
            }
        };
        tokio::pin!(cancel);

        loop {
            if Instant::now() >= deadline {
                return Err(timed_out(false));
            }

            let polled = tokio::select! {
                biased;
                _ = &mut cancel => return Err(timed_out(true)),
                _ = sleep_until(deadline) => return Err(timed_out(false)),
                polled = fetch_receipt(self.rpc, hash) => polled,
            };

            match polled {
                Ok(Some(receipt)) => return self.settle(receipt),
                Ok(None) => {
                    failures = 0;
                    tracing::debug!(%hash, state = ?WaitState::Pending, ?interval, "tx not mined yet");
                }
                Err(
                    err @ DeployError::Transport {
                        source: RpcError::Transport(_),
                        ..
                    },
                ) if failures < self.config.max_transport_retries =>
                {
                    failures += 1;
                    tracing::warn!(%hash, %err, failures, "receipt poll failed, retrying");
                }
                Err(err) => return Err(err),
            }

            let wake = (Instant::now() + interval).min(deadline);
            tokio::select! {
                biased;
                _ = &mut cancel => return Err(timed_out(true)),
                _ = sleep_until(wake) => {}
            }
            interval = interval
                .saturating_mul(2)
                .min(max_interval)
                .max(min_interval);
        }
    }

    fn settle(&self, receipt: Receipt) -> DeployResult<Receipt> {
        let hash = receipt.transaction_hash;
        match receipt.status {
            ReceiptStatus::Success => {
                tracing::info!(%hash, block = receipt.block_number, state = ?WaitState::Confirmed, "tx mined");
                Ok(receipt)
            }
            ReceiptStatus::Failure => {
                tracing::warn!(%hash, block = receipt.block_number, state = ?WaitState::Failed, "tx reverted");
                Err(DeployError::TransactionReverted(Box::new(receipt)))
            }
        }
    }
}
