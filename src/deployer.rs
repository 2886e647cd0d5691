//! Contract deployment and follow-up state queries
use std::{fmt, future::Future, time::Duration};

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    primitives::{Address, U256},
};
use futures::future::try_join;
use tokio::time::{Instant, sleep_until};

use crate::{
    artifact::Artifact,
    confirm::{ConfirmationWaiter, WaitConfig},
    error::{DeployError, DeployResult},
    reader,
    rpc::RpcClient,
    submit,
    types::{ContractHandle, DepositRecord, Receipt},
    units::format_ether,
};

/// Sequences submission, confirmation and address recovery for one node.
pub struct Deployer<'a, R> {
    rpc: &'a R,
    wait: WaitConfig,
}

impl<'a, R: RpcClient> Deployer<'a, R> {
    pub fn new(rpc: &'a R, wait: WaitConfig) -> Self {
        Self { rpc, wait }
    }

    /// Deploy a contract (with logging)
    pub async fn deploy(
        &self,
        name: &str,
        sender: Address,
        bytecode: &[u8],
        constructor_args: &[DynSolValue],
        abi: JsonAbi,
    ) -> DeployResult<ContractHandle> {
        self.deploy_until(
            name,
            sender,
            bytecode,
            constructor_args,
            abi,
            std::future::pending(),
        )
        .await
    }

    /// Like [`Self::deploy`], but stops early once `cancel` resolves.
    ///
    /// Submission and confirmation share one deadline of `wait.timeout`.
    pub async fn deploy_until<C>(
        &self,
        name: &str,
        sender: Address,
        bytecode: &[u8],
        constructor_args: &[DynSolValue],
        abi: JsonAbi,
        cancel: C,
    ) -> DeployResult<ContractHandle>
    where
        C: Future<Output = ()>,
    {
        let started = Instant::now();
        let deadline = started + self.wait.timeout;
        tokio::pin!(cancel);

        tracing::info!(%sender, "deploying {name}");
        let tx_hash = bounded(
            "eth_sendTransaction",
            started,
            deadline,
            cancel.as_mut(),
            submit::submit_deployment(self.rpc, sender, bytecode, constructor_args),
        )
        .await?;
        tracing::info!(%tx_hash, "waiting for tx to be mined");

        let mut wait = self.wait.clone();
        wait.timeout = deadline.saturating_duration_since(Instant::now());
        let receipt = ConfirmationWaiter::new(self.rpc, wait)
            .wait_for_receipt_until(tx_hash, cancel.as_mut())
            .await?;
        let addr = created_address(&receipt)?;

        tracing::info!("deployed {name} at {addr:#x}");
        Ok(ContractHandle::new(addr, abi))
    }

    /// Deploy a compiled artifact from the node's first account.
    pub async fn deploy_artifact(
        &self,
        artifact: &Artifact,
        constructor_args: &[DynSolValue],
    ) -> DeployResult<ContractHandle> {
        let sender = within(
            "eth_accounts",
            self.wait.timeout,
            submit::default_account(self.rpc),
        )
        .await?;
        self.deploy(
            &artifact.contract_name,
            sender,
            &artifact.bytecode,
            constructor_args,
            artifact.abi.clone(),
        )
        .await
    }

    /// Deploy the lending pool, which takes no constructor arguments.
    pub async fn deploy_lending_pool(&self, artifact: &Artifact) -> DeployResult<ContractHandle> {
        self.deploy_artifact(artifact, &[]).await
    }
}

/// Await `fut` for at most `timeout`.
///
/// `method` names the rpc call `fut` performs and decides the error's phase.
pub async fn within<T, F>(method: &str, timeout: Duration, fut: F) -> DeployResult<T>
where
    F: Future<Output = DeployResult<T>>,
{
    let started = Instant::now();
    bounded(
        method,
        started,
        started + timeout,
        std::future::pending::<()>(),
        fut,
    )
    .await
}

async fn bounded<T, C, F>(
    method: &str,
    started: Instant,
    deadline: Instant,
    cancel: C,
    fut: F,
) -> DeployResult<T>
where
    C: Future<Output = ()>,
    F: Future<Output = DeployResult<T>>,
{
    let gave_up = |cancelled: bool| {
        let elapsed = started.elapsed();
        tracing::warn!(method, ?elapsed, cancelled, "stopped waiting for rpc answer");
        DeployError::Deadline {
            method: method.to_string(),
            elapsed,
            cancelled,
        }
    };
    tokio::select! {
        biased;
        _ = cancel => Err(gave_up(true)),
        _ = sleep_until(deadline) => Err(gave_up(false)),
        res = fut => res,
    }
}

/// Address created by a successful creation transaction.
pub fn created_address(receipt: &Receipt) -> DeployResult<Address> {
    if !receipt.is_success() {
        return Err(DeployError::TransactionReverted(Box::new(receipt.clone())));
    }
    receipt.contract_address.ok_or_else(|| {
        DeployError::InternalInconsistency(format!(
            "successful creation tx {} carries no contract address",
            receipt.transaction_hash
        ))
    })
}

/// Pool balance and one account's deposit at the time of the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSummary {
    pub pool: Address,
    pub pool_balance: U256,
    pub account: Address,
    pub deposit: DepositRecord,
}

impl fmt::Display for PoolSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pool {}", self.pool)?;
        writeln!(f, "Pool balance: {} ETH", format_ether(self.pool_balance))?;
        writeln!(
            f,
            "Deposited by {}: {} ETH",
            self.account,
            format_ether(self.deposit.amount)
        )?;
        write!(f, "Deposited at (unix): {}", self.deposit.deposited_at)
    }
}

/// Read the pool balance and `account`'s deposit concurrently, giving up
/// after `timeout`.
pub async fn pool_summary<R: RpcClient>(
    rpc: &R,
    handle: &ContractHandle,
    account: Address,
    timeout: Duration,
) -> DeployResult<PoolSummary> {
    let reads = try_join(
        reader::pool_balance(rpc, handle),
        reader::deposit_of(rpc, handle, account),
    );
    let (pool_balance, deposit) = within("eth_call", timeout, reads).await?;
    tracing::debug!(pool = %handle.address(), %account, %pool_balance, "read pool state");
    Ok(PoolSummary {
        pool: handle.address(),
        pool_balance,
        account,
        deposit,
    })
}
