//! Contract deployment and lending pool state queries over JSON-RPC.
//!
//! The workflow is split into a submitter, a polling confirmation waiter and a
//! state reader, each taking its [`RpcClient`] explicitly, and a [`Deployer`]
//! that sequences them.

pub mod artifact;
pub mod confirm;
pub mod deployer;
pub mod error;
pub mod provider;
pub mod reader;
pub mod rpc;
pub mod submit;
pub mod types;
pub mod units;

#[cfg(test)]
mod testing;

pub use confirm::{ConfirmationWaiter, WaitConfig};
pub use deployer::{Deployer, PoolSummary, pool_summary};
pub use error::{DeployError, DeployResult, Phase, RpcError};
pub use rpc::{NodeClient, RpcClient};
pub use types::*;
