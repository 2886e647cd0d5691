//! Error types shared by every stage of the deployment workflow.

use std::{fmt, time::Duration};

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::types::Receipt;

/// Failure of a single JSON-RPC round trip.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The node could not be reached or the connection broke mid-request.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The node answered with something that is not a valid response.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// The node answered with a JSON-RPC error object.
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },
}

/// Workflow phase a [`DeployError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AccountLookup,
    Submission,
    Confirmation,
    Query,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::AccountLookup => f.write_str("account lookup"),
            Phase::Submission => f.write_str("submission"),
            Phase::Confirmation => f.write_str("confirmation"),
            Phase::Query => f.write_str("query"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("rpc call {method} failed")]
    Transport {
        method: String,
        #[source]
        source: RpcError,
    },

    #[error("node manages no accounts")]
    NoAccounts,

    /// `code` is the node's error code, absent when rejected before sending.
    #[error("transaction rejected: {message}")]
    Submission { code: Option<i64>, message: String },

    #[error("transaction reverted: {0}")]
    TransactionReverted(Box<Receipt>),

    #[error("no receipt for {hash} after {elapsed:?}{}", cancel_note(.cancelled))]
    ConfirmationTimeout {
        hash: TxHash,
        elapsed: Duration,
        cancelled: bool,
    },

    /// A submission or read did not finish before the deadline or cancellation.
    #[error("{method} gave no answer after {elapsed:?}{}", cancel_note(.cancelled))]
    Deadline {
        method: String,
        elapsed: Duration,
        cancelled: bool,
    },

    #[error("call to {method} failed: {reason}")]
    Call { method: String, reason: String },

    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

impl DeployError {
    pub(crate) fn transport(method: &str, source: RpcError) -> Self {
        Self::Transport {
            method: method.to_string(),
            source,
        }
    }

    pub(crate) fn call(method: &str, reason: impl ToString) -> Self {
        Self::Call {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The workflow phase that failed.
    ///
    /// Transport and deadline errors are attributed by the rpc method involved.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Transport { method, .. } | Self::Deadline { method, .. } => method_phase(method),
            Self::NoAccounts => Phase::AccountLookup,
            Self::Submission { .. } => Phase::Submission,
            Self::TransactionReverted(_)
            | Self::ConfirmationTimeout { .. }
            | Self::InternalInconsistency(_) => Phase::Confirmation,
            Self::Call { .. } => Phase::Query,
        }
    }
}

fn method_phase(method: &str) -> Phase {
    match method {
        "eth_accounts" => Phase::AccountLookup,
        "eth_sendTransaction" => Phase::Submission,
        "eth_getTransactionReceipt" => Phase::Confirmation,
        _ => Phase::Query,
    }
}

fn cancel_note(cancelled: &bool) -> &'static str {
    if *cancelled { " (cancelled)" } else { "" }
}

pub type DeployResult<T> = Result<T, DeployError>;
