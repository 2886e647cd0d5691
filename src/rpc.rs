//! JSON-RPC client seam between the workflow and the node.

use alloy::{providers::Provider, transports::TransportError};
use async_trait::async_trait;
use serde_json::Value;

use crate::error::RpcError;

/// One request/response round trip with a node.
///
/// Implementations do not retry; retry policy belongs to callers.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError>;
}

/// [`RpcClient`] backed by an alloy [`Provider`].
#[derive(Debug, Clone)]
pub struct NodeClient<P> {
    provider: P,
}

impl<P: Provider> NodeClient<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P: Provider> RpcClient for NodeClient<P> {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        tracing::trace!(method, "rpc request");
        match self
            .provider
            .raw_request::<_, Value>(method.to_string().into(), params)
            .await
        {
            Ok(value) => Ok(value),
            Err(err) => classify(err),
        }
    }
}

fn classify(err: TransportError) -> Result<Value, RpcError> {
    if err.is_null_resp() {
        return Ok(Value::Null);
    }
    if let Some(payload) = err.as_error_resp() {
        return Err(RpcError::Node {
            code: payload.code,
            message: payload.message.to_string(),
        });
    }
    if err.is_ser_error() || err.is_deser_error() {
        Err(RpcError::Malformed(err.to_string()))
    } else {
        Err(RpcError::Transport(err.to_string()))
    }
}
