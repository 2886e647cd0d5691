//! Scripted in-memory node for unit tests.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, TxHash, U256, address, b256, hex},
};
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{error::RpcError, reader::lending_pool_abi, rpc::RpcClient};

pub const SENDER: Address = address!("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
pub const DEPLOYED: Address = address!("0xabc0000000000000000000000000000000000abc");
pub const TX_HASH: TxHash =
    b256!("0x1111111111111111111111111111111111111111111111111111111111111111");

/// Selector of a lending pool function.
pub fn selector(name: &str) -> [u8; 4] {
    lending_pool_abi().unwrap().function(name).unwrap()[0]
        .selector()
        .0
}

/// ABI-encoded sequence of uint256 words.
pub fn uints(values: &[u128]) -> Vec<u8> {
    DynSolValue::Tuple(
        values
            .iter()
            .map(|v| DynSolValue::Uint(U256::from(*v), 256))
            .collect(),
    )
    .abi_encode_params()
}

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Success,
    /// Success status without a contract address
    SuccessNoAddress,
    Failure,
    /// Never mined
    Pending,
    /// Receipt with a status the node should never report
    Malformed,
}

/// Answers the handful of JSON-RPC methods the workflow uses.
pub struct MockNode {
    pub accounts: Vec<Address>,
    pub outcome: Outcome,
    /// `eth_getTransactionReceipt` answers `null` this many times before the receipt shows up
    pub pending_polls: usize,
    /// receipt polls that fail at the transport level before any other answer
    pub flaky_polls: AtomicUsize,
    /// `eth_sendTransaction` answers with this node error when set
    pub reject_send: Option<(i64, String)>,
    /// `eth_sendTransaction` never answers
    pub hang_send: bool,
    /// `eth_getTransactionReceipt` answers with this node error when set
    pub fail_receipt: Option<(i64, String)>,
    /// `eth_call` never answers
    pub hang_calls: bool,
    /// return data keyed by 4-byte selector
    pub call_results: HashMap<[u8; 4], Bytes>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    receipt_polls: AtomicUsize,
}

impl MockNode {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            accounts: vec![SENDER],
            outcome,
            pending_polls: 0,
            flaky_polls: AtomicUsize::new(0),
            reject_send: None,
            hang_send: false,
            fail_receipt: None,
            hang_calls: false,
            call_results: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            receipt_polls: AtomicUsize::new(0),
        }
    }

    pub fn with_call_result(mut self, selector: [u8; 4], data: impl Into<Bytes>) -> Self {
        self.call_results.insert(selector, data.into());
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    fn receipt(&self) -> Value {
        let polls = self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        if polls < self.pending_polls {
            return Value::Null;
        }
        match self.outcome {
            Outcome::Pending => Value::Null,
            Outcome::Success => json!({
                "transactionHash": TX_HASH,
                "status": "0x1",
                "contractAddress": DEPLOYED,
                "blockNumber": "0x1",
            }),
            Outcome::SuccessNoAddress => json!({
                "transactionHash": TX_HASH,
                "status": "0x1",
                "contractAddress": null,
                "blockNumber": "0x1",
            }),
            Outcome::Failure => json!({
                "transactionHash": TX_HASH,
                "status": "0x0",
                "contractAddress": null,
                "blockNumber": "0x1",
            }),
            Outcome::Malformed => json!({
                "transactionHash": TX_HASH,
                "status": "0x7",
                "contractAddress": DEPLOYED,
                "blockNumber": "0x1",
            }),
        }
    }

    fn eth_call(&self, params: &[Value]) -> Result<Value, RpcError> {
        let data = params
            .first()
            .and_then(|tx| tx.get("data"))
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::Malformed("eth_call without data".into()))?;
        let data = hex::decode(data).map_err(|e| RpcError::Malformed(e.to_string()))?;
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| RpcError::Malformed("calldata shorter than a selector".into()))?;
        match self.call_results.get(&selector) {
            Some(ret) => Ok(json!(ret)),
            None => Err(RpcError::Node {
                code: 3,
                message: "execution reverted".into(),
            }),
        }
    }
}

#[async_trait]
impl RpcClient for MockNode {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));
        match method {
            "eth_accounts" => Ok(json!(self.accounts)),
            "eth_sendTransaction" if self.hang_send => std::future::pending().await,
            "eth_sendTransaction" => match &self.reject_send {
                Some((code, message)) => Err(RpcError::Node {
                    code: *code,
                    message: message.clone(),
                }),
                None => Ok(json!(TX_HASH)),
            },
            "eth_getTransactionReceipt" => {
                let flaky = self.flaky_polls.load(Ordering::SeqCst);
                if flaky > 0 {
                    self.flaky_polls.store(flaky - 1, Ordering::SeqCst);
                    return Err(RpcError::Transport("connection reset".into()));
                }
                match &self.fail_receipt {
                    Some((code, message)) => Err(RpcError::Node {
                        code: *code,
                        message: message.clone(),
                    }),
                    None => Ok(self.receipt()),
                }
            }
            "eth_call" if self.hang_calls => std::future::pending().await,
            "eth_call" => self.eth_call(&params),
            other => Err(RpcError::Node {
                code: -32601,
                message: format!("method {other} not found"),
            }),
        }
    }
}
