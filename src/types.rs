//! Domain types for deployments and contract state

use std::fmt;

use alloy::{
    json_abi::JsonAbi,
    primitives::{Address, TxHash, U64, U256},
};
use serde::Deserialize;
use serde_json::Value;

/// Outcome of an included transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

/// Network-confirmed record of a transaction.
///
/// A `Failure` receipt never carries a contract address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub status: ReceiptStatus,
    pub contract_address: Option<Address>,
    pub block_number: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptFields {
    transaction_hash: TxHash,
    status: Option<U64>,
    contract_address: Option<Address>,
    block_number: Option<U64>,
}

impl Receipt {
    /// Decode an `eth_getTransactionReceipt` result; `null` means not yet mined.
    pub fn from_rpc(value: Value) -> Result<Option<Self>, String> {
        if value.is_null() {
            return Ok(None);
        }
        let fields: ReceiptFields = serde_json::from_value(value).map_err(|e| e.to_string())?;
        let status = match fields.status.map(|s| s.to::<u64>()) {
            Some(1) => ReceiptStatus::Success,
            Some(0) => ReceiptStatus::Failure,
            Some(other) => return Err(format!("unknown receipt status {other}")),
            None => return Err("receipt has no status field".to_string()),
        };
        let block_number = fields
            .block_number
            .ok_or_else(|| "receipt has no block number".to_string())?
            .to::<u64>();
        // nodes report the would-be address for failed creations too
        let contract_address = match status {
            ReceiptStatus::Success => fields.contract_address,
            ReceiptStatus::Failure => None,
        };
        Ok(Some(Self {
            transaction_hash: fields.transaction_hash,
            status,
            contract_address,
            block_number,
        }))
    }

    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

impl fmt::Display for Receipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tx {} in block {} ({:?})",
            self.transaction_hash, self.block_number, self.status
        )
    }
}

/// A deployed contract together with the interface used to call it.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    address: Address,
    abi: JsonAbi,
}

impl ContractHandle {
    pub fn new(address: Address, abi: JsonAbi) -> Self {
        Self { address, abi }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }
}

/// Snapshot of one account's entry in the lending pool's `deposits` mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepositRecord {
    /// Amount in wei
    pub amount: U256,
    /// Unix timestamp, zero when the account never deposited
    pub deposited_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};
    use serde_json::json;

    const HASH: TxHash = b256!("0x6f1c3d2e4c5b8a9f0e1d2c3b4a5968778695a4b3c2d1e0f1a2b3c4d5e6f7a8b9");

    #[test]
    fn test_null_receipt_is_pending() {
        assert_eq!(Receipt::from_rpc(Value::Null), Ok(None));
    }

    #[test]
    fn test_success_receipt_keeps_address() {
        let receipt = Receipt::from_rpc(json!({
            "transactionHash": HASH,
            "status": "0x1",
            "contractAddress": "0xcf7ed3acca5a467e9e704c703e8d87f634fb0fc9",
            "blockNumber": "0x2a",
            "gasUsed": "0x5208",
        }))
        .unwrap()
        .unwrap();
        assert!(receipt.is_success());
        assert_eq!(receipt.block_number, 42);
        assert_eq!(
            receipt.contract_address,
            Some(address!("0xcf7ed3acca5a467e9e704c703e8d87f634fb0fc9"))
        );
    }

    #[test]
    fn test_failed_receipt_drops_address() {
        let receipt = Receipt::from_rpc(json!({
            "transactionHash": HASH,
            "status": "0x0",
            "contractAddress": "0xcf7ed3acca5a467e9e704c703e8d87f634fb0fc9",
            "blockNumber": "0x3",
        }))
        .unwrap()
        .unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Failure);
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn test_receipt_without_status_is_rejected() {
        let err = Receipt::from_rpc(json!({
            "transactionHash": HASH,
            "blockNumber": "0x3",
        }))
        .unwrap_err();
        assert!(err.contains("status"));
    }
}
