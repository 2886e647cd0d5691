//! Contract-creation transaction submission

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes, TxHash},
};
use serde_json::{Value, json};

use crate::{
    error::{DeployError, DeployResult, RpcError},
    rpc::RpcClient,
};

/// Accounts managed (and unlocked) by the node.
pub async fn accounts<R: RpcClient>(rpc: &R) -> DeployResult<Vec<Address>> {
    let method = "eth_accounts";
    let value = rpc
        .call(method, vec![])
        .await
        .map_err(|err| DeployError::transport(method, err))?;
    decode(method, value)
}

/// First account managed by the node, used as deployer when none is given.
pub async fn default_account<R: RpcClient>(rpc: &R) -> DeployResult<Address> {
    accounts(rpc)
        .await?
        .first()
        .copied()
        .ok_or(DeployError::NoAccounts)
}

/// Creation code followed by the ABI-encoded constructor arguments.
pub fn creation_data(bytecode: &[u8], constructor_args: &[DynSolValue]) -> Bytes {
    let mut data = bytecode.to_vec();
    if !constructor_args.is_empty() {
        data.extend(DynSolValue::Tuple(constructor_args.to_vec()).abi_encode_params());
    }
    data.into()
}

/// Broadcast one contract-creation transaction from `sender`.
///
/// Every call sends a new transaction; callers that retry deploy twice.
pub async fn submit_deployment<R: RpcClient>(
    rpc: &R,
    sender: Address,
    bytecode: &[u8],
    constructor_args: &[DynSolValue],
) -> DeployResult<TxHash> {
    if bytecode.is_empty() {
        return Err(DeployError::Submission {
            code: None,
            message: "empty creation bytecode".to_string(),
        });
    }
    let method = "eth_sendTransaction";
    let tx = json!({
        "from": sender,
        "data": creation_data(bytecode, constructor_args),
    });
    let value = rpc.call(method, vec![tx]).await.map_err(|err| match err {
        RpcError::Node { code, message } => DeployError::Submission {
            code: Some(code),
            message,
        },
        err => DeployError::transport(method, err),
    })?;
    decode(method, value)
}

fn decode<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> DeployResult<T> {
    serde_json::from_value(value)
        .map_err(|err| DeployError::transport(method, RpcError::Malformed(err.to_string())))
}
