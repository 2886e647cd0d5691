//! Read-only calls against deployed contracts

use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt},
    json_abi::JsonAbi,
    primitives::{Address, Bytes, U256},
};
use serde_json::json;

use crate::{
    error::{DeployError, DeployResult, RpcError},
    rpc::RpcClient,
    types::{ContractHandle, DepositRecord},
};

/// Read-only interface of the lending pool contract.
pub const LENDING_POOL_INTERFACE: &[&str] = &[
    "function getPoolBalance() view returns (uint256)",
    "function deposits(address) view returns (uint256 amount, uint256 depositedAt)",
];

pub fn lending_pool_abi() -> DeployResult<JsonAbi> {
    JsonAbi::parse(LENDING_POOL_INTERFACE.iter().copied()).map_err(|err| {
        DeployError::InternalInconsistency(format!("invalid lending pool interface: {err}"))
    })
}

/// Call `method` on `handle` at the latest block and decode its outputs.
///
/// Overloads are resolved by argument count.
pub async fn read_field<R: RpcClient>(
    rpc: &R,
    handle: &ContractHandle,
    method: &str,
    args: &[DynSolValue],
) -> DeployResult<Vec<DynSolValue>> {
    let function = handle
        .abi()
        .function(method)
        .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == args.len()))
        .ok_or_else(|| {
            DeployError::call(
                method,
                format!("interface has no {method} taking {} arguments", args.len()),
            )
        })?;
    let calldata = function
        .abi_encode_input(args)
        .map_err(|err| DeployError::call(method, err))?;

    let request = json!({
        "to": handle.address(),
        "data": Bytes::from(calldata),
    });
    let value = rpc
        .call("eth_call", vec![request, json!("latest")])
        .await
        .map_err(|err| match err {
            // reverts come back as node errors
            RpcError::Node { message, .. } => DeployError::call(method, message),
            err => DeployError::transport("eth_call", err),
        })?;
    let data: Bytes = serde_json::from_value(value)
        .map_err(|err| DeployError::call(method, format!("undecodable return data: {err}")))?;

    function
        .abi_decode_output(&data)
        .map_err(|err| DeployError::call(method, err))
}

/// Aggregate balance held by the pool, in wei.
pub async fn pool_balance<R: RpcClient>(rpc: &R, handle: &ContractHandle) -> DeployResult<U256> {
    let method = "getPoolBalance";
    let outputs = read_field(rpc, handle, method, &[]).await?;
    uint_output(method, &outputs, 0)
}

/// Deposit record of `account`; all zero when it never deposited.
pub async fn deposit_of<R: RpcClient>(
    rpc: &R,
    handle: &ContractHandle,
    account: Address,
) -> DeployResult<DepositRecord> {
    let method = "deposits";
    let outputs = read_field(rpc, handle, method, &[DynSolValue::Address(account)]).await?;
    let amount = uint_output(method, &outputs, 0)?;
    let deposited_at = uint_output(method, &outputs, 1)?;
    if deposited_at > U256::from(u64::MAX) {
        return Err(DeployError::call(
            method,
            format!("depositedAt {deposited_at} is not a unix timestamp"),
        ));
    }
    Ok(DepositRecord {
        amount,
        deposited_at: deposited_at.to::<u64>(),
    })
}

fn uint_output(method: &str, outputs: &[DynSolValue], index: usize) -> DeployResult<U256> {
    match outputs.get(index) {
        Some(DynSolValue::Uint(value, _)) => Ok(*value),
        other => Err(DeployError::call(
            method,
            format!("expected uint output at {index}, got {other:?}"),
        )),
    }
}
