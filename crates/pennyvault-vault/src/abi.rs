//! Vault contract bindings

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use pennyvault_types::{PennyVaultError, Result};

sol! {
    /// Payable vault crediting each sender
    interface ISavingsVault {
        function deposit() external payable;
        function getBalance(address owner) external view returns (uint256 balance);
    }
}

/// Calldata for `deposit()`
pub fn encode_deposit() -> Bytes {
    ISavingsVault::depositCall {}.abi_encode().into()
}

/// Calldata for `getBalance(owner)`
pub fn encode_get_balance(owner: Address) -> Bytes {
    ISavingsVault::getBalanceCall { owner }.abi_encode().into()
}

/// Decode the `getBalance` return value
pub fn decode_balance(data: &[u8]) -> Result<U256> {
    ISavingsVault::getBalanceCall::abi_decode_returns(data, true)
        .map(|ret| ret.balance)
        .map_err(|e| PennyVaultError::decode(e.to_string()))
}
