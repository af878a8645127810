//! Blockchain access for a single account on a single network
//!
//! [`ChainAccess`] is the seam the vault workflows talk to; [`ChainClient`] is
//! the alloy-backed implementation.

mod client;
pub mod fees;
pub mod units;

use crate::tokens;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;

pub use client::ChainClient;

/// A call to be signed and sent by the account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// A signed EIP-2718 envelope ready for broadcast
///
/// Not `Clone`: submitting consumes it.
#[derive(Debug)]
pub struct SignedTransaction {
    pub hash: TxHash,
    pub raw: Bytes,
}

#[async_trait]
pub trait ChainAccess: Send + Sync {
    /// Account address
    fn address(&self) -> Address;

    fn chain_id(&self) -> u64;

    async fn native_balance(&self) -> Result<U256>;

    async fn token_balance(&self, token: Address) -> Result<U256>;

    /// ERC-20 decimals, cached per token
    async fn decimals(&self, token: Address) -> Result<u8>;

    /// Build, sign and broadcast a call
    async fn execute(&self, call: ContractCall) -> Result<TxHash>;

    /// `true` on a successful receipt, `false` on revert or when no receipt
    /// shows up within the polling budget
    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<bool>;

    /// Ensure `spender` may move at least `amount` of `token`
    ///
    /// No transaction is sent when the allowance already covers `amount`.
    async fn approve_spending(&self, token: Address, spender: Address, amount: U256)
        -> Result<bool>;

    /// Balance of the native currency or of an ERC-20
    async fn balance_of(&self, token: Address) -> Result<U256> {
        if tokens::is_native(&token) {
            self.native_balance().await
        } else {
            self.token_balance(token).await
        }
    }

    /// Decimals of the native currency or of an ERC-20
    async fn decimals_of(&self, token: Address) -> Result<u8> {
        if tokens::is_native(&token) {
            Ok(18)
        } else {
            self.decimals(token).await
        }
    }

    async fn to_human_units(
        &self,
        amount: U256,
        decimals: Option<u8>,
        token: Option<Address>,
    ) -> Result<f64> {
        let decimals = match (decimals, token) {
            (Some(decimals), _) => decimals,
            (None, Some(token)) => self.decimals_of(token).await?,
            (None, None) => {
                return Err(Error::Config(
                    "Either decimals or a token address is required".to_string(),
                ))
            }
        };
        Ok(units::to_human_units(amount, decimals))
    }
}
