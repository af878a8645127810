//! alloy-backed [`ChainAccess`] implementation

use super::fees::{self, FeeParams};
use super::{ChainAccess, ContractCall, SignedTransaction};
use crate::config::{ConfirmationSettings, NetworkDescriptor};
use crate::tokens::MAX_APPROVAL;
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::consensus::{Eip658Value, TxReceipt};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// One account's connection to one network
pub struct ChainClient {
    provider: DynProvider,
    wallet: Arc<SecureWallet>,
    network: NetworkDescriptor,
    confirmation: ConfirmationSettings,
    decimals_cache: RwLock<HashMap<Address, u8>>,
}

impl ChainClient {
    /// Connect to a random endpoint from the descriptor's RPC list
    pub fn new(
        wallet: Arc<SecureWallet>,
        network: NetworkDescriptor,
        confirmation: ConfirmationSettings,
    ) -> Result<Self> {
        let rpc_url = network
            .rpc_urls
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| Error::Config(format!("No RPC endpoints for {}", network.name)))?;

        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();

        tracing::debug!(
            address = %wallet,
            chain_id = network.chain_id,
            rpc_url = %rpc_url,
            "Chain client initialized"
        );

        Ok(Self {
            provider,
            wallet,
            network,
            confirmation,
            decimals_cache: RwLock::new(HashMap::new()),
        })
    }

    /// Read-only `eth_call` returning the first 32-byte word
    async fn call_word(&self, to: Address, data: Vec<u8>, context: &str) -> Result<[u8; 32]> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(Bytes::from(data));

        let result = self
            .provider
            .call(tx)
            .await
            .map_err(|e| Error::rpc(context, e))?;

        if result.len() < 32 {
            return Err(Error::Rpc(format!(
                "{}: short return data ({} bytes) from {}",
                context,
                result.len(),
                to
            )));
        }

        let mut word = [0u8; 32];
        word.copy_from_slice(&result[..32]);
        Ok(word)
    }

    async fn allowance(&self, token: Address, spender: Address) -> Result<U256> {
        let data = IERC20::allowanceCall {
            owner: self.address(),
            spender,
        }
        .abi_encode();
        let word = self
            .call_word(token, data, "Failed to get allowance")
            .await?;
        Ok(U256::from_be_bytes(word))
    }

    /// Fetch nonce, fees and gas limit, then sign
    ///
    /// Nothing is broadcast until [`ChainClient::submit`].
    pub async fn build_and_sign_transaction(&self, call: &ContractCall) -> Result<SignedTransaction> {
        let from = self.address();

        let nonce = self
            .provider
            .get_transaction_count(from)
            .await
            .map_err(|e| Error::rpc("Failed to get nonce", e))?;

        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| Error::rpc("Failed to get gas price", e))?;

        let suggested_priority_fee = if self.network.eip1559 {
            Some(
                self.provider
                    .get_max_priority_fee_per_gas()
                    .await
                    .map_err(|e| Error::rpc("Failed to get priority fee", e))?,
            )
        } else {
            None
        };

        let fee_params = fees::compute_fees(
            self.network.chain_id,
            self.network.eip1559,
            gas_price,
            suggested_priority_fee,
        );

        let mut tx = TransactionRequest::default()
            .with_from(from)
            .with_to(call.to)
            .with_input(call.data.clone())
            .with_value(call.value)
            .with_nonce(nonce)
            .with_chain_id(self.network.chain_id);

        tx = match fee_params {
            FeeParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => tx
                .with_max_fee_per_gas(max_fee_per_gas)
                .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
            FeeParams::Legacy { gas_price } => tx.with_gas_price(gas_price),
        };

        let estimate = self
            .provider
            .estimate_gas(tx.clone())
            .await
            .map_err(|e| Error::rpc("Failed to estimate gas", e))?;
        let gas_limit =
            fees::scale_gas_limit(estimate, self.confirmation.gas_limit_multiplier_percent);
        tx = tx.with_gas_limit(gas_limit);

        tracing::debug!(
            address = %self.wallet,
            nonce,
            gas_limit,
            fees = ?fee_params,
            "Signing transaction"
        );

        let envelope = tx
            .build(self.wallet.wallet())
            .await
            .map_err(|e| Error::Wallet(format!("Failed to sign transaction: {}", e)))?;

        Ok(SignedTransaction {
            hash: *envelope.tx_hash(),
            raw: Bytes::from(envelope.encoded_2718()),
        })
    }

    /// Broadcast a signed transaction
    pub async fn submit(&self, signed: SignedTransaction) -> Result<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&signed.raw)
            .await
            .map_err(|e| Error::rpc("Transaction rejected", e))?;
        let tx_hash = *pending.tx_hash();

        tracing::info!(
            address = %self.wallet,
            tx_hash = %tx_hash,
            "Transaction sent: {}",
            self.network.tx_url(tx_hash)
        );

        Ok(tx_hash)
    }
}

/// Map a receipt's status field to a confirmation outcome
///
/// Pre-Byzantium receipts carry a state root instead of a status bit, which
/// none of the supported networks should produce.
pub(crate) fn confirmation_outcome(status: Eip658Value) -> Result<bool> {
    match status {
        Eip658Value::Eip658(success) => Ok(success),
        Eip658Value::PostState(root) => Err(Error::Rpc(format!(
            "Receipt carries post-state root {} instead of a status",
            root
        ))),
    }
}

#[async_trait]
impl ChainAccess for ChainClient {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    fn chain_id(&self) -> u64 {
        self.network.chain_id
    }

    async fn native_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.address())
            .await
            .map_err(|e| Error::rpc("Failed to get balance", e))
    }

    async fn token_balance(&self, token: Address) -> Result<U256> {
        let data = IERC20::balanceOfCall {
            owner: self.address(),
        }
        .abi_encode();
        let word = self
            .call_word(token, data, "Failed to get token balance")
            .await?;
        Ok(U256::from_be_bytes(word))
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        if let Some(decimals) = self.decimals_cache.read().await.get(&token) {
            return Ok(*decimals);
        }

        let word = self
            .call_word(token, IERC20::decimalsCall {}.abi_encode(), "Failed to get decimals")
            .await?;
        if word[..31].iter().any(|b| *b != 0) {
            return Err(Error::Rpc(format!("Token {} returned invalid decimals", token)));
        }
        let decimals = word[31];

        self.decimals_cache.write().await.insert(token, decimals);
        Ok(decimals)
    }

    async fn execute(&self, call: ContractCall) -> Result<TxHash> {
        let signed = self.build_and_sign_transaction(&call).await?;
        self.submit(signed).await
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<bool> {
        tokio::time::sleep(Duration::from_secs(self.confirmation.initial_delay_secs)).await;

        for attempt in 1..=self.confirmation.max_attempts {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| Error::rpc("Failed to get receipt", e))?;

            match receipt {
                Some(receipt) => {
                    let success = confirmation_outcome(receipt.inner.status_or_post_state())?;
                    if success {
                        tracing::info!(tx_hash = %tx_hash, "Transaction confirmed");
                    } else {
                        tracing::error!(tx_hash = %tx_hash, "Transaction reverted");
                    }
                    return Ok(success);
                }
                None => {
                    tracing::debug!(tx_hash = %tx_hash, attempt, "Transaction pending");
                    if attempt < self.confirmation.max_attempts {
                        tokio::time::sleep(Duration::from_secs(
                            self.confirmation.poll_interval_secs,
                        ))
                        .await;
                    }
                }
            }
        }

        tracing::warn!(
            tx_hash = %tx_hash,
            attempts = self.confirmation.max_attempts,
            "No receipt within polling budget, status unknown"
        );
        Ok(false)
    }

    async fn approve_spending(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<bool> {
        let current = self.allowance(token, spender).await?;
        if current >= amount {
            tracing::info!(
                address = %self.wallet,
                token = %token,
                spender = %spender,
                "Allowance already sufficient"
            );
            return Ok(true);
        }

        let data = IERC20::approveCall {
            spender,
            amount: MAX_APPROVAL,
        }
        .abi_encode();
        let tx_hash = self
            .execute(ContractCall {
                to: token,
                data: data.into(),
                value: U256::ZERO,
            })
            .await?;

        self.await_confirmation(tx_hash).await
    }
}
