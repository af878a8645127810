//! Recording test doubles for the API and chain seams

use crate::api::{
    Calculation, ClaimRequest, DepositRequest, RouterSimulationRequest, SafariReward,
    SimulationRequest, SimulationResult, TransactionDescriptor, VaultApi, VaultPosition,
    WithdrawalRequest,
};
use crate::chain::{ChainAccess, ContractCall};
use crate::tokens::addresses::SUPERFORM_ROUTER;
use crate::{Error, Result};
use alloy::primitives::{address, Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) const TEST_ADDRESS: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

/// Vault API double returning canned answers and recording requests
pub(crate) struct MockApi {
    calls: AtomicUsize,
    portfolio: HashMap<String, VaultPosition>,
    descriptor: Value,
    simulation: Vec<SimulationResult>,
    router_simulation: SimulationResult,
    rewards: Value,
    fail_with: Option<fn() -> Error>,
    last_withdrawal: Mutex<Option<WithdrawalRequest>>,
    last_simulation: Mutex<Option<SimulationRequest>>,
    last_router_simulation: Mutex<Option<RouterSimulationRequest>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            portfolio: HashMap::new(),
            descriptor: json!({
                "to": SUPERFORM_ROUTER,
                "data": "0xabcd",
                "value": "0",
                "approvalData": ""
            }),
            simulation: vec![SimulationResult::from_entry(json!({"success": true}))],
            router_simulation: SimulationResult::from_entry(json!({"success": true})),
            rewards: json!([]),
            fail_with: None,
            last_withdrawal: Mutex::new(None),
            last_simulation: Mutex::new(None),
            last_router_simulation: Mutex::new(None),
        }
    }

    pub fn with_position(mut self, vault_id: &str, balance: U256) -> Self {
        self.portfolio.insert(
            vault_id.to_string(),
            VaultPosition {
                vault_id: vault_id.to_string(),
                chain_id: 8453,
                balance,
                is_erc20: false,
                usd_value: 1.0,
            },
        );
        self
    }

    pub fn with_descriptor(mut self, descriptor: Value) -> Self {
        self.descriptor = descriptor;
        self
    }

    pub fn with_simulation(mut self, results: Vec<SimulationResult>) -> Self {
        self.simulation = results;
        self
    }

    pub fn with_router_simulation(mut self, result: SimulationResult) -> Self {
        self.router_simulation = result;
        self
    }

    pub fn with_rewards(mut self, rewards: Value) -> Self {
        self.rewards = rewards;
        self
    }

    /// Every call fails with the produced error
    pub fn failing(mut self, error: fn() -> Error) -> Self {
        self.fail_with = Some(error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_withdrawal(&self) -> Option<WithdrawalRequest> {
        self.last_withdrawal.lock().unwrap().clone()
    }

    pub fn last_simulation(&self) -> Option<SimulationRequest> {
        self.last_simulation.lock().unwrap().clone()
    }

    pub fn last_router_simulation(&self) -> Option<RouterSimulationRequest> {
        self.last_router_simulation.lock().unwrap().clone()
    }

    fn record(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_with {
            Some(error) => Err(error()),
            None => Ok(()),
        }
    }

    fn descriptor(&self) -> Result<TransactionDescriptor> {
        Ok(serde_json::from_value(self.descriptor.clone())?)
    }

    fn calculation() -> Calculation {
        Calculation(json!({"in": {"superFormId": "6277101738"}}))
    }
}

#[async_trait]
impl VaultApi for MockApi {
    async fn calculate_deposit(&self, _request: &DepositRequest) -> Result<Calculation> {
        self.record()?;
        Ok(Self::calculation())
    }

    async fn calculate_withdrawal(&self, request: &WithdrawalRequest) -> Result<Calculation> {
        self.record()?;
        *self.last_withdrawal.lock().unwrap() = Some(request.clone());
        Ok(Self::calculation())
    }

    async fn start_deposit(&self, _calculation: &Calculation) -> Result<TransactionDescriptor> {
        self.record()?;
        self.descriptor()
    }

    async fn start_withdrawal(&self, _calculation: &Calculation) -> Result<TransactionDescriptor> {
        self.record()?;
        self.descriptor()
    }

    async fn simulate_operation(
        &self,
        request: &SimulationRequest,
    ) -> Result<Vec<SimulationResult>> {
        self.record()?;
        *self.last_simulation.lock().unwrap() = Some(request.clone());
        Ok(self.simulation.clone())
    }

    async fn simulate_router(&self, request: &RouterSimulationRequest) -> Result<SimulationResult> {
        self.record()?;
        *self.last_router_simulation.lock().unwrap() = Some(request.clone());
        Ok(self.router_simulation.clone())
    }

    async fn get_portfolio(&self, _address: Address) -> Result<HashMap<String, VaultPosition>> {
        self.record()?;
        Ok(self.portfolio.clone())
    }

    async fn get_safari_rewards(&self, _address: Address, _season: u32) -> Result<Vec<SafariReward>> {
        self.record()?;
        Ok(serde_json::from_value(self.rewards.clone())?)
    }

    async fn claim_rewards(&self, _request: &ClaimRequest) -> Result<TransactionDescriptor> {
        self.record()?;
        self.descriptor()
    }
}

/// Chain double holding balances in memory and recording sent calls
pub(crate) struct MockChain {
    native_balance: U256,
    tokens: HashMap<Address, (U256, u8)>,
    allowance: Mutex<U256>,
    confirm: bool,
    executed: Mutex<Vec<ContractCall>>,
    approval_requests: Mutex<Vec<(Address, Address, U256)>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            native_balance: U256::ZERO,
            tokens: HashMap::new(),
            allowance: Mutex::new(U256::ZERO),
            confirm: true,
            executed: Mutex::new(Vec::new()),
            approval_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_native_balance(mut self, balance: U256) -> Self {
        self.native_balance = balance;
        self
    }

    pub fn with_token(mut self, token: Address, balance: U256, decimals: u8) -> Self {
        self.tokens.insert(token, (balance, decimals));
        self
    }

    pub fn with_allowance(self, allowance: U256) -> Self {
        *self.allowance.lock().unwrap() = allowance;
        self
    }

    /// Outcome reported for every confirmation
    pub fn with_confirmation(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn executed(&self) -> Vec<ContractCall> {
        self.executed.lock().unwrap().clone()
    }

    pub fn approval_requests(&self) -> Vec<(Address, Address, U256)> {
        self.approval_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainAccess for MockChain {
    fn address(&self) -> Address {
        TEST_ADDRESS
    }

    fn chain_id(&self) -> u64 {
        8453
    }

    async fn native_balance(&self) -> Result<U256> {
        Ok(self.native_balance)
    }

    async fn token_balance(&self, token: Address) -> Result<U256> {
        Ok(self.tokens.get(&token).map(|(b, _)| *b).unwrap_or_default())
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        self.tokens
            .get(&token)
            .map(|(_, d)| *d)
            .ok_or_else(|| Error::Rpc(format!("Unknown token {}", token)))
    }

    async fn execute(&self, call: ContractCall) -> Result<TxHash> {
        let mut executed = self.executed.lock().unwrap();
        executed.push(call);
        Ok(TxHash::with_last_byte(executed.len() as u8))
    }

    async fn await_confirmation(&self, _tx_hash: TxHash) -> Result<bool> {
        Ok(self.confirm)
    }

    async fn approve_spending(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<bool> {
        self.approval_requests
            .lock()
            .unwrap()
            .push((token, spender, amount));

        if *self.allowance.lock().unwrap() >= amount {
            return Ok(true);
        }
        self.execute(ContractCall {
            to: token,
            data: Bytes::from_static(&[0x09, 0x5e, 0xa7, 0xb3]),
            value: U256::ZERO,
        })
        .await?;
        *self.allowance.lock().unwrap() = U256::MAX;
        Ok(self.confirm)
    }
}
