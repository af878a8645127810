use super::OperationStage;
use crate::api::{
    ApprovalCall, ClaimRequest, DepositRequest, RouterSimulationRequest, SimulationKind,
    SimulationRequest, SimulationResult, TransactionDescriptor, VaultApi, VaultPosition,
    WithdrawalRequest,
};
use crate::chain::{units, ChainAccess};
use crate::config::OperationSettings;
use crate::tokens;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use std::collections::HashMap;

/// `floor(balance * percent / 100)`, exact for any `U256` balance
pub fn withdrawal_amount(balance: U256, percent: u8) -> U256 {
    if percent >= 100 {
        return balance;
    }
    let percent = U256::from(percent);
    let hundred = U256::from(100u8);
    balance / hundred * percent + balance % hundred * percent / hundred
}

/// Deposits of ERC-20 tokens sometimes come back without approval data even
/// though the router needs an allowance; those are approved directly.
pub fn needs_manual_approval(token: &Address, has_approval_data: bool) -> bool {
    !tokens::is_native(token) && !has_approval_data
}

/// Runs vault operations for one account on one network
pub struct VaultOperationService<A, C> {
    api: A,
    chain: C,
    settings: OperationSettings,
}

impl<A: VaultApi, C: ChainAccess> VaultOperationService<A, C> {
    pub fn new(api: A, chain: C, settings: OperationSettings) -> Self {
        Self {
            api,
            chain,
            settings,
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Deposit `amount` (human units) of `token` into a vault
    ///
    /// Returns `Ok(false)` when a simulation rejects the transaction.
    pub async fn deposit_single_vault(
        &self,
        vault_id: &str,
        amount: f64,
        token: Address,
    ) -> Result<bool> {
        let decimals = self.chain.decimals_of(token).await?;
        let amount = units::to_minor_units(amount, decimals)?;
        self.deposit_minor_units(vault_id, amount, token).await
    }

    /// Deposit an exact amount of minor units of `token` into a vault
    pub async fn deposit_minor_units(
        &self,
        vault_id: &str,
        amount: U256,
        token: Address,
    ) -> Result<bool> {
        tracing::info!(
            address = %self.chain.address(),
            vault_id,
            amount = %amount,
            token = %tokens::registry().label(&token),
            "Depositing into vault"
        );
        let outcome = self.deposit(vault_id, amount, token).await;
        self.settle(vault_id, outcome)
    }

    /// Withdraw `percent` of the position held in a vault into `token`
    ///
    /// A missing position or a dust-sized amount counts as already withdrawn.
    pub async fn withdraw_single_vault(
        &self,
        vault_id: &str,
        percent: u8,
        token: Address,
    ) -> Result<bool> {
        if !(1..=100).contains(&percent) {
            return Err(Error::InvalidArgument(format!(
                "Withdrawal percent must be within 1..=100, got {}",
                percent
            )));
        }
        tracing::info!(
            address = %self.chain.address(),
            vault_id,
            percent,
            "Withdrawing from vault"
        );
        let outcome = self.withdraw(vault_id, percent, token).await;
        self.settle(vault_id, outcome)
    }

    /// Claim every claimable reward of a season
    pub async fn claim_rewards(&self, season: u32) -> Result<bool> {
        tracing::info!(address = %self.chain.address(), season, "Claiming rewards");
        let outcome = self.claim(season).await;
        self.settle("rewards", outcome)
    }

    pub async fn get_portfolio(&self) -> Result<HashMap<String, VaultPosition>> {
        self.api.get_portfolio(self.chain.address()).await
    }

    fn settle(&self, vault_id: &str, outcome: Result<bool>) -> Result<bool> {
        match outcome {
            Err(Error::SimulationFailed(reason)) => {
                tracing::error!(
                    address = %self.chain.address(),
                    vault_id,
                    stage = %OperationStage::Failed,
                    "Simulation error: {}",
                    reason
                );
                Ok(false)
            }
            other => other,
        }
    }

    async fn deposit(&self, vault_id: &str, amount_minor: U256, token: Address) -> Result<bool> {
        let address = self.chain.address();
        tracing::debug!(vault_id, stage = %OperationStage::Calculating);

        let decimals = self.chain.decimals_of(token).await?;
        let balance = self.chain.balance_of(token).await?;
        if balance < amount_minor {
            return Err(Error::InsufficientFunds {
                required: units::format_units(amount_minor, decimals),
                available: units::format_units(balance, decimals),
            });
        }
        let amount = units::to_human_units(amount_minor, decimals);

        let request = DepositRequest {
            user_address: address,
            from_token_address: token,
            from_chain_id: self.chain.chain_id(),
            amount_in: amount,
            refund_address: address,
            vault_id: vault_id.to_string(),
            bridge_slippage: self.settings.bridge_slippage,
            swap_slippage: self.settings.swap_slippage,
            route_type: self.settings.route_type.clone(),
            is_part_of_multivault: false,
            force: self.force_timestamp(),
        };
        let calculation = self.api.calculate_deposit(&request).await?;
        let mut descriptor = self.api.start_deposit(&calculation).await?;

        let approval = descriptor.take_approval();
        if needs_manual_approval(&token, approval.is_some()) {
            tracing::info!(vault_id, stage = %OperationStage::Approving, "Approving router");
            let approved = self
                .chain
                .approve_spending(token, self.settings.router_address, amount_minor)
                .await?;
            if !approved {
                return Err(Error::Approval(format!(
                    "Router allowance for {} not confirmed",
                    token
                )));
            }
        } else if let Some(approval) = approval {
            self.approve(vault_id, approval).await?;
        }

        self.pause().await;

        let simulation = SimulationRequest {
            user_address: address,
            superform_id: calculation.superform_id()?,
            amount_in: amount_minor.to_string(),
            kind: SimulationKind::Smart,
            override_state: true,
            include_approval: true,
            retain_4626: false,
        };
        self.simulate(vault_id, &simulation).await?;
        self.simulate_router(vault_id, &descriptor, true).await?;

        self.submit(vault_id, descriptor).await
    }

    async fn withdraw(&self, vault_id: &str, percent: u8, token: Address) -> Result<bool> {
        let address = self.chain.address();
        tracing::debug!(vault_id, stage = %OperationStage::Calculating);

        let portfolio = self.api.get_portfolio(address).await?;
        let Some(position) = portfolio.get(vault_id) else {
            tracing::info!(address = %address, vault_id, "No position in vault");
            return Ok(true);
        };

        let amount = withdrawal_amount(position.balance, percent);
        if amount < U256::from(self.settings.dust_threshold) {
            tracing::warn!(
                address = %address,
                vault_id,
                amount = %amount,
                "Amount below dust threshold, probably already withdrawn"
            );
            return Ok(true);
        }

        let request = WithdrawalRequest {
            user_address: address,
            refund_address: address,
            vault_id: vault_id.to_string(),
            bridge_slippage: self.settings.bridge_slippage,
            swap_slippage: self.settings.swap_slippage,
            route_type: self.settings.route_type.clone(),
            to_token_address: token,
            to_chain_id: self.chain.chain_id(),
            superpositions_amount_in: amount.to_string(),
            superpositions_chain_id: position.chain_id,
            is_part_of_multivault: false,
            force: self.force_timestamp(),
            is_erc20: position.is_erc20,
            retain_4626: false,
        };
        let calculation = self.api.calculate_withdrawal(&request).await?;
        let mut descriptor = self.api.start_withdrawal(&calculation).await?;

        if let Some(approval) = descriptor.take_approval() {
            self.approve(vault_id, approval).await?;
        }

        self.pause().await;

        let simulation = SimulationRequest {
            user_address: address,
            superform_id: calculation.superform_id()?,
            amount_in: amount.to_string(),
            kind: SimulationKind::Withdrawal,
            override_state: true,
            include_approval: true,
            retain_4626: false,
        };
        self.simulate(vault_id, &simulation).await?;
        self.simulate_router(vault_id, &descriptor, true).await?;

        self.submit(vault_id, descriptor).await
    }

    async fn claim(&self, season: u32) -> Result<bool> {
        let address = self.chain.address();

        let claimable = self
            .api
            .get_safari_rewards(address, season)
            .await?
            .into_iter()
            .filter(|reward| reward.is_claimable())
            .count();
        if claimable == 0 {
            return Err(Error::NoClaimableRewards { season });
        }
        tracing::info!(address = %address, season, claimable, "Found claimable rewards");

        let request = ClaimRequest {
            tournament_id: season,
            user: address,
        };
        let descriptor = self.api.claim_rewards(&request).await?;
        self.simulate_router("rewards", &descriptor, false).await?;

        self.submit("rewards", descriptor).await
    }

    /// Execute an approval sub-call and wait for it
    async fn approve(&self, vault_id: &str, approval: ApprovalCall) -> Result<()> {
        tracing::info!(vault_id, stage = %OperationStage::Approving, spender = %approval.to, "Sending approval");
        let tx_hash = self.chain.execute(approval.into()).await?;
        if !self.chain.await_confirmation(tx_hash).await? {
            return Err(Error::Approval(format!(
                "Approval transaction {} not confirmed",
                tx_hash
            )));
        }
        Ok(())
    }

    async fn simulate(&self, vault_id: &str, request: &SimulationRequest) -> Result<()> {
        tracing::debug!(vault_id, stage = %OperationStage::Simulating);
        let results = self.api.simulate_operation(request).await?;
        ensure_success(results.iter())
    }

    async fn simulate_router(
        &self,
        vault_id: &str,
        descriptor: &TransactionDescriptor,
        is_router: bool,
    ) -> Result<()> {
        tracing::debug!(vault_id, stage = %OperationStage::RouterSimulating);
        let request = RouterSimulationRequest::for_descriptor(
            self.chain.address(),
            self.chain.chain_id(),
            descriptor,
            is_router,
        );
        let result = self.api.simulate_router(&request).await?;
        ensure_success(std::iter::once(&result))
    }

    async fn submit(&self, vault_id: &str, descriptor: TransactionDescriptor) -> Result<bool> {
        tracing::debug!(vault_id, stage = %OperationStage::Submitting);
        let tx_hash = self.chain.execute(descriptor.into_call()).await?;

        tracing::debug!(vault_id, tx_hash = %tx_hash, stage = %OperationStage::Confirming);
        let confirmed = self.chain.await_confirmation(tx_hash).await?;

        let stage = if confirmed {
            OperationStage::Done
        } else {
            OperationStage::Failed
        };
        tracing::info!(
            address = %self.chain.address(),
            vault_id,
            tx_hash = %tx_hash,
            stage = %stage,
            "Operation finished"
        );
        Ok(confirmed)
    }

    async fn pause(&self) {
        tokio::time::sleep(self.settings.step_delay.sample()).await;
    }

    fn force_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp() + self.settings.force_offset_secs
    }
}

fn ensure_success<'a>(mut results: impl Iterator<Item = &'a SimulationResult>) -> Result<()> {
    match results.find(|result| !result.success) {
        Some(failed) => Err(Error::SimulationFailed(failed.payload.to_string())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SimulationResult;
    use crate::config::SleepRange;
    use crate::error::ErrorKind;
    use crate::tokens::addresses::{NATIVE_ETH, SUPERFORM_ROUTER, USDC_BASE, WETH_BASE};
    use crate::vault::testing::{MockApi, MockChain};
    use serde_json::json;

    const VAULT: &str = "pxOqM7dFwI2Abt-yTv4jC";
    const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    fn settings() -> OperationSettings {
        OperationSettings {
            step_delay: SleepRange::zero(),
            ..OperationSettings::default()
        }
    }

    fn service(api: MockApi, chain: MockChain) -> VaultOperationService<MockApi, MockChain> {
        VaultOperationService::new(api, chain, settings())
    }

    #[test]
    fn test_withdrawal_amount_floor() {
        let balances = [0u64, 1, 99, 100, 1000, 12_345, 999_999_999];
        for n in balances {
            for p in 1u8..=100 {
                let expected = U256::from(n) * U256::from(p) / U256::from(100u8);
                assert_eq!(withdrawal_amount(U256::from(n), p), expected, "n={n} p={p}");
            }
            assert_eq!(withdrawal_amount(U256::from(n), 100), U256::from(n));
        }
        assert_eq!(withdrawal_amount(U256::MAX, 100), U256::MAX);
        assert_eq!(withdrawal_amount(U256::MAX, 50), U256::MAX / U256::from(2u8));
    }

    #[test]
    fn test_needs_manual_approval() {
        assert!(needs_manual_approval(&USDC_BASE, false));
        assert!(!needs_manual_approval(&USDC_BASE, true));
        assert!(!needs_manual_approval(&NATIVE_ETH, false));
    }

    #[tokio::test]
    async fn test_deposit_submits_once() {
        let api = MockApi::new();
        let chain = MockChain::new().with_native_balance(U256::from(2 * ONE_ETH));
        let service = service(api, chain);

        let ok = service
            .deposit_single_vault(VAULT, 1.0, NATIVE_ETH)
            .await
            .unwrap();

        assert!(ok);
        assert_eq!(service.chain().executed().len(), 1);
        let sim = service.api().last_simulation().unwrap();
        assert_eq!(sim.amount_in, ONE_ETH.to_string());
        assert_eq!(sim.kind, SimulationKind::Smart);
        assert!(service.api().last_router_simulation().unwrap().is_router);
    }

    #[tokio::test]
    async fn test_deposit_insufficient_funds_before_api() {
        let api = MockApi::new();
        let chain = MockChain::new().with_native_balance(U256::from(2 * ONE_ETH));
        let service = service(api, chain);

        let err = service
            .deposit_single_vault(VAULT, 5.0, NATIVE_ETH)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(err.kind(), ErrorKind::Value);
        assert_eq!(service.api().call_count(), 0);
        assert!(service.chain().executed().is_empty());
    }

    #[tokio::test]
    async fn test_deposit_minor_units_uses_exact_amount() {
        let balance = U256::from(81_580_701_669_505_215_431u128);
        let chain = MockChain::new()
            .with_token(WETH_BASE, balance, 18)
            .with_allowance(U256::MAX);
        let service = service(MockApi::new(), chain);

        let ok = service
            .deposit_minor_units(VAULT, balance, WETH_BASE)
            .await
            .unwrap();

        assert!(ok);
        let sim = service.api().last_simulation().unwrap();
        assert_eq!(sim.amount_in, balance.to_string());
        assert_eq!(service.chain().executed().len(), 1);
    }

    #[tokio::test]
    async fn test_deposit_erc20_insufficient_funds() {
        let chain = MockChain::new()
            .with_native_balance(U256::from(10 * ONE_ETH))
            .with_token(USDC_BASE, U256::from(1_000_000u64), 6);
        let service = service(MockApi::new(), chain);

        let err = service
            .deposit_single_vault(VAULT, 2.0, USDC_BASE)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert_eq!(service.api().call_count(), 0);
    }

    #[tokio::test]
    async fn test_erc20_deposit_without_approval_data_approves_router() {
        let chain = MockChain::new().with_token(USDC_BASE, U256::from(5_000_000u64), 6);
        let service = service(MockApi::new(), chain);

        assert!(service
            .deposit_single_vault(VAULT, 2.5, USDC_BASE)
            .await
            .unwrap());

        let approvals = service.chain().approval_requests();
        assert_eq!(
            approvals,
            vec![(USDC_BASE, SUPERFORM_ROUTER, U256::from(2_500_000u64))]
        );
        // one approval plus the deposit itself
        assert_eq!(service.chain().executed().len(), 2);
    }

    #[tokio::test]
    async fn test_erc20_deposit_skips_approval_when_allowance_covers() {
        let chain = MockChain::new()
            .with_token(USDC_BASE, U256::from(5_000_000u64), 6)
            .with_allowance(U256::MAX);
        let service = service(MockApi::new(), chain);

        assert!(service
            .deposit_single_vault(VAULT, 1.0, USDC_BASE)
            .await
            .unwrap());
        assert!(service
            .deposit_single_vault(VAULT, 1.0, USDC_BASE)
            .await
            .unwrap());

        assert_eq!(service.chain().approval_requests().len(), 2);
        // only the two deposits went out
        assert_eq!(service.chain().executed().len(), 2);
    }

    #[tokio::test]
    async fn test_descriptor_approval_runs_first() {
        let api = MockApi::new().with_descriptor(json!({
            "to": "0xa195608C2306A26f727d5199D5A382a4508308DA",
            "data": "0x01",
            "value": "0",
            "approvalData": {
                "to": "0x0000000000000000000000000000000000000def",
                "data": "0x095ea7b3",
                "value": 0
            }
        }));
        let chain = MockChain::new().with_native_balance(U256::from(2 * ONE_ETH));
        let service = service(api, chain);

        assert!(service
            .deposit_single_vault(VAULT, 1.0, NATIVE_ETH)
            .await
            .unwrap());

        let executed = service.chain().executed();
        assert_eq!(executed.len(), 2);
        assert_eq!(
            executed[0].to,
            "0x0000000000000000000000000000000000000def".parse::<Address>().unwrap()
        );
        assert_eq!(executed[1].to, SUPERFORM_ROUTER);
    }

    #[tokio::test]
    async fn test_erc20_with_approval_data_skips_router_allowance() {
        let api = MockApi::new().with_descriptor(json!({
            "to": "0xa195608C2306A26f727d5199D5A382a4508308DA",
            "data": "0x01",
            "value": "0",
            "approvalData": {
                "to": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
                "data": "0x095ea7b3",
                "value": 0
            }
        }));
        let chain = MockChain::new().with_token(USDC_BASE, U256::from(5_000_000u64), 6);
        let service = service(api, chain);

        assert!(service
            .deposit_single_vault(VAULT, 1.0, USDC_BASE)
            .await
            .unwrap());

        assert!(service.chain().approval_requests().is_empty());
        let executed = service.chain().executed();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].to, USDC_BASE);
    }

    #[tokio::test]
    async fn test_failed_approval_aborts() {
        let api = MockApi::new().with_descriptor(json!({
            "to": "0xa195608C2306A26f727d5199D5A382a4508308DA",
            "data": "0x01",
            "approvalData": {
                "to": "0x0000000000000000000000000000000000000def",
                "data": "0x095ea7b3"
            }
        }));
        let chain = MockChain::new()
            .with_native_balance(U256::from(2 * ONE_ETH))
            .with_confirmation(false);
        let service = service(api, chain);

        let err = service
            .deposit_single_vault(VAULT, 1.0, NATIVE_ETH)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Approval(_)));
        assert_eq!(service.chain().executed().len(), 1);
        assert!(service.api().last_simulation().is_none());
    }

    #[tokio::test]
    async fn test_simulation_failure_blocks_submission() {
        let api = MockApi::new().with_simulation(vec![
            SimulationResult::from_entry(json!({"success": true})),
            SimulationResult::from_entry(json!({"success": false, "error": "revert"})),
        ]);
        let chain = MockChain::new().with_native_balance(U256::from(2 * ONE_ETH));
        let service = service(api, chain);

        let ok = service
            .deposit_single_vault(VAULT, 1.0, NATIVE_ETH)
            .await
            .unwrap();
        assert!(!ok);
        assert!(service.chain().executed().is_empty());
        assert!(service.api().last_router_simulation().is_none());
    }

    #[tokio::test]
    async fn test_missing_router_success_blocks_submission() {
        let api = MockApi::new()
            .with_router_simulation(SimulationResult::from_entry(json!({"id": "sim"})));
        let chain = MockChain::new().with_native_balance(U256::from(2 * ONE_ETH));
        let service = service(api, chain);

        assert!(!service
            .deposit_single_vault(VAULT, 1.0, NATIVE_ETH)
            .await
            .unwrap());
        assert!(service.chain().executed().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_half_position() {
        let api = MockApi::new().with_position(VAULT, U256::from(1000u64));
        let service = service(api, MockChain::new());

        assert!(service
            .withdraw_single_vault(VAULT, 50, NATIVE_ETH)
            .await
            .unwrap());

        let request = service.api().last_withdrawal().unwrap();
        assert_eq!(request.superpositions_amount_in, "500");
        assert_eq!(request.superpositions_chain_id, 8453);
        assert!(!request.retain_4626);
        let sim = service.api().last_simulation().unwrap();
        assert_eq!(sim.kind, SimulationKind::Withdrawal);
        assert_eq!(sim.amount_in, "500");
        assert_eq!(service.chain().executed().len(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_without_position_is_noop() {
        let service = service(MockApi::new(), MockChain::new());

        assert!(service
            .withdraw_single_vault(VAULT, 100, NATIVE_ETH)
            .await
            .unwrap());
        assert_eq!(service.api().call_count(), 1);
        assert!(service.chain().executed().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_dust_is_noop() {
        let api = MockApi::new().with_position(VAULT, U256::from(150u64));
        let service = service(api, MockChain::new());

        assert!(service
            .withdraw_single_vault(VAULT, 50, NATIVE_ETH)
            .await
            .unwrap());
        assert!(service.api().last_withdrawal().is_none());
        assert!(service.chain().executed().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_percent_bounds() {
        let service = service(MockApi::new(), MockChain::new());

        for percent in [0u8, 101] {
            let err = service
                .withdraw_single_vault(VAULT, percent, NATIVE_ETH)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
        assert_eq!(service.api().call_count(), 0);
    }

    #[tokio::test]
    async fn test_reverted_submission_reports_false() {
        let chain = MockChain::new()
            .with_native_balance(U256::from(2 * ONE_ETH))
            .with_confirmation(false);
        let service = service(MockApi::new(), chain);

        assert!(!service
            .deposit_single_vault(VAULT, 1.0, NATIVE_ETH)
            .await
            .unwrap());
        assert_eq!(service.chain().executed().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_without_rewards_is_value_error() {
        let service = service(MockApi::new(), MockChain::new());

        let err = service.claim_rewards(3).await.unwrap_err();
        assert!(matches!(err, Error::NoClaimableRewards { season: 3 }));
        assert_eq!(err.kind(), ErrorKind::Value);
        assert!(service.chain().executed().is_empty());
    }

    #[tokio::test]
    async fn test_claim_simulates_without_router_flag() {
        let api = MockApi::new().with_rewards(json!([
            {"status": "claimable", "reward": "OP"},
            {"status": "claimed", "reward": "USDC"}
        ]));
        let service = service(api, MockChain::new());

        assert!(service.claim_rewards(3).await.unwrap());
        assert!(!service.api().last_router_simulation().unwrap().is_router);
        assert_eq!(service.chain().executed().len(), 1);
    }
}
