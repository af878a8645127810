//! Superform REST API
//!
//! [`VaultApi`] is the seam the vault workflows depend on. [`VaultApiClient`]
//! implements it over HTTP.

mod client;
pub mod types;

use crate::Result;
use alloy::primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;

pub use client::VaultApiClient;
pub use types::{
    ApprovalCall, Calculation, ClaimRequest, DepositRequest, RouterSimulationRequest,
    SafariReward, SafariTournament, SimulationKind, SimulationRequest, SimulationResult,
    TransactionDescriptor, VaultPosition, WithdrawalRequest,
};

#[async_trait]
pub trait VaultApi: Send + Sync {
    async fn calculate_deposit(&self, request: &DepositRequest) -> Result<Calculation>;

    async fn calculate_withdrawal(&self, request: &WithdrawalRequest) -> Result<Calculation>;

    async fn start_deposit(&self, calculation: &Calculation) -> Result<TransactionDescriptor>;

    async fn start_withdrawal(&self, calculation: &Calculation) -> Result<TransactionDescriptor>;

    /// Per-position simulation; never returns an empty list
    async fn simulate_operation(&self, request: &SimulationRequest)
        -> Result<Vec<SimulationResult>>;

    async fn simulate_router(&self, request: &RouterSimulationRequest) -> Result<SimulationResult>;

    /// Positions keyed by vault id
    async fn get_portfolio(&self, address: Address) -> Result<HashMap<String, VaultPosition>>;

    async fn get_safari_rewards(&self, address: Address, season: u32) -> Result<Vec<SafariReward>>;

    async fn claim_rewards(&self, request: &ClaimRequest) -> Result<TransactionDescriptor>;
}
