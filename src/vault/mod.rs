//! Deposit, withdraw and claim workflows against Superform vaults

mod service;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

pub use service::{needs_manual_approval, withdrawal_amount, VaultOperationService};

/// Steps an operation moves through, logged on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStage {
    Calculating,
    Approving,
    Simulating,
    RouterSimulating,
    Submitting,
    Confirming,
    Done,
    Failed,
}

impl fmt::Display for OperationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationStage::Calculating => "calculating",
            OperationStage::Approving => "approving",
            OperationStage::Simulating => "simulating",
            OperationStage::RouterSimulating => "router_simulating",
            OperationStage::Submitting => "submitting",
            OperationStage::Confirming => "confirming",
            OperationStage::Done => "done",
            OperationStage::Failed => "failed",
        };
        f.write_str(name)
    }
}
