//! Per-chain fee rules

use crate::config::networks::chains;
use rand::Rng;

/// Fee fields placed on an outgoing transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeParams {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    Legacy {
        gas_price: u128,
    },
}

const ZKSYNC_PRIORITY_FEE: u128 = 1_000_000;
const BSC_GAS_PRICE_MIN: u128 = 1_200_000_000;
const BSC_GAS_PRICE_MAX: u128 = 1_500_000_000;

/// Compute fees from the node's gas price and, on EIP-1559 chains, its
/// suggested priority fee
///
/// EIP-1559: base = gas price + 10%, with chain overrides for the priority
/// fee (zkSync, Fantom) and base (Arbitrum Nova). Legacy: BNB Chain draws a
/// random 1.2-1.5 gwei, Moonbeam and Moonriver pay gas price + 50%.
pub fn compute_fees(
    chain_id: u64,
    eip1559: bool,
    gas_price: u128,
    suggested_priority_fee: Option<u128>,
) -> FeeParams {
    if eip1559 {
        let mut base_fee = gas_price.saturating_mul(11) / 10;
        let priority_fee = match chain_id {
            chains::ZKSYNC => ZKSYNC_PRIORITY_FEE,
            chains::FANTOM => base_fee / 4,
            _ => suggested_priority_fee.unwrap_or_default(),
        };
        if chain_id == chains::ARBITRUM_NOVA {
            base_fee = base_fee.saturating_mul(125) / 100;
        }
        FeeParams::Eip1559 {
            max_fee_per_gas: base_fee.saturating_add(priority_fee),
            max_priority_fee_per_gas: priority_fee,
        }
    } else {
        let gas_price = match chain_id {
            chains::BSC => rand::thread_rng().gen_range(BSC_GAS_PRICE_MIN..=BSC_GAS_PRICE_MAX),
            chains::MOONBEAM | chains::MOONRIVER => gas_price.saturating_mul(15) / 10,
            _ => gas_price,
        };
        FeeParams::Legacy { gas_price }
    }
}

/// Apply a percentage multiplier to a gas estimate
pub fn scale_gas_limit(estimate: u64, multiplier_percent: u64) -> u64 {
    estimate.saturating_mul(multiplier_percent) / 100
}
