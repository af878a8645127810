//! Shared token and contract registry
//!
//! Single source of truth for the addresses the vault workflows touch.

use alloy::primitives::{address, Address, U256};
use std::collections::HashMap;

/// Token metadata
#[derive(Debug, Clone, Copy)]
pub struct TokenInfo {
    /// Token symbol (e.g., "USDC", "WETH")
    pub symbol: &'static str,
    /// Number of decimals
    pub decimals: u8,
}

impl TokenInfo {
    pub const fn new(symbol: &'static str, decimals: u8) -> Self {
        Self { symbol, decimals }
    }
}

/// Well-known addresses
pub mod addresses {
    use super::*;

    /// Superform router, the spender for manual deposit approvals
    pub const SUPERFORM_ROUTER: Address = address!("a195608c2306a26f727d5199d5a382a4508308da");

    // === Native token sentinel used by the API ===
    pub const NATIVE_ETH: Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
    pub const ZERO_ADDRESS: Address = address!("0000000000000000000000000000000000000000");

    // === Base ===
    pub const WETH_BASE: Address = address!("4200000000000000000000000000000000000006");
    pub const USDC_BASE: Address = address!("833589fcd6edb6e08f4c7c32d4f71b54bda02913");

    // === Arbitrum ===
    pub const USDC_ARB: Address = address!("af88d065e77c8cc2239327c5edb3a432268e5831");
    pub const WETH_ARB: Address = address!("82af49447d8a07e3bd95bd0d56f35241523fbab1");
}

/// Allowance granted by manual approvals (2^256 - 1)
pub const MAX_APPROVAL: U256 = U256::MAX;

/// Whether `token` stands for the chain's native currency
pub fn is_native(token: &Address) -> bool {
    *token == addresses::NATIVE_ETH || *token == addresses::ZERO_ADDRESS
}

/// Symbols and decimals of well-known tokens, used to label logs
pub struct TokenRegistry {
    tokens: HashMap<Address, TokenInfo>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        use addresses::*;

        let mut tokens = HashMap::new();
        tokens.insert(NATIVE_ETH, TokenInfo::new("ETH", 18));
        tokens.insert(ZERO_ADDRESS, TokenInfo::new("ETH", 18));
        tokens.insert(WETH_BASE, TokenInfo::new("WETH", 18));
        tokens.insert(WETH_ARB, TokenInfo::new("WETH", 18));
        tokens.insert(USDC_BASE, TokenInfo::new("USDC", 6));
        tokens.insert(USDC_ARB, TokenInfo::new("USDC", 6));

        Self { tokens }
    }

    pub fn get(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.get(address)
    }

    /// Symbol for logs, falling back to the address itself
    pub fn label(&self, address: &Address) -> String {
        self.get(address)
            .map(|t| t.symbol.to_string())
            .unwrap_or_else(|| address.to_string())
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global token registry (lazy initialized)
static REGISTRY: std::sync::OnceLock<TokenRegistry> = std::sync::OnceLock::new();

/// Get the global token registry
pub fn registry() -> &'static TokenRegistry {
    REGISTRY.get_or_init(TokenRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_detection() {
        assert!(is_native(&addresses::NATIVE_ETH));
        assert!(is_native(&addresses::ZERO_ADDRESS));
        assert!(!is_native(&addresses::WETH_BASE));
    }

    #[test]
    fn test_token_info() {
        let registry = TokenRegistry::new();

        let usdc = registry.get(&addresses::USDC_BASE).unwrap();
        assert_eq!(usdc.symbol, "USDC");
        assert_eq!(usdc.decimals, 6);

        assert_eq!(registry.get(&addresses::NATIVE_ETH).unwrap().decimals, 18);
    }

    #[test]
    fn test_label_falls_back_to_address() {
        let reg = registry();
        assert_eq!(reg.label(&addresses::WETH_BASE), "WETH");

        let unknown = address!("1111111111111111111111111111111111111111");
        assert_eq!(reg.label(&unknown).to_lowercase(), format!("{unknown}").to_lowercase());
    }

    #[test]
    fn test_router_checksum() {
        assert_eq!(
            addresses::SUPERFORM_ROUTER.to_checksum(None),
            "0xa195608C2306A26f727d5199D5A382a4508308DA"
        );
    }

    #[test]
    fn test_max_approval() {
        assert_eq!(MAX_APPROVAL, U256::MAX);
    }
}
