//! RPC endpoint configuration
//!
//! Supports multiple configuration methods following Ethereum ecosystem conventions:
//! 1. Per-chain env vars (BASE_RPC_URL, ARBITRUM_RPC_URL, etc.) - highest priority
//! 2. ALCHEMY_API_KEY - builds URLs for the chains Alchemy serves
//! 3. Public RPC lists from the network descriptors - for testing only
//!
//! # Examples
//!
//! ```bash
//! # Option 1: Per-chain URLs (recommended for production)
//! export BASE_RPC_URL="https://base-mainnet.g.alchemy.com/v2/YOUR_KEY"
//!
//! # Option 2: Single provider API key
//! export ALCHEMY_API_KEY="YOUR_KEY"
//!
//! # Option 3: No env vars - picks a random public RPC per client (rate limited)
//! ```

use super::networks::{Network, NetworkDescriptor};
use std::collections::HashMap;

/// Environment variable names
mod env_vars {
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
}

/// RPC overrides for multiple chains
#[derive(Debug, Clone, Default)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
}

impl RpcConfig {
    /// Create RPC config from environment variables
    ///
    /// Chains without an override fall back to the public endpoints of their
    /// descriptor when [`RpcConfig::descriptor`] is called.
    pub fn from_env() -> Self {
        let mut urls = HashMap::new();

        // Priority 1: per-chain env vars
        for network in Network::ALL {
            if let Ok(url) = std::env::var(network.rpc_env_var()) {
                tracing::debug!(network = %network, "Using {}", network.rpc_env_var());
                urls.insert(network.chain_id(), url);
            }
        }

        // Priority 2: fill the gaps from ALCHEMY_API_KEY
        if let Ok(key) = std::env::var(env_vars::ALCHEMY_API_KEY) {
            tracing::info!("Building RPC URLs from ALCHEMY_API_KEY");
            for network in Network::ALL {
                if let Some(url) = alchemy_url(network, &key) {
                    urls.entry(network.chain_id()).or_insert(url);
                }
            }
        }

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get the override URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Check if a chain has an override
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }

    /// Resolve the descriptor for a network, replacing its public RPC list
    /// with the configured override when there is one
    pub fn descriptor(&self, network: Network) -> NetworkDescriptor {
        let mut descriptor = network.descriptor();
        match self.get(network.chain_id()) {
            Some(url) => descriptor.rpc_urls = vec![url.to_string()],
            None => tracing::warn!(
                network = %network,
                "No RPC configured, using public RPC (rate limited)"
            ),
        }
        descriptor
    }
}

fn alchemy_url(network: Network, key: &str) -> Option<String> {
    let subdomain = match network {
        Network::Ethereum => "eth-mainnet",
        Network::Optimism => "opt-mainnet",
        Network::Polygon => "polygon-mainnet",
        Network::Base => "base-mainnet",
        Network::Arbitrum => "arb-mainnet",
        Network::ZkSync => "zksync-mainnet",
        Network::Linea => "linea-mainnet",
        _ => return None,
    };
    Some(format!("https://{}.g.alchemy.com/v2/{}", subdomain, key))
}
