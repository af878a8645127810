//! Network descriptors for the chains Superform vaults live on

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chain ID constants
pub mod chains {
    pub const ETHEREUM: u64 = 1;
    pub const OPTIMISM: u64 = 10;
    pub const BSC: u64 = 56;
    pub const POLYGON: u64 = 137;
    pub const FANTOM: u64 = 250;
    pub const ZKSYNC: u64 = 324;
    pub const MOONBEAM: u64 = 1284;
    pub const MOONRIVER: u64 = 1285;
    pub const BASE: u64 = 8453;
    pub const ARBITRUM: u64 = 42161;
    pub const ARBITRUM_NOVA: u64 = 42170;
    pub const AVALANCHE: u64 = 43114;
    pub const LINEA: u64 = 59144;
}

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Ethereum,
    Optimism,
    Bsc,
    Polygon,
    Fantom,
    ZkSync,
    Base,
    Arbitrum,
    ArbitrumNova,
    Avalanche,
    Linea,
}

impl Network {
    pub const ALL: [Network; 11] = [
        Network::Ethereum,
        Network::Optimism,
        Network::Bsc,
        Network::Polygon,
        Network::Fantom,
        Network::ZkSync,
        Network::Base,
        Network::Arbitrum,
        Network::ArbitrumNova,
        Network::Avalanche,
        Network::Linea,
    ];

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => chains::ETHEREUM,
            Network::Optimism => chains::OPTIMISM,
            Network::Bsc => chains::BSC,
            Network::Polygon => chains::POLYGON,
            Network::Fantom => chains::FANTOM,
            Network::ZkSync => chains::ZKSYNC,
            Network::Base => chains::BASE,
            Network::Arbitrum => chains::ARBITRUM,
            Network::ArbitrumNova => chains::ARBITRUM_NOVA,
            Network::Avalanche => chains::AVALANCHE,
            Network::Linea => chains::LINEA,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Optimism => "optimism",
            Network::Bsc => "bsc",
            Network::Polygon => "polygon",
            Network::Fantom => "fantom",
            Network::ZkSync => "zksync",
            Network::Base => "base",
            Network::Arbitrum => "arbitrum",
            Network::ArbitrumNova => "arbitrum_nova",
            Network::Avalanche => "avalanche",
            Network::Linea => "linea",
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.chain_id() == chain_id)
    }

    /// Environment variable that overrides the public RPC for this network
    pub fn rpc_env_var(&self) -> &'static str {
        match self {
            Network::Ethereum => "ETH_RPC_URL",
            Network::Optimism => "OPTIMISM_RPC_URL",
            Network::Bsc => "BSC_RPC_URL",
            Network::Polygon => "POLYGON_RPC_URL",
            Network::Fantom => "FANTOM_RPC_URL",
            Network::ZkSync => "ZKSYNC_RPC_URL",
            Network::Base => "BASE_RPC_URL",
            Network::Arbitrum => "ARBITRUM_RPC_URL",
            Network::ArbitrumNova => "ARBITRUM_NOVA_RPC_URL",
            Network::Avalanche => "AVALANCHE_RPC_URL",
            Network::Linea => "LINEA_RPC_URL",
        }
    }

    /// Descriptor with public RPC endpoints (rate limited)
    pub fn descriptor(&self) -> NetworkDescriptor {
        let (native_symbol, eip1559, explorer, rpcs): (&str, bool, &str, &[&str]) = match self {
            Network::Ethereum => (
                "ETH",
                true,
                "https://etherscan.io/",
                &["https://eth.llamarpc.com", "https://rpc.ankr.com/eth"],
            ),
            Network::Optimism => (
                "ETH",
                true,
                "https://optimistic.etherscan.io/",
                &["https://mainnet.optimism.io", "https://optimism.llamarpc.com"],
            ),
            Network::Bsc => (
                "BNB",
                false,
                "https://bscscan.com/",
                &["https://bsc-dataseed.bnbchain.org", "https://binance.llamarpc.com"],
            ),
            Network::Polygon => (
                "POL",
                true,
                "https://polygonscan.com/",
                &["https://polygon-rpc.com", "https://polygon.llamarpc.com"],
            ),
            Network::Fantom => ("FTM", true, "https://ftmscan.com/", &["https://rpc.ftm.tools"]),
            Network::ZkSync => (
                "ETH",
                true,
                "https://explorer.zksync.io/",
                &["https://mainnet.era.zksync.io"],
            ),
            Network::Base => (
                "ETH",
                true,
                "https://basescan.org/",
                &["https://mainnet.base.org", "https://base.llamarpc.com"],
            ),
            Network::Arbitrum => (
                "ETH",
                true,
                "https://arbiscan.io/",
                &["https://arb1.arbitrum.io/rpc", "https://arbitrum.llamarpc.com"],
            ),
            Network::ArbitrumNova => (
                "ETH",
                true,
                "https://nova.arbiscan.io/",
                &["https://nova.arbitrum.io/rpc"],
            ),
            Network::Avalanche => (
                "AVAX",
                true,
                "https://snowtrace.io/",
                &["https://api.avax.network/ext/bc/C/rpc"],
            ),
            Network::Linea => (
                "ETH",
                false,
                "https://lineascan.build/",
                &["https://rpc.linea.build"],
            ),
        };

        NetworkDescriptor {
            chain_id: self.chain_id(),
            name: self.name().to_string(),
            rpc_urls: rpcs.iter().map(|s| s.to_string()).collect(),
            native_symbol: native_symbol.to_string(),
            eip1559,
            explorer: explorer.to_string(),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let lower = s.to_lowercase();
        let lower = match lower.as_str() {
            "mainnet" => "ethereum",
            "bnb" | "binance" => "bsc",
            "zksync_era" | "zksync-era" => "zksync",
            "arbitrum-nova" | "nova" => "arbitrum_nova",
            "avax" => "avalanche",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|n| n.name() == lower)
            .ok_or_else(|| crate::Error::InvalidArgument(format!("Unknown network: {}", s)))
    }
}

/// Immutable description of one network, shared read-only by every client on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub chain_id: u64,
    pub name: String,
    pub rpc_urls: Vec<String>,
    pub native_symbol: String,
    pub eip1559: bool,
    /// Base explorer URL with trailing slash
    pub explorer: String,
}

impl NetworkDescriptor {
    pub fn tx_url(&self, tx_hash: impl fmt::Display) -> String {
        format!("{}tx/{}", self.explorer, tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_ids_roundtrip() {
        for network in Network::ALL {
            assert_eq!(Network::from_chain_id(network.chain_id()), Some(network));
        }
        assert_eq!(Network::from_chain_id(999), None);
    }

    #[test]
    fn test_parse_network() {
        assert_eq!("base".parse::<Network>().unwrap(), Network::Base);
        assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Ethereum);
        assert_eq!("nova".parse::<Network>().unwrap(), Network::ArbitrumNova);
        assert!("solana".parse::<Network>().is_err());
    }

    #[test]
    fn test_descriptor_flags() {
        let base = Network::Base.descriptor();
        assert_eq!(base.chain_id, 8453);
        assert!(base.eip1559);
        assert!(!base.rpc_urls.is_empty());

        assert!(!Network::Bsc.descriptor().eip1559);
        assert_eq!(Network::Bsc.descriptor().native_symbol, "BNB");
    }

    #[test]
    fn test_tx_url() {
        let base = Network::Base.descriptor();
        assert_eq!(base.tx_url("0xabc"), "https://basescan.org/tx/0xabc");
    }
}
