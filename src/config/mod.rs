//! Configuration for the Superform agent
//!
//! Every tunable lives in [`Config`], which is loaded once and handed to each
//! component at construction. There is no ambient module state.

pub mod networks;
pub mod rpc;

use crate::error::ErrorKind;
use crate::tokens::addresses;
use alloy::primitives::Address;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub use networks::{Network, NetworkDescriptor};
pub use rpc::RpcConfig;

/// Telegram bot token environment variable name
pub const TELEGRAM_BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Half-open `[min_secs, max_secs)` interval a jittered sleep is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleepRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl SleepRange {
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Uniform draw with millisecond resolution; a degenerate range yields `min`
    pub fn sample(&self) -> Duration {
        let min_ms = self.min_secs.saturating_mul(1_000);
        let max_ms = self.max_secs.saturating_mul(1_000);
        if max_ms <= min_ms {
            return Duration::from_millis(min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..max_ms))
    }

    pub fn contains(&self, duration: Duration) -> bool {
        let ms = duration.as_millis();
        if self.max_secs <= self.min_secs {
            return ms == u128::from(self.min_secs) * 1_000;
        }
        ms >= u128::from(self.min_secs) * 1_000 && ms < u128::from(self.max_secs) * 1_000
    }
}

/// Error kind → sleep range lookup with a default for unregistered kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffTable {
    pub entries: HashMap<ErrorKind, SleepRange>,
    pub default: SleepRange,
}

impl BackoffTable {
    /// Returns the range for `kind` and whether the kind was registered
    pub fn lookup(&self, kind: ErrorKind) -> (SleepRange, bool) {
        match self.entries.get(&kind) {
            Some(range) => (*range, true),
            None => (self.default, false),
        }
    }
}

impl Default for BackoffTable {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(ErrorKind::DeliberateSkip, SleepRange::new(1, 3));
        entries.insert(ErrorKind::Connectivity, SleepRange::new(300, 500));
        entries.insert(ErrorKind::Value, SleepRange::new(50, 150));
        Self {
            entries,
            default: SleepRange::new(50, 150),
        }
    }
}

/// Vault API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.superform.xyz/".to_string(),
        }
    }
}

/// Parameters of the deposit/withdraw/claim workflows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSettings {
    /// Spender used for manual ERC20 approvals
    pub router_address: Address,
    /// Basis points of a percent (10 = 0.1%)
    pub bridge_slippage: u32,
    pub swap_slippage: u32,
    pub route_type: String,
    /// Added to the current unix time to build the `force` parameter
    pub force_offset_secs: i64,
    /// Withdrawals smaller than this (minor units) count as already settled
    pub dust_threshold: u64,
    /// Pause between approval and simulation
    pub step_delay: SleepRange,
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            router_address: addresses::SUPERFORM_ROUTER,
            bridge_slippage: 10,
            swap_slippage: 10,
            route_type: "output".to_string(),
            force_offset_secs: 300_000,
            dust_threshold: 100,
            step_delay: SleepRange::new(5, 10),
        }
    }
}

/// Receipt polling and gas settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSettings {
    pub initial_delay_secs: u64,
    pub poll_interval_secs: u64,
    pub max_attempts: u32,
    /// Applied to the node's gas estimate, in percent
    pub gas_limit_multiplier_percent: u64,
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            initial_delay_secs: 20,
            poll_interval_secs: 10,
            max_attempts: 30,
            gas_limit_multiplier_percent: 105,
        }
    }
}

/// How much of a balance a deposit task puts into the vault
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositPolicy {
    /// Native balance (human units) below which the account is skipped
    pub minimum_balance_left: f64,
    /// Share of the native balance deposited, drawn from `[min, max]` basis points
    pub share_bps_min: u32,
    pub share_bps_max: u32,
    /// Token balance (human units) below which the account counts as deposited
    pub token_dust: f64,
}

impl Default for DepositPolicy {
    fn default() -> Self {
        Self {
            minimum_balance_left: 0.02,
            share_bps_min: 9_000,
            share_bps_max: 9_500,
            token_dust: 0.01,
        }
    }
}

/// Notification side channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Telegram chat receiving error reports; disabled when unset
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
    pub script_name: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            telegram_chat_id: None,
            script_name: "Superform".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network the vaults are operated on
    pub network: Network,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub operation: OperationSettings,
    #[serde(default)]
    pub confirmation: ConfirmationSettings,
    #[serde(default)]
    pub backoff: BackoffTable,
    /// Pause between two accounts of a batch
    pub account_delay: SleepRange,
    #[serde(default)]
    pub deposit: DepositPolicy,
    #[serde(default)]
    pub notification: NotificationSettings,
    /// One hex private key per line
    pub keys_file: String,
    /// One address per line, used by read-only tasks
    pub wallets_file: String,
    /// Vault used when the CLI does not name one (Base Moonwell Flagship ETH)
    pub default_vault_id: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Base,
            api: ApiSettings::default(),
            operation: OperationSettings::default(),
            confirmation: ConfirmationSettings::default(),
            backoff: BackoffTable::default(),
            account_delay: SleepRange::new(30, 60),
            deposit: DepositPolicy::default(),
            notification: NotificationSettings::default(),
            keys_file: "files/keys".to_string(),
            wallets_file: "files/wallets".to_string(),
            default_vault_id: "pxOqM7dFwI2Abt-yTv4jC".to_string(),
        }
    }
}

impl Config {
    /// Load a JSON config file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }
}
