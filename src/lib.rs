//! Superform vault agent
//!
//! Multi-account batch automation for Superform vaults:
//! - Deposit into and withdraw from vaults through the Superform API
//! - Claim Safari season rewards
//! - Read portfolios and Safari points
//!
//! # Safety Model
//!
//! - Every transaction is simulated through the API before it is broadcast
//! - Private keys never leave the wallet module and are never logged
//! - One account failing never stops a batch; its error is classified,
//!   slept off and optionally reported to Telegram

pub mod api;
pub mod chain;
pub mod config;
pub mod notify;
pub mod runner;
pub mod supervisor;
pub mod tokens;
pub mod vault;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use api::{VaultApi, VaultApiClient};
pub use chain::{ChainAccess, ChainClient};
pub use config::{Config, Network, RpcConfig};
pub use error::{Error, ErrorKind, Result};
pub use runner::{BatchReport, BatchRunner, Task};
pub use supervisor::{Outcome, RetrySupervisor};
pub use vault::VaultOperationService;
