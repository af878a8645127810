//! Superform agent CLI
//!
//! Command-line interface for running vault batches over a set of accounts.

use alloy::primitives::Address;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use superform_agent::config::SleepRange;
use superform_agent::notify::TelegramNotifier;
use superform_agent::runner::{execute_task, report_points};
use superform_agent::tokens::addresses::NATIVE_ETH;
use superform_agent::wallet::{load_addresses_file, load_keys_file, SecureWallet, PRIVATE_KEY_ENV};
use superform_agent::{
    BatchReport, BatchRunner, ChainClient, Config, Error, Result, RetrySupervisor, RpcConfig,
    Task, VaultApiClient, VaultOperationService,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "superform-agent")]
#[command(about = "Batch automation for Superform vaults")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Deposit into a vault from every account
    Deposit {
        /// Vault id (defaults to the configured vault)
        #[arg(long)]
        vault_id: Option<String>,

        /// Token deposited (defaults to the native currency)
        #[arg(long)]
        token: Option<Address>,
    },

    /// Withdraw from a vault for every account
    Withdraw {
        #[arg(long)]
        vault_id: Option<String>,

        /// Token received (defaults to the native currency)
        #[arg(long)]
        token: Option<Address>,

        /// Share of the position withdrawn
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(1..=100))]
        percent: u8,
    },

    /// Claim Safari rewards of a season
    Claim {
        #[arg(short, long)]
        season: u32,
    },

    /// Log balances and vault positions
    Portfolio,

    /// Log Safari points of the addresses in the wallets file
    Points {
        #[arg(short, long)]
        season: u32,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let registry = tracing_subscriber::registry().with(log_filter(cli.verbose, rust_log.as_deref()));
    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    let config = match cli.config {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Deposit { vault_id, token } => {
            let task = Task::Deposit {
                vault_id: vault_id.unwrap_or_else(|| config.default_vault_id.clone()),
                token: token.unwrap_or(NATIVE_ETH),
            };
            run_accounts(config, task).await?;
        }
        Commands::Withdraw {
            vault_id,
            token,
            percent,
        } => {
            let task = Task::Withdraw {
                vault_id: vault_id.unwrap_or_else(|| config.default_vault_id.clone()),
                token: token.unwrap_or(NATIVE_ETH),
                percent,
            };
            run_accounts(config, task).await?;
        }
        Commands::Claim { season } => {
            run_accounts(config, Task::Claim { season }).await?;
        }
        Commands::Portfolio => {
            run_accounts(config, Task::Portfolio).await?;
        }
        Commands::Points { season } => {
            run_points(config, season).await?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// `RUST_LOG` directives when set, otherwise the level picked by `--verbose`
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "info" };
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

fn build_runner(config: &Config, account_delay: SleepRange) -> BatchRunner {
    let mut supervisor = RetrySupervisor::new(config.backoff.clone());
    match TelegramNotifier::from_env(&config.notification) {
        Some(notifier) => supervisor = supervisor.with_notifier(Arc::new(notifier)),
        None => tracing::debug!("Telegram notifications disabled"),
    }
    BatchRunner::new(supervisor, account_delay)
}

/// Keys from the keys file, falling back to `PRIVATE_KEY`
fn load_accounts(config: &Config) -> Result<Vec<Arc<SecureWallet>>> {
    let keys_file = Path::new(&config.keys_file);
    let wallets = if keys_file.exists() {
        load_keys_file(keys_file)?
    } else {
        tracing::info!(
            path = %keys_file.display(),
            "Keys file not found, using {}",
            PRIVATE_KEY_ENV
        );
        vec![SecureWallet::from_env(PRIVATE_KEY_ENV)?]
    };

    if wallets.is_empty() {
        return Err(Error::Wallet("No accounts to run".to_string()));
    }
    tracing::info!(accounts = wallets.len(), "Loaded accounts");
    Ok(wallets.into_iter().map(Arc::new).collect())
}

async fn run_accounts(config: Config, task: Task) -> Result<()> {
    let accounts = load_accounts(&config)?;
    let api = VaultApiClient::new(&config.api)?;
    let network = RpcConfig::from_env().descriptor(config.network);

    tracing::info!(
        task = %task,
        network = %config.network,
        "Starting Superform agent"
    );

    let runner = build_runner(&config, config.account_delay);
    let config = &config;
    let task = &task;
    let report = runner
        .run(accounts, |wallet| {
            let api = api.clone();
            let network = network.clone();
            async move {
                let chain = ChainClient::new(wallet, network, config.confirmation.clone())?;
                let service = VaultOperationService::new(api, chain, config.operation.clone());
                execute_task(&service, task, &config.deposit).await
            }
        })
        .await;

    print_report(&report)
}

async fn run_points(config: Config, season: u32) -> Result<()> {
    let addresses = load_addresses_file(Path::new(&config.wallets_file))?;
    let api = VaultApiClient::new(&config.api)?;

    // read-only lookups need no spacing
    let runner = build_runner(&config, SleepRange::zero());
    let api = &api;
    let report = runner
        .run(addresses, |address| report_points(api, address, season))
        .await;

    print_report(&report)
}

fn print_report(report: &BatchReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_verbosity() {
        assert_eq!(log_filter(false, None).to_string(), "info");
        assert_eq!(log_filter(true, None).to_string(), "debug");
        assert_eq!(log_filter(true, Some("  ")).to_string(), "debug");
    }

    #[test]
    fn test_rust_log_overrides_verbosity() {
        let filter = log_filter(true, Some("superform_agent=trace,warn")).to_string();
        assert!(filter.contains("superform_agent=trace"));
        assert!(filter.contains("warn"));
        assert!(!filter.contains("debug"));
    }
}
