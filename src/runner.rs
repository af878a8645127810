//! Batch runner
//!
//! Drives one task over every account of a batch. Accounts are shuffled,
//! processed one after another under the [`RetrySupervisor`] and spaced out
//! by the configured account delay. A failing account never stops the batch.

use crate::api::{VaultApi, VaultApiClient};
use crate::chain::ChainAccess;
use crate::config::{DepositPolicy, SleepRange};
use crate::error::ErrorKind;
use crate::supervisor::{Outcome, RetrySupervisor};
use crate::tokens;
use crate::vault::VaultOperationService;
use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Work performed for every account of a batch
#[derive(Debug, Clone)]
pub enum Task {
    Deposit {
        vault_id: String,
        token: Address,
    },
    Withdraw {
        vault_id: String,
        token: Address,
        percent: u8,
    },
    Claim {
        season: u32,
    },
    Portfolio,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Deposit { vault_id, .. } => write!(f, "deposit {}", vault_id),
            Task::Withdraw {
                vault_id, percent, ..
            } => write!(f, "withdraw {}% of {}", percent, vault_id),
            Task::Claim { season } => write!(f, "claim season {}", season),
            Task::Portfolio => f.write_str("portfolio"),
        }
    }
}

/// Tally of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub total: usize,
    pub completed: usize,
    /// Finished without error but the operation was rejected or reverted
    pub rejected: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct BatchRunner {
    supervisor: RetrySupervisor,
    account_delay: SleepRange,
}

impl BatchRunner {
    pub fn new(supervisor: RetrySupervisor, account_delay: SleepRange) -> Self {
        Self {
            supervisor,
            account_delay,
        }
    }

    /// Run `work` once per item in random order
    pub async fn run<I, F, Fut>(&self, mut items: Vec<I>, work: F) -> BatchReport
    where
        I: fmt::Display,
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let run_id = Uuid::new_v4();
        items.shuffle(&mut rand::thread_rng());

        let span = tracing::info_span!("batch", run_id = %run_id);
        self.drive(run_id, items, work).instrument(span).await
    }

    async fn drive<I, F, Fut>(&self, run_id: Uuid, items: Vec<I>, mut work: F) -> BatchReport
    where
        I: fmt::Display,
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let mut report = BatchReport {
            run_id,
            total: items.len(),
            ..BatchReport::default()
        };
        info!(accounts = report.total, "Starting batch");

        let last = items.len().saturating_sub(1);
        for (index, item) in items.into_iter().enumerate() {
            let label = item.to_string();
            match self.supervisor.supervise(&label, work(item)).await {
                Outcome::Completed(true) => report.completed += 1,
                Outcome::Completed(false) => report.rejected += 1,
                Outcome::Failed {
                    kind: ErrorKind::DeliberateSkip,
                    ..
                } => report.skipped += 1,
                Outcome::Failed { .. } => report.failed += 1,
            }

            if index < last {
                let delay = self.account_delay.sample();
                info!(sleep_secs = delay.as_secs(), "Waiting before next account");
                tokio::time::sleep(delay).await;
            }
        }

        info!(
            completed = report.completed,
            rejected = report.rejected,
            failed = report.failed,
            skipped = report.skipped,
            "Batch finished"
        );
        report
    }
}

/// Run a task for the account behind `service`
pub async fn execute_task<A, C>(
    service: &VaultOperationService<A, C>,
    task: &Task,
    policy: &DepositPolicy,
) -> Result<bool>
where
    A: VaultApi,
    C: ChainAccess,
{
    match task {
        Task::Deposit { vault_id, token } => {
            let amount = deposit_amount(service.chain(), *token, policy).await?;
            service.deposit_minor_units(vault_id, amount, *token).await
        }
        Task::Withdraw {
            vault_id,
            token,
            percent,
        } => {
            service
                .withdraw_single_vault(vault_id, *percent, *token)
                .await
        }
        Task::Claim { season } => service.claim_rewards(*season).await,
        Task::Portfolio => {
            let chain = service.chain();
            let balance = chain.native_balance().await?;
            let balance = chain.to_human_units(balance, Some(18), None).await?;
            info!(address = %chain.address(), balance, "Native balance");

            for position in service.get_portfolio().await?.values() {
                info!(
                    address = %chain.address(),
                    vault_id = %position.vault_id,
                    chain_id = position.chain_id,
                    balance = %position.balance,
                    usd_value = position.usd_value,
                    "Vault position"
                );
            }
            Ok(true)
        }
    }
}

/// Amount (minor units) a deposit task puts into the vault
///
/// Native deposits keep a reserve for gas by taking a random share of the
/// balance; token deposits move the whole balance.
pub async fn deposit_amount<C: ChainAccess>(
    chain: &C,
    token: Address,
    policy: &DepositPolicy,
) -> Result<U256> {
    let balance = chain.balance_of(token).await?;
    let human = chain.to_human_units(balance, None, Some(token)).await?;

    if tokens::is_native(&token) {
        if human < policy.minimum_balance_left {
            return Err(Error::DeliberateSkip(format!(
                "Native balance {} below {}",
                human, policy.minimum_balance_left
            )));
        }
        let bps = if policy.share_bps_max > policy.share_bps_min {
            rand::thread_rng().gen_range(policy.share_bps_min..=policy.share_bps_max)
        } else {
            policy.share_bps_min
        };
        return Ok(balance * U256::from(bps) / U256::from(10_000u32));
    }

    if human < policy.token_dust {
        return Err(Error::DeliberateSkip(format!(
            "Already deposited, {} balance is {}",
            tokens::registry().label(&token),
            human
        )));
    }
    Ok(balance)
}

/// Log the safari XP of an address
pub async fn report_points(api: &VaultApiClient, address: Address, season: u32) -> Result<bool> {
    let points = api.safari_points(address, season).await?;
    info!(address = %address, season, points = %points, "Safari points");
    Ok(true)
}
