//! Per-account error supervision
//!
//! Classifies the error of one unit of work, sleeps for a jittered duration
//! picked from the backoff table and lets the batch move on. Nothing is
//! retried immediately; the account gets another chance on the next pass.

use crate::config::BackoffTable;
use crate::error::ErrorKind;
use crate::notify::Notifier;
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Result of one supervised unit of work
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Failed { kind: ErrorKind, slept: Duration },
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

pub struct RetrySupervisor {
    backoff: BackoffTable,
    notifier: Option<Arc<dyn Notifier>>,
}

impl RetrySupervisor {
    pub fn new(backoff: BackoffTable) -> Self {
        Self {
            backoff,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Run `work`, absorbing its error
    pub async fn supervise<T, F>(&self, label: &str, work: F) -> Outcome<T>
    where
        F: Future<Output = Result<T>>,
    {
        let err = match work.await {
            Ok(value) => return Outcome::Completed(value),
            Err(err) => err,
        };

        let kind = err.kind();
        let (range, registered) = self.backoff.lookup(kind);
        let slept = range.sample();

        if kind == ErrorKind::DeliberateSkip {
            tracing::info!(label, reason = %err, sleep_secs = slept.as_secs_f64(), "Skipping");
        } else {
            tracing::error!(
                label,
                kind = ?kind,
                error = %err,
                sleep_secs = slept.as_secs_f64(),
                "Something went wrong"
            );
        }

        if !registered {
            if let Some(notifier) = &self.notifier {
                let message = format!("Caught {:?}: {}", kind, err);
                if let Err(e) = notifier.notify(&message).await {
                    tracing::warn!(error = %e, "Failed to send notification");
                }
            }
        }

        tokio::time::sleep(slept).await;
        Outcome::Failed { kind, slept }
    }
}
