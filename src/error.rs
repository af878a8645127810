//! Error types for the Superform agent

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Superform API error: {0}")]
    Api(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: String, available: String },

    #[error("No rewards to claim for season {season}")]
    NoClaimableRewards { season: u32 },

    #[error("Simulation failed: {0}")]
    SimulationFailed(String),

    #[error("Approval failed: {0}")]
    Approval(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Skipped: {0}")]
    DeliberateSkip(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification error: {0}")]
    Notification(String),
}

/// Coarse classification used to pick a backoff range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Not a failure; the batch should move on quickly
    DeliberateSkip,
    /// RPC or HTTP transport trouble
    Connectivity,
    /// Bad values or unmet preconditions
    Value,
    /// The vault API rejected or garbled a request
    Api,
    /// Pre-flight simulation rejected the transaction
    Simulation,
    /// Key material or signing
    Wallet,
    Unknown,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DeliberateSkip(_) => ErrorKind::DeliberateSkip,
            Error::Rpc(_) | Error::Network(_) => ErrorKind::Connectivity,
            Error::InsufficientFunds { .. }
            | Error::Approval(_)
            | Error::Config(_)
            | Error::InvalidArgument(_)
            | Error::NoClaimableRewards { .. } => ErrorKind::Value,
            Error::Api(_) => ErrorKind::Api,
            Error::SimulationFailed(_) => ErrorKind::Simulation,
            Error::Wallet(_) => ErrorKind::Wallet,
            Error::Json(_) | Error::Io(_) | Error::Notification(_) => ErrorKind::Unknown,
        }
    }

    pub(crate) fn rpc(context: &str, err: impl std::fmt::Display) -> Self {
        Error::Rpc(format!("{}: {}", context, err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
