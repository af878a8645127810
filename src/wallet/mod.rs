//! Secure wallet management
//!
//! This module handles private key loading and holds the signing capability.
//! The private key NEVER leaves this module.

mod signer;

pub use signer::{load_addresses_file, load_keys_file, SecureWallet};

/// Environment variable holding a single private key
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
