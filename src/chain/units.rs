//! Conversions between human-readable amounts and on-chain minor units

use crate::{Error, Result};
use alloy::primitives::utils::{self, parse_units};
use alloy::primitives::U256;

/// Convert a human-readable amount to minor units
///
/// Works on the shortest decimal representation of `amount`, so `0.1` with 18
/// decimals is exactly `10^17`. Digits beyond `decimals` are truncated.
pub fn to_minor_units(amount: f64, decimals: u8) -> Result<U256> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "Amount must be a finite non-negative number, got {}",
            amount
        )));
    }

    // parse_units rejects fractional digits beyond `decimals`
    let repr = amount.to_string();
    let repr = match repr.split_once('.') {
        Some((whole, frac)) if frac.len() > decimals as usize => {
            let frac = &frac[..decimals as usize];
            if frac.is_empty() {
                whole.to_string()
            } else {
                format!("{}.{}", whole, frac)
            }
        }
        _ => repr,
    };

    parse_units(&repr, decimals)
        .map(|units| units.get_absolute())
        .map_err(|e| Error::InvalidArgument(format!("Amount {} out of range: {}", amount, e)))
}

/// Convert minor units to a human-readable float
pub fn to_human_units(amount: U256, decimals: u8) -> f64 {
    // format_units only yields digits and a dot
    format_units(amount, decimals).parse().unwrap_or(f64::MAX)
}

/// Format minor units with trailing fractional zeros removed
pub fn format_units(value: U256, decimals: u8) -> String {
    match utils::format_units(value, decimals) {
        Ok(formatted) if formatted.contains('.') => formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        Ok(formatted) => formatted,
        // only more than 77 decimals is rejected
        Err(_) => value.to_string(),
    }
}
