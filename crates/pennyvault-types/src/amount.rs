//! Unit conversions between minor currency units, human decimal strings and
//! the contract's 18-decimal integer unit.

use crate::{PennyVaultError, Result};
use alloy_primitives::{utils, U256};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Minor units per whole currency unit (cents per unit)
pub const MINOR_UNITS_PER_WHOLE: u64 = 100;

/// Decimals of the chain's native unit
pub const NATIVE_DECIMALS: u32 = 18;

/// Convert a minor-unit total into the human decimal amount that is deposited.
///
/// `45` becomes `0.45`, `100` becomes `1`.
pub fn minor_to_decimal(minor: u64) -> Decimal {
    Decimal::from_i128_with_scale(minor as i128, 2).normalize()
}

/// Parse a native-unit string ("0.45") into wei.
///
/// Negative amounts and amounts finer than one wei are rejected.
pub fn parse_ether(amount: &str) -> Result<U256> {
    let trimmed = amount.trim();
    let value = Decimal::from_str(trimmed)
        .map_err(|e| PennyVaultError::invalid_amount(amount, e.to_string()))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(PennyVaultError::invalid_amount(amount, "amount must not be negative"));
    }
    if value.normalize().scale() > NATIVE_DECIMALS {
        return Err(PennyVaultError::invalid_amount(
            amount,
            format!("more than {NATIVE_DECIMALS} fractional digits"),
        ));
    }

    utils::parse_ether(trimmed).map_err(|e| PennyVaultError::invalid_amount(amount, e.to_string()))
}

/// Format wei as a native-unit string with at least one fractional digit
/// (`"0.45"`, `"1.0"`).
pub fn format_ether(wei: U256) -> String {
    let full = utils::format_ether(wei);
    if !full.contains('.') {
        return format!("{full}.0");
    }
    let trimmed = full.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{trimmed}0")
    } else {
        trimmed.to_string()
    }
}
