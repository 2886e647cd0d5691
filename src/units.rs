//! Exact conversion of on-chain amounts into display strings.

use alloy::primitives::{
    U256,
    utils::{self, UnitsError},
};

/// Decimal places of the native currency below its display unit.
pub const ETHER_DECIMALS: u8 = 18;

/// Render `amount` smallest units as a decimal with `decimals` places.
///
/// Trailing fractional zeros are dropped but at least one fractional digit is
/// kept, so `10^18` at 18 decimals is `"1.0"`. Never rounds.
pub fn format_units(amount: U256, decimals: u8) -> Result<String, UnitsError> {
    let formatted = utils::format_units(amount, decimals)?;
    Ok(trim_fraction(formatted))
}

/// [`format_units`] at the native currency's 18 decimals.
pub fn format_ether(amount: U256) -> String {
    trim_fraction(utils::format_ether(amount))
}

fn trim_fraction(formatted: String) -> String {
    match formatted.split_once('.') {
        Some((int, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{int}.0")
            } else {
                format!("{int}.{frac}")
            }
        }
        None => format!("{formatted}.0"),
    }
}
