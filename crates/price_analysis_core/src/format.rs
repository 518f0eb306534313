//! crates/price_analysis_core/src/format.rs
//!
//! Display formatting for money amounts.

use rust_decimal::{Decimal, RoundingStrategy};

const GROUP_SEPARATOR: char = '\u{a0}';
const DECIMAL_SEPARATOR: char = ',';
const MISSING: &str = "—";

/// Formats a price with two fraction digits, a comma decimal separator and
/// thousands grouped by non-breaking spaces, e.g. `1 234 567,80`.
pub fn format_price(price: Option<Decimal>) -> String {
    let Some(price) = price else {
        return MISSING.to_string();
    };

    let rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.2}", rounded.abs());
    let (integer, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped}{DECIMAL_SEPARATOR}{fraction}")
}
