//! Shared ratio and rounding policy. Every aggregator derives its rates
//! through these helpers so the divide-by-zero and rounding rules live in
//! exactly one place.

use rust_decimal::{Decimal, RoundingStrategy};

/// Half-up rounding to 2 decimal places, the convention used for every
/// emitted money amount and rate.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Zero when the denominator is zero, never a panic or `Infinity`.
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// `part / whole * 100`, rounded to 2 decimals; 0 when `whole` is 0.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    round2(safe_div(part, whole) * Decimal::ONE_HUNDRED)
}

/// Rates are emitted as strings with exactly two decimal digits.
pub fn format_2dp(value: Decimal) -> String {
    format!("{:.2}", round2(value))
}

pub fn pct_string(part: Decimal, whole: Decimal) -> String {
    format_2dp(percentage(part, whole))
}

/// Period-over-period growth with the documented conventions: a first
/// period of activity reports 100, two empty periods report 0.
pub fn growth_rate(current: Decimal, previous: Decimal) -> Decimal {
    if previous.is_zero() {
        if current > Decimal::ZERO {
            return Decimal::ONE_HUNDRED;
        }
        return Decimal::ZERO;
    }
    round2((current - previous) / previous * Decimal::ONE_HUNDRED)
}

/// Mean of day counts, "0.00" when the sample is empty.
pub fn mean_days(values: &[i64]) -> String {
    if values.is_empty() {
        return format_2dp(Decimal::ZERO);
    }
    let sum: i64 = values.iter().sum();
    format_2dp(safe_div(Decimal::from(sum), Decimal::from(values.len() as i64)))
}
