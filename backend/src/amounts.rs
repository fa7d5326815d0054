//! Money values travel as decimal currency units and are stored as integer cents.

/// Largest accepted amount in currency units. Keeps every derived figure
/// (weekly incomes scaled to a month, per-user totals) well inside `i64`.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// Rounds to the nearest cent. `None` for non-finite values and for
/// magnitudes above [`MAX_AMOUNT`].
pub fn to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount.abs() > MAX_AMOUNT {
        return None;
    }
    Some((amount * 100.0).round() as i64)
}

pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}
