//! Interest calculation
//!
//! Pure functions computing what a member owes once daily interest is applied.
//! Every started day is charged, so a share settled on the day it was created
//! still pays one day of interest.

use crate::types::{LedgerError, Timestamp, AMOUNT_SCALE};
use rust_decimal::{Decimal, RoundingStrategy};

/// Seconds in one interest day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Breakdown of an amount owed with interest
#[derive(Debug, Clone, PartialEq)]
pub struct InterestQuote {
    pub principal: Decimal,
    /// `total - principal`
    pub interest: Decimal,
    pub total: Decimal,
    /// Days charged, always at least 1
    pub days: u64,
}

impl InterestQuote {
    /// Human-readable note attached to the transfer paying this quote
    pub fn memo(&self, description: &str) -> String {
        format!(
            "Payment for expense {}. Actual amount: {}, interest: {} for {} days",
            description, self.principal, self.interest, self.days
        )
    }
}

/// Number of days charged for `elapsed_seconds`
///
/// `floor(elapsed / 86400) + 1`, so never less than 1.
pub fn days_charged(elapsed_seconds: u64) -> u64 {
    elapsed_seconds / SECONDS_PER_DAY + 1
}

/// Seconds between `created_at` and `now`, clamped at 0 when the clock is behind
pub fn elapsed_seconds(created_at: Timestamp, now: Timestamp) -> u64 {
    now.saturating_sub(created_at)
}

/// Total owed on `principal` after `elapsed_seconds` at `daily_rate_percent` per day
///
/// `principal + principal * rate * days / 100`, rounded to the ledger's smallest
/// denomination with midpoints rounded away from zero.
///
/// # Errors
///
/// Returns `ArithmeticOverflow` if any intermediate product does not fit.
///
/// # Examples
///
/// ```
/// use expense_ledger::core::interest::owed_with_interest;
/// use rust_decimal::Decimal;
///
/// let same_day = owed_with_interest(Decimal::from(100), Decimal::from(5), 0).unwrap();
/// assert_eq!(same_day, Decimal::from(105));
/// ```
pub fn owed_with_interest(
    principal: Decimal,
    daily_rate_percent: Decimal,
    elapsed_seconds: u64,
) -> Result<Decimal, LedgerError> {
    quote(principal, daily_rate_percent, elapsed_seconds).map(|quote| quote.total)
}

/// Same as [`owed_with_interest`], keeping the principal, interest and days apart
pub fn quote(
    principal: Decimal,
    daily_rate_percent: Decimal,
    elapsed_seconds: u64,
) -> Result<InterestQuote, LedgerError> {
    let days = days_charged(elapsed_seconds);
    let overflow = || LedgerError::arithmetic_overflow("interest");

    let raw_interest = principal
        .checked_mul(daily_rate_percent)
        .and_then(|value| value.checked_mul(Decimal::from(days)))
        .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(overflow)?;

    let total = principal
        .checked_add(raw_interest)
        .ok_or_else(overflow)?
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize();

    Ok(InterestQuote {
        principal,
        interest: (total - principal).normalize(),
        total,
        days,
    })
}
