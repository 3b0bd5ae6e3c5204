use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, program_error::ProgramError};

use crate::error::LendingError;

/// Fixed point price scale (6 decimals)
pub const PRICE_SCALE: u64 = 1_000_000;

/// Basis point denominator for interest rates
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Seconds in a 365-day year, the accrual period base
pub const SECONDS_PER_YEAR: u128 = 31_536_000;

/// Collateralization of a position, expressed as a percentage.
///
/// A position with zero outstanding debt has no meaningful ratio; it is
/// represented by the `NoDebt` variant instead of a sentinel number so it
/// can never be confused with a dangerously low finite reading.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthFactor {
    NoDebt,
    /// floor(100 * collateral_value / (principal + interest))
    Ratio(u64),
}

impl HealthFactor {
    /// Whether the position satisfies a minimum collateral ratio.
    pub fn meets(&self, min_ratio: u64) -> bool {
        match self {
            HealthFactor::NoDebt => true,
            HealthFactor::Ratio(pct) => *pct >= min_ratio,
        }
    }
}

/// Interest accrued over `elapsed` seconds, added to `prior_interest`.
///
/// Accrual is linear (simple interest on principal) at an annual basis
/// point rate: added = principal * rate_bps * elapsed / (10_000 * year).
/// Zero elapsed time adds zero; apparent backward time movement is
/// clamped to zero rather than producing negative accrual.
pub fn accrue_interest(
    principal: u64,
    prior_interest: u64,
    rate_bps: u64,
    elapsed: UnixTimestamp,
) -> Result<u64, ProgramError> {
    if elapsed <= 0 || principal == 0 || rate_bps == 0 {
        return Ok(prior_interest);
    }

    let added = (principal as u128)
        .checked_mul(rate_bps as u128)
        .and_then(|v| v.checked_mul(elapsed as u128))
        .ok_or(LendingError::ArithmeticOverflow)?
        / (BPS_DENOMINATOR * SECONDS_PER_YEAR);

    let total = (prior_interest as u128)
        .checked_add(added)
        .ok_or(LendingError::ArithmeticOverflow)?;

    if total > u64::MAX as u128 {
        return Err(LendingError::ArithmeticOverflow.into());
    }

    Ok(total as u64)
}

/// Value of `amount` collateral units at a fixed point price.
pub fn collateral_value(amount: u64, price: u64) -> Result<u64, ProgramError> {
    let value = (amount as u128)
        .checked_mul(price as u128)
        .ok_or(LendingError::ArithmeticOverflow)?
        / PRICE_SCALE as u128;

    if value > u64::MAX as u128 {
        return Err(LendingError::ArithmeticOverflow.into());
    }

    Ok(value as u64)
}

/// Health factor of a position.
pub fn health_factor(
    collateral_value: u64,
    principal: u64,
    interest: u64,
) -> Result<HealthFactor, ProgramError> {
    let debt = (principal as u128)
        .checked_add(interest as u128)
        .ok_or(LendingError::ArithmeticOverflow)?;

    if debt == 0 {
        return Ok(HealthFactor::NoDebt);
    }

    let pct = (collateral_value as u128)
        .checked_mul(100)
        .ok_or(LendingError::ArithmeticOverflow)?
        / debt;

    if pct > u64::MAX as u128 {
        return Err(LendingError::ArithmeticOverflow.into());
    }

    Ok(HealthFactor::Ratio(pct as u64))
}

/// Largest principal that keeps the health factor at or above
/// `min_ratio` immediately after the borrow.
pub fn max_borrow(collateral_value: u64, min_ratio: u64) -> Result<u64, ProgramError> {
    if min_ratio == 0 {
        return Err(LendingError::InvalidRiskParameters.into());
    }

    let max = (collateral_value as u128)
        .checked_mul(100)
        .ok_or(LendingError::ArithmeticOverflow)?
        / min_ratio as u128;

    if max > u64::MAX as u128 {
        return Err(LendingError::ArithmeticOverflow.into());
    }

    Ok(max as u64)
}

/// Collateral units needed to cover `value` at a fixed point price,
/// rounded down.
pub fn units_for_value(value: u64, price: u64) -> Result<u64, ProgramError> {
    if price == 0 {
        return Err(LendingError::ArithmeticOverflow.into());
    }

    let units = (value as u128)
        .checked_mul(PRICE_SCALE as u128)
        .ok_or(LendingError::ArithmeticOverflow)?
        / price as u128;

    if units > u64::MAX as u128 {
        return Err(LendingError::ArithmeticOverflow.into());
    }

    Ok(units as u64)
}

/// A position is liquidation-eligible only with a finite health factor
/// strictly below the threshold; a debt-free position never is.
pub fn liquidation_eligible(health: HealthFactor, threshold: u64) -> bool {
    match health {
        HealthFactor::NoDebt => false,
        HealthFactor::Ratio(pct) => pct < threshold,
    }
}
