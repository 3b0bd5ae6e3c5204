use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    math::{self, HealthFactor},
    state::{Ledger, LoanRecord, MarketConfig, PriceSource},
};

/// Actions that pass through the external authorization interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Withdraw,
}

/// Consumed authorization interface. The authenticator itself (signature,
/// passkey, ...) lives outside the core; the engine only asks whether an
/// action is authorized.
pub trait AuthGate {
    fn is_action_authorized(&self, user: &Pubkey, action: UserAction) -> bool;
}

/// Outcome of a repayment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaymentOutcome {
    /// Amount actually applied (excess over outstanding debt is discarded)
    pub applied: u64,
    pub remaining_debt: u64,
    pub loan_closed: bool,
}

/// Orchestrates deposit, withdraw, collateral, borrow, and repay flows
/// over the ledger. Every operation validates against the current state
/// first and commits its full effect set only once all checks pass, so a
/// failure leaves the ledger untouched.
pub struct LendingEngine;

impl LendingEngine {
    pub fn deposit(
        ledger: &mut Ledger,
        user: &Pubkey,
        amount: u64,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidAmount.into());
        }
        ledger.record_deposit(user, amount, now)
    }

    /// Withdraw from the deposit balance. While a loan is open the
    /// deposit doubles as backing, so the withdrawal must leave the
    /// health factor at or above the minimum collateral ratio.
    pub fn withdraw(
        ledger: &mut Ledger,
        config: &MarketConfig,
        prices: &dyn PriceSource,
        auth: &dyn AuthGate,
        user: &Pubkey,
        amount: u64,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidAmount.into());
        }

        if !auth.is_action_authorized(user, UserAction::Withdraw) {
            return Err(LendingError::Unauthorized.into());
        }

        if amount > ledger.deposit_of(user) {
            return Err(LendingError::InsufficientBalance.into());
        }

        if let Some(loan) = ledger.loan_of(user) {
            let interest = Self::projected_interest(loan, config, now)?;
            let backing = Self::backing_value(ledger, prices, user, now)?
                .checked_sub(amount)
                .ok_or(LendingError::ArithmeticOverflow)?;
            let health = math::health_factor(backing, loan.principal, interest)?;
            if !health.meets(config.min_collateral_ratio) {
                return Err(LendingError::HealthFactorViolation.into());
            }
        }

        ledger.record_withdrawal(user, amount)
    }

    pub fn add_collateral(
        ledger: &mut Ledger,
        user: &Pubkey,
        asset: &Pubkey,
        amount: u64,
    ) -> Result<(), ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidAmount.into());
        }
        ledger.record_collateral_add(user, asset, amount)
    }

    /// Borrow against posted backing. Requires fresh prices for every
    /// collateral asset and a post-borrow health factor at or above the
    /// minimum collateral ratio.
    pub fn borrow(
        ledger: &mut Ledger,
        config: &MarketConfig,
        prices: &dyn PriceSource,
        user: &Pubkey,
        amount: u64,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidAmount.into());
        }

        if config.emergency_halt {
            return Err(LendingError::EmergencyHaltActive.into());
        }

        let backing = Self::backing_value(ledger, prices, user, now)?;

        let (principal, interest) = match ledger.loan_of(user) {
            Some(loan) => (loan.principal, Self::projected_interest(loan, config, now)?),
            None => (0, 0),
        };

        let principal_after = principal
            .checked_add(amount)
            .ok_or(LendingError::ArithmeticOverflow)?;

        let health = math::health_factor(backing, principal_after, interest)?;
        if !health.meets(config.min_collateral_ratio) {
            return Err(LendingError::HealthFactorViolation.into());
        }

        if ledger.loan_of(user).is_some() {
            let loan = ledger
                .loan_of_mut(user)
                .ok_or(LendingError::NoActiveLoan)?;
            // Close the interest gap before growing the principal so the
            // new amount does not accrue over the old interval
            loan.interest_accrued = interest;
            loan.last_interest_update = now;
            loan.principal = principal_after;
        } else {
            ledger.open_loan(user, amount, now)?;
        }

        Ok(())
    }

    /// Repay outstanding debt, interest before principal. Accrues the
    /// interest gap up to `now` first; closes the loan when the debt
    /// reaches zero.
    pub fn repay(
        ledger: &mut Ledger,
        config: &MarketConfig,
        user: &Pubkey,
        amount: u64,
        now: UnixTimestamp,
    ) -> Result<RepaymentOutcome, ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidAmount.into());
        }

        let interest = {
            let loan = ledger.loan_of(user).ok_or(LendingError::NoActiveLoan)?;
            Self::projected_interest(loan, config, now)?
        };

        let loan = ledger
            .loan_of_mut(user)
            .ok_or(LendingError::NoActiveLoan)?;
        loan.interest_accrued = interest;
        loan.last_interest_update = now;

        let applied = ledger.apply_repayment(user, amount)?;

        let remaining_debt = ledger
            .loan_of(user)
            .ok_or(LendingError::NoActiveLoan)?
            .outstanding_debt()?;

        let loan_closed = remaining_debt == 0;
        if loan_closed {
            ledger.close_loan(user)?;
        }

        Ok(RepaymentOutcome {
            applied,
            remaining_debt,
            loan_closed,
        })
    }

    /// Interest accrued as of `now`, as a pure projection. Stored state
    /// is not touched; calling this twice at the same time yields the
    /// same value.
    pub fn calculate_current_interest(
        ledger: &Ledger,
        config: &MarketConfig,
        user: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<u64, ProgramError> {
        match ledger.loan_of(user) {
            Some(loan) => Self::projected_interest(loan, config, now),
            None => Ok(0),
        }
    }

    /// Current health factor. A user without debt reads `NoDebt`; with
    /// debt outstanding, every collateral asset needs a fresh price.
    pub fn get_health_factor(
        ledger: &Ledger,
        config: &MarketConfig,
        prices: &dyn PriceSource,
        user: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<HealthFactor, ProgramError> {
        let (principal, interest) = match ledger.loan_of(user) {
            Some(loan) => (loan.principal, Self::projected_interest(loan, config, now)?),
            None => return Ok(HealthFactor::NoDebt),
        };

        let backing = Self::backing_value(ledger, prices, user, now)?;
        math::health_factor(backing, principal, interest)
    }

    /// One-line ASCII status for a user's position.
    pub fn loan_status_ascii(
        ledger: &Ledger,
        config: &MarketConfig,
        prices: &dyn PriceSource,
        user: &Pubkey,
        now: UnixTimestamp,
    ) -> String {
        let deposit = ledger.deposit_of(user);

        let loan = match ledger.loan_of(user) {
            Some(loan) => loan,
            None => return format!("user={} deposit={} loan=none", user, deposit),
        };

        let interest =
            Self::projected_interest(loan, config, now).unwrap_or(loan.interest_accrued);
        let health = match Self::get_health_factor(ledger, config, prices, user, now) {
            Ok(HealthFactor::NoDebt) => "inf".to_string(),
            Ok(HealthFactor::Ratio(pct)) => pct.to_string(),
            Err(_) => "stale".to_string(),
        };

        format!(
            "user={} deposit={} principal={} interest={} health={}",
            user, deposit, loan.principal, interest, health
        )
    }

    /// Value backing a user's debt: the base-asset deposit at par plus
    /// collateral records valued through fresh prices. A missing or
    /// stale price for any posted collateral is an error, not a zero.
    pub fn backing_value(
        ledger: &Ledger,
        prices: &dyn PriceSource,
        user: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<u64, ProgramError> {
        let mut total = ledger.deposit_of(user);

        for record in ledger.collateral_of(user) {
            if record.amount == 0 {
                continue;
            }
            let quote = prices
                .get_price(&record.asset, now)
                .ok_or(LendingError::StalePrice)?;
            if !quote.is_fresh {
                return Err(LendingError::StalePrice.into());
            }
            total = total
                .checked_add(math::collateral_value(record.amount, quote.value)?)
                .ok_or(LendingError::ArithmeticOverflow)?;
        }

        Ok(total)
    }

    /// Value of the collateral records alone; the seizable portion of a
    /// position (deposits back loans but are never seized).
    pub fn seizable_value(
        ledger: &Ledger,
        prices: &dyn PriceSource,
        user: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<u64, ProgramError> {
        let mut total: u64 = 0;

        for record in ledger.collateral_of(user) {
            if record.amount == 0 {
                continue;
            }
            let quote = prices
                .get_price(&record.asset, now)
                .ok_or(LendingError::StalePrice)?;
            if !quote.is_fresh {
                return Err(LendingError::StalePrice.into());
            }
            total = total
                .checked_add(math::collateral_value(record.amount, quote.value)?)
                .ok_or(LendingError::ArithmeticOverflow)?;
        }

        Ok(total)
    }

    fn projected_interest(
        loan: &LoanRecord,
        config: &MarketConfig,
        now: UnixTimestamp,
    ) -> Result<u64, ProgramError> {
        // A clock reading behind the last update accrues nothing
        let elapsed = now.saturating_sub(loan.last_interest_update);
        math::accrue_interest(
            loan.principal,
            loan.interest_accrued,
            config.interest_rate_bps,
            elapsed,
        )
    }
}
