use sha3::{Digest, Keccak256};
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    engine::LendingEngine,
    error::LendingError,
    math,
    state::{Ledger, LiquidatorRegistry, MarketConfig, PriceSource},
};

/// Consumed governance interface. The timelock/proposal workflow lives
/// outside the core; registration only asks whether an identity is
/// approved at a given time.
pub trait GovernanceGate {
    fn is_upgrade_approved(&self, identity: &Pubkey, at_time: UnixTimestamp) -> bool;
}

/// Capability contract a pluggable liquidator satisfies. The coordinator
/// depends only on this interface; concrete liquidators may be swapped
/// after re-verification.
pub trait Liquidator {
    fn identity(&self) -> Pubkey;

    /// The executable logic bytes backing the identity; hashed to detect
    /// post-registration code substitution
    fn executable_code(&self) -> &[u8];

    /// Seize up to `max_seizable` base-asset value from the borrower's
    /// collateral; returns the value actually seized
    fn attempt_seizure(
        &mut self,
        borrower: &Pubkey,
        max_seizable: u64,
    ) -> Result<u64, ProgramError>;
}

/// Keccak256 content hash of liquidator code
pub fn code_hash(code: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(code);

    let digest = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// Completion record of a settled liquidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationReceipt {
    pub borrower: Pubkey,
    pub liquidator: Pubkey,
    /// Base-asset value reported seized
    pub seized_value: u64,
    /// Collateral units taken, per asset
    pub seized_units: Vec<(Pubkey, u64)>,
    /// Debt cleared against the loan
    pub debt_cleared: u64,
    pub loan_closed: bool,
    pub timestamp: UnixTimestamp,
}

/// Drives a liquidation attempt through its four stages:
/// eligibility, verification, execution, settlement.
pub struct LiquidationCoordinator;

impl LiquidationCoordinator {
    /// Approve a liquidator by storing the hash of its current code.
    /// Required again after any code change; stale entries fail
    /// verification permanently until re-registered.
    pub fn register_verified_liquidator(
        registry: &mut LiquidatorRegistry,
        liquidator: &dyn Liquidator,
        governance: &dyn GovernanceGate,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        let identity = liquidator.identity();

        if !governance.is_upgrade_approved(&identity, now) {
            return Err(LendingError::Unauthorized.into());
        }

        registry.register(&identity, code_hash(liquidator.executable_code()))?;

        msg!("Liquidator registered: {}", identity);
        Ok(())
    }

    /// Run a liquidation attempt. All ledger effects of the attempt,
    /// including the interest accrued during eligibility, are applied
    /// atomically: any failure restores the exact pre-attempt state.
    pub fn liquidate(
        ledger: &mut Ledger,
        config: &MarketConfig,
        prices: &dyn PriceSource,
        registry: &LiquidatorRegistry,
        liquidator: &mut dyn Liquidator,
        borrower: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<LiquidationReceipt, ProgramError> {
        if config.emergency_halt {
            return Err(LendingError::EmergencyHaltActive.into());
        }

        let checkpoint = ledger.clone();

        let result =
            Self::run_stages(ledger, config, prices, registry, liquidator, borrower, now);

        if result.is_err() {
            *ledger = checkpoint;
        }

        result
    }

    fn run_stages(
        ledger: &mut Ledger,
        config: &MarketConfig,
        prices: &dyn PriceSource,
        registry: &LiquidatorRegistry,
        liquidator: &mut dyn Liquidator,
        borrower: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<LiquidationReceipt, ProgramError> {
        // Stage 1: Eligibility. Accrue interest to now, then test the
        // health factor against the liquidation threshold.
        let (principal, interest) = {
            let loan = ledger.loan_of(borrower).ok_or(LendingError::NoActiveLoan)?;
            let interest = LendingEngine::calculate_current_interest(ledger, config, borrower, now)?;
            (loan.principal, interest)
        };

        {
            let loan = ledger
                .loan_of_mut(borrower)
                .ok_or(LendingError::NoActiveLoan)?;
            loan.interest_accrued = interest;
            loan.last_interest_update = now;
        }

        let backing = LendingEngine::backing_value(ledger, prices, borrower, now)?;
        let health = math::health_factor(backing, principal, interest)?;

        if !math::liquidation_eligible(health, config.liquidation_threshold) {
            return Err(LendingError::NotEligible.into());
        }

        // Stage 2: Verification. The liquidator's current code must hash
        // to the approved value; a mismatch or missing entry is a hard
        // stop.
        let identity = liquidator.identity();
        let approved = registry
            .approved_hash(&identity)
            .ok_or(LendingError::UnverifiedLiquidator)?;

        if code_hash(liquidator.executable_code()) != approved {
            return Err(LendingError::UnverifiedLiquidator.into());
        }

        // Stage 3: Execution. Invoke the capability under a hard cap;
        // reporting beyond the cap rejects the entire attempt.
        let debt = principal
            .checked_add(interest)
            .ok_or(LendingError::ArithmeticOverflow)?;
        let seizable = LendingEngine::seizable_value(ledger, prices, borrower, now)?;
        let max_seizable = seizable.min(debt);

        let seized_value = liquidator.attempt_seizure(borrower, max_seizable)?;

        if seized_value > max_seizable {
            msg!(
                "Liquidator {} reported {} over cap {}",
                identity,
                seized_value,
                max_seizable
            );
            return Err(LendingError::OverSeizure.into());
        }

        // Stage 4: Settlement. Take collateral units covering the
        // reported value and clear the matching debt.
        let mut remaining_value = seized_value;
        let mut seized_units: Vec<(Pubkey, u64)> = Vec::new();

        let records: Vec<(Pubkey, u64)> = ledger
            .collateral_of(borrower)
            .map(|c| (c.asset, c.amount))
            .collect();

        for (asset, amount) in records {
            if remaining_value == 0 {
                break;
            }
            if amount == 0 {
                continue;
            }

            let quote = prices
                .get_price(&asset, now)
                .ok_or(LendingError::StalePrice)?;
            let record_value = math::collateral_value(amount, quote.value)?;
            let take_value = remaining_value.min(record_value);

            let units = math::units_for_value(take_value, quote.value)?.min(amount);
            ledger.record_collateral_seize(borrower, &asset, units)?;
            seized_units.push((asset, units));

            remaining_value -= take_value;
        }

        let debt_cleared = ledger.apply_repayment(borrower, seized_value)?;

        let remaining_debt = ledger
            .loan_of(borrower)
            .ok_or(LendingError::NoActiveLoan)?
            .outstanding_debt()?;

        let loan_closed = remaining_debt == 0;
        if loan_closed {
            ledger.close_loan(borrower)?;
        }

        msg!(
            "Liquidation settled: borrower={} seized={} debt_cleared={} closed={}",
            borrower,
            seized_value,
            debt_cleared,
            loan_closed
        );

        Ok(LiquidationReceipt {
            borrower: *borrower,
            liquidator: identity,
            seized_value,
            seized_units,
            debt_cleared,
            loan_closed,
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_hash_detects_substitution() {
        let original = b"seize logic v1";
        let patched = b"seize logic v2";

        assert_eq!(code_hash(original), code_hash(original));
        assert_ne!(code_hash(original), code_hash(patched));
    }
}
