use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};

use crate::error::LendingError;

/// Base-asset deposit held by a user
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct DepositRecord {
    pub user: Pubkey,
    pub amount: u64,
    /// Time of the most recent deposit
    pub deposit_time: UnixTimestamp,
}

/// Collateral posted by a user, one record per asset
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct CollateralRecord {
    pub user: Pubkey,
    pub asset: Pubkey,
    pub amount: u64,
}

/// Open loan, at most one per user
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct LoanRecord {
    pub user: Pubkey,
    pub principal: u64,
    pub interest_accrued: u64,
    /// Time the loan was opened
    pub borrow_time: UnixTimestamp,
    /// Upper bound of the interval already accrued; never in the future
    pub last_interest_update: UnixTimestamp,
}

impl LoanRecord {
    pub fn outstanding_debt(&self) -> Result<u64, ProgramError> {
        self.principal
            .checked_add(self.interest_accrued)
            .ok_or_else(|| LendingError::ArithmeticOverflow.into())
    }
}

/// Per-user accounting tables. All mutations to deposit, collateral, and
/// loan records flow through this struct; each method is a single atomic
/// bookkeeping step that either applies fully or returns untouched.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct Ledger {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    pub deposits: Vec<DepositRecord>,
    pub collateral: Vec<CollateralRecord>,
    pub loans: Vec<LoanRecord>,
}

impl Ledger {
    pub const DISCRIMINATOR: [u8; 8] = [76, 78, 68, 95, 76, 68, 71, 82]; // "LND_LDGR"

    pub const MAX_DEPOSITS: usize = 64;
    pub const MAX_COLLATERAL: usize = 128;
    pub const MAX_LOANS: usize = 64;

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        4 + (Self::MAX_DEPOSITS * 48) + // deposits vec
        4 + (Self::MAX_COLLATERAL * 72) + // collateral vec
        4 + (Self::MAX_LOANS * 64) + // loans vec
        64; // padding

    pub fn new() -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            deposits: Vec::new(),
            collateral: Vec::new(),
            loans: Vec::new(),
        }
    }

    /// Deserialize from account data, tolerating trailing zero padding.
    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        let ledger = Self::deserialize(&mut &data[..])
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if ledger.discriminator != Self::DISCRIMINATOR || !ledger.is_initialized {
            return Err(LendingError::NotInitialized.into());
        }
        Ok(ledger)
    }

    pub fn store(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        self.serialize(&mut &mut data[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)?;
        Ok(())
    }

    // ---- read accessors ----

    pub fn deposit_of(&self, user: &Pubkey) -> u64 {
        self.deposits
            .iter()
            .find(|d| d.user == *user)
            .map(|d| d.amount)
            .unwrap_or(0)
    }

    pub fn deposit_record_of(&self, user: &Pubkey) -> Option<&DepositRecord> {
        self.deposits.iter().find(|d| d.user == *user)
    }

    pub fn collateral_of<'a>(
        &'a self,
        user: &'a Pubkey,
    ) -> impl Iterator<Item = &'a CollateralRecord> {
        self.collateral.iter().filter(move |c| c.user == *user)
    }

    pub fn collateral_amount(&self, user: &Pubkey, asset: &Pubkey) -> u64 {
        self.collateral
            .iter()
            .find(|c| c.user == *user && c.asset == *asset)
            .map(|c| c.amount)
            .unwrap_or(0)
    }

    pub fn loan_of(&self, user: &Pubkey) -> Option<&LoanRecord> {
        self.loans.iter().find(|l| l.user == *user)
    }

    pub fn loan_of_mut(&mut self, user: &Pubkey) -> Option<&mut LoanRecord> {
        self.loans.iter_mut().find(|l| l.user == *user)
    }

    // ---- mutations ----

    pub fn record_deposit(
        &mut self,
        user: &Pubkey,
        amount: u64,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        if let Some(record) = self.deposits.iter_mut().find(|d| d.user == *user) {
            record.amount = record
                .amount
                .checked_add(amount)
                .ok_or(LendingError::ArithmeticOverflow)?;
            record.deposit_time = now;
        } else {
            if self.deposits.len() >= Self::MAX_DEPOSITS {
                return Err(LendingError::TableFull.into());
            }
            self.deposits.push(DepositRecord {
                user: *user,
                amount,
                deposit_time: now,
            });
        }
        Ok(())
    }

    pub fn record_withdrawal(&mut self, user: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        let record = self
            .deposits
            .iter_mut()
            .find(|d| d.user == *user)
            .ok_or(LendingError::InsufficientBalance)?;

        if amount > record.amount {
            return Err(LendingError::InsufficientBalance.into());
        }

        record.amount -= amount;
        Ok(())
    }

    pub fn record_collateral_add(
        &mut self,
        user: &Pubkey,
        asset: &Pubkey,
        amount: u64,
    ) -> Result<(), ProgramError> {
        if let Some(record) = self
            .collateral
            .iter_mut()
            .find(|c| c.user == *user && c.asset == *asset)
        {
            record.amount = record
                .amount
                .checked_add(amount)
                .ok_or(LendingError::ArithmeticOverflow)?;
        } else {
            if self.collateral.len() >= Self::MAX_COLLATERAL {
                return Err(LendingError::TableFull.into());
            }
            self.collateral.push(CollateralRecord {
                user: *user,
                asset: *asset,
                amount,
            });
        }
        Ok(())
    }

    pub fn record_collateral_seize(
        &mut self,
        user: &Pubkey,
        asset: &Pubkey,
        amount: u64,
    ) -> Result<(), ProgramError> {
        let record = self
            .collateral
            .iter_mut()
            .find(|c| c.user == *user && c.asset == *asset)
            .ok_or(LendingError::InsufficientCollateral)?;

        if amount > record.amount {
            return Err(LendingError::InsufficientCollateral.into());
        }

        record.amount -= amount;
        Ok(())
    }

    pub fn open_loan(
        &mut self,
        user: &Pubkey,
        principal: u64,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        if self.loan_of(user).is_some() {
            return Err(LendingError::AlreadyInitialized.into());
        }
        if self.loans.len() >= Self::MAX_LOANS {
            return Err(LendingError::TableFull.into());
        }
        self.loans.push(LoanRecord {
            user: *user,
            principal,
            interest_accrued: 0,
            borrow_time: now,
            last_interest_update: now,
        });
        Ok(())
    }

    /// Apply a repayment against interest first, then principal. Excess
    /// beyond the outstanding debt is discarded; returns the amount
    /// actually applied.
    pub fn apply_repayment(&mut self, user: &Pubkey, amount: u64) -> Result<u64, ProgramError> {
        let loan = self
            .loans
            .iter_mut()
            .find(|l| l.user == *user)
            .ok_or(LendingError::NoActiveLoan)?;

        let from_interest = amount.min(loan.interest_accrued);
        loan.interest_accrued -= from_interest;

        let from_principal = (amount - from_interest).min(loan.principal);
        loan.principal -= from_principal;

        Ok(from_interest + from_principal)
    }

    pub fn close_loan(&mut self, user: &Pubkey) -> Result<(), ProgramError> {
        let index = self
            .loans
            .iter()
            .position(|l| l.user == *user)
            .ok_or(LendingError::NoActiveLoan)?;
        self.loans.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_withdraw_round_trip() {
        let mut ledger = Ledger::new();
        let user = Pubkey::new_unique();

        ledger.record_deposit(&user, 1_000, 5).unwrap();
        assert_eq!(ledger.deposit_of(&user), 1_000);

        ledger.record_withdrawal(&user, 1_000).unwrap();
        assert_eq!(ledger.deposit_of(&user), 0);
    }

    #[test]
    fn test_withdrawal_beyond_balance_rejected() {
        let mut ledger = Ledger::new();
        let user = Pubkey::new_unique();

        ledger.record_deposit(&user, 500, 1).unwrap();
        assert_eq!(
            ledger.record_withdrawal(&user, 501),
            Err(LendingError::InsufficientBalance.into())
        );
        // Untouched on failure
        assert_eq!(ledger.deposit_of(&user), 500);
    }

    #[test]
    fn test_collateral_seize_contract() {
        let mut ledger = Ledger::new();
        let user = Pubkey::new_unique();
        let asset = Pubkey::new_unique();

        ledger.record_collateral_add(&user, &asset, 2_000).unwrap();
        assert_eq!(
            ledger.record_collateral_seize(&user, &asset, 2_001),
            Err(LendingError::InsufficientCollateral.into())
        );

        ledger.record_collateral_seize(&user, &asset, 1_500).unwrap();
        assert_eq!(ledger.collateral_amount(&user, &asset), 500);
    }

    #[test]
    fn test_repayment_reduces_interest_before_principal() {
        let mut ledger = Ledger::new();
        let user = Pubkey::new_unique();

        ledger.open_loan(&user, 1_000, 10).unwrap();
        ledger.loan_of_mut(&user).unwrap().interest_accrued = 50;

        let applied = ledger.apply_repayment(&user, 60).unwrap();
        assert_eq!(applied, 60);

        let loan = ledger.loan_of(&user).unwrap();
        assert_eq!(loan.interest_accrued, 0);
        assert_eq!(loan.principal, 990);
    }

    #[test]
    fn test_repayment_capped_at_outstanding_debt() {
        let mut ledger = Ledger::new();
        let user = Pubkey::new_unique();

        ledger.open_loan(&user, 1_000, 10).unwrap();
        let applied = ledger.apply_repayment(&user, 5_000).unwrap();
        assert_eq!(applied, 1_000);

        let loan = ledger.loan_of(&user).unwrap();
        assert_eq!(loan.principal, 0);
        assert_eq!(loan.interest_accrued, 0);
    }

    #[test]
    fn test_single_loan_per_user() {
        let mut ledger = Ledger::new();
        let user = Pubkey::new_unique();

        ledger.open_loan(&user, 1_000, 10).unwrap();
        assert!(ledger.open_loan(&user, 500, 11).is_err());

        ledger.close_loan(&user).unwrap();
        assert!(ledger.loan_of(&user).is_none());
        ledger.open_loan(&user, 500, 12).unwrap();
    }

    #[test]
    fn test_load_tolerates_trailing_padding() {
        let mut ledger = Ledger::new();
        let user = Pubkey::new_unique();
        ledger.record_deposit(&user, 42, 1).unwrap();

        let mut data = vec![0u8; Ledger::LEN];
        ledger.store(&mut data).unwrap();

        let reloaded = Ledger::load(&data).unwrap();
        assert_eq!(reloaded.deposit_of(&user), 42);
    }
}
