use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq)]
pub enum LendingError {
    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Account not initialized")]
    NotInitialized = 1,

    #[error("Account already initialized")]
    AlreadyInitialized = 2,

    #[error("Invalid authority")]
    InvalidAuthority = 3,

    #[error("Amount must be positive")]
    InvalidAmount = 4,

    #[error("Insufficient deposit balance")]
    InsufficientBalance = 5,

    #[error("Insufficient collateral")]
    InsufficientCollateral = 6,

    #[error("Price data stale or missing")]
    StalePrice = 7,

    #[error("Health factor below minimum collateral ratio")]
    HealthFactorViolation = 8,

    #[error("Position not eligible for liquidation")]
    NotEligible = 9,

    #[error("Liquidator unregistered or code hash mismatch")]
    UnverifiedLiquidator = 10,

    #[error("Liquidator exceeded authorized seizure cap")]
    OverSeizure = 11,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 12,

    #[error("Action not authorized")]
    Unauthorized = 13,

    #[error("Emergency halt active")]
    EmergencyHaltActive = 14,

    #[error("State table capacity exhausted")]
    TableFull = 15,

    #[error("No active loan for user")]
    NoActiveLoan = 16,

    #[error("Invalid risk parameter configuration")]
    InvalidRiskParameters = 17,
}

impl PrintProgramError for LendingError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("LendingError: {}", self);
    }
}

impl From<LendingError> for ProgramError {
    fn from(e: LendingError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for LendingError {
    fn type_of() -> &'static str {
        "LendingError"
    }
}
