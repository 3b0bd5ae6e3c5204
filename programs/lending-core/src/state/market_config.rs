use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};

use crate::error::LendingError;

/// Risk parameters and counters for a lending market
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct MarketConfig {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized flag
    pub is_initialized: bool,

    /// Authority that can update parameters and register liquidators
    pub authority: Pubkey,

    /// Base asset users deposit and borrow
    pub base_asset: Pubkey,

    /// Minimum collateral ratio to open or maintain a borrow, as a
    /// percentage (default: 150)
    pub min_collateral_ratio: u64,

    /// Health factor below which a position is liquidation-eligible,
    /// as a percentage (default: 120)
    pub liquidation_threshold: u64,

    /// Annual borrow rate in basis points, accrued linearly (default: 500)
    pub interest_rate_bps: u64,

    /// Emergency halt: blocks new borrows and liquidations
    pub emergency_halt: bool,

    /// Last parameter update timestamp
    pub last_update: UnixTimestamp,

    /// Stats
    pub total_borrows: u64,
    pub total_liquidations: u64,
}

impl MarketConfig {
    pub const DISCRIMINATOR: [u8; 8] = [76, 78, 68, 95, 67, 79, 78, 70]; // "LND_CONF"

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        32 + // authority
        32 + // base_asset
        8 + // min_collateral_ratio
        8 + // liquidation_threshold
        8 + // interest_rate_bps
        1 + // emergency_halt
        8 + // last_update
        8 + // total_borrows
        8 + // total_liquidations
        64; // padding

    pub fn default(authority: Pubkey, base_asset: Pubkey) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            authority,
            base_asset,
            min_collateral_ratio: 150,
            liquidation_threshold: 120,
            interest_rate_bps: 500,
            emergency_halt: false,
            last_update: 0,
            total_borrows: 0,
            total_liquidations: 0,
        }
    }

    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        let config = Self::deserialize(&mut &data[..])
            .map_err(|_| ProgramError::InvalidAccountData)?;
        config.validate()?;
        Ok(config)
    }

    pub fn store(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        self.serialize(&mut &mut data[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)?;
        Ok(())
    }

    /// Validate configuration invariants
    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.discriminator != Self::DISCRIMINATOR {
            return Err(ProgramError::InvalidAccountData);
        }

        if !self.is_initialized {
            return Err(LendingError::NotInitialized.into());
        }

        // A position must breach the maintenance ratio before it can
        // breach the liquidation threshold
        if self.liquidation_threshold == 0
            || self.liquidation_threshold > self.min_collateral_ratio
        {
            return Err(LendingError::InvalidRiskParameters.into());
        }

        // 100% annual is the sanity bound on the borrow rate
        if self.interest_rate_bps > 10_000 {
            return Err(LendingError::InvalidRiskParameters.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MarketConfig::default(Pubkey::new_unique(), Pubkey::new_unique());
        config.validate().unwrap();
        assert_eq!(config.min_collateral_ratio, 150);
        assert_eq!(config.liquidation_threshold, 120);
    }

    #[test]
    fn test_threshold_above_min_ratio_rejected() {
        let mut config = MarketConfig::default(Pubkey::new_unique(), Pubkey::new_unique());
        config.liquidation_threshold = 160;
        assert_eq!(
            config.validate(),
            Err(LendingError::InvalidRiskParameters.into())
        );
    }
}
