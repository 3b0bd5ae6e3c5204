use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, program_error::ProgramError, pubkey::Pubkey};

use crate::error::LendingError;

/// A validated price reading: the value is usable only while `is_fresh`
/// holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub value: u64,
    pub is_fresh: bool,
}

/// Interface the risk engine consumes prices through. The feed's own
/// update mechanics stay outside the core.
pub trait PriceSource {
    fn get_price(&self, asset: &Pubkey, now: UnixTimestamp) -> Option<PriceQuote>;
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct PriceEntry {
    pub asset: Pubkey,
    /// Base-asset value of one collateral unit, fixed point 6 decimals
    pub value: u64,
    pub published_at: UnixTimestamp,
}

/// Recorded prices for collateral assets. Entries are written by the
/// oracle authority and read through `PriceSource`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct PriceBook {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    /// Authority allowed to publish prices
    pub oracle_authority: Pubkey,

    /// Recency window in seconds; older prices are stale
    pub max_age: i64,

    pub entries: Vec<PriceEntry>,
}

impl PriceBook {
    pub const DISCRIMINATOR: [u8; 8] = [76, 78, 68, 95, 80, 82, 67, 69]; // "LND_PRCE"

    pub const MAX_ENTRIES: usize = 32;

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        32 + // oracle_authority
        8 + // max_age
        4 + (Self::MAX_ENTRIES * 48) + // entries vec
        64; // padding

    pub fn new(oracle_authority: Pubkey, max_age: i64) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            oracle_authority,
            max_age,
            entries: Vec::new(),
        }
    }

    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        let book = Self::deserialize(&mut &data[..])
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if book.discriminator != Self::DISCRIMINATOR || !book.is_initialized {
            return Err(LendingError::NotInitialized.into());
        }
        Ok(book)
    }

    pub fn store(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        self.serialize(&mut &mut data[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)?;
        Ok(())
    }

    pub fn publish(
        &mut self,
        asset: &Pubkey,
        value: u64,
        now: UnixTimestamp,
    ) -> Result<(), ProgramError> {
        if value == 0 {
            return Err(LendingError::InvalidAmount.into());
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.asset == *asset) {
            entry.value = value;
            entry.published_at = now;
        } else {
            if self.entries.len() >= Self::MAX_ENTRIES {
                return Err(LendingError::TableFull.into());
            }
            self.entries.push(PriceEntry {
                asset: *asset,
                value,
                published_at: now,
            });
        }
        Ok(())
    }
}

impl PriceSource for PriceBook {
    fn get_price(&self, asset: &Pubkey, now: UnixTimestamp) -> Option<PriceQuote> {
        self.entries.iter().find(|e| e.asset == *asset).map(|e| {
            // Clock appearing behind the publish time counts as age zero
            let age = now.saturating_sub(e.published_at).max(0);
            PriceQuote {
                value: e.value,
                is_fresh: age <= self.max_age,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_freshness_window() {
        let mut book = PriceBook::new(Pubkey::new_unique(), 60);
        let asset = Pubkey::new_unique();

        book.publish(&asset, 1_000_000, 100).unwrap();

        let quote = book.get_price(&asset, 160).unwrap();
        assert!(quote.is_fresh);

        let quote = book.get_price(&asset, 161).unwrap();
        assert!(!quote.is_fresh);
        assert_eq!(quote.value, 1_000_000);
    }

    #[test]
    fn test_unknown_asset_has_no_quote() {
        let book = PriceBook::new(Pubkey::new_unique(), 60);
        assert!(book.get_price(&Pubkey::new_unique(), 0).is_none());
    }

    #[test]
    fn test_republish_overwrites_entry() {
        let mut book = PriceBook::new(Pubkey::new_unique(), 60);
        let asset = Pubkey::new_unique();

        book.publish(&asset, 500_000, 10).unwrap();
        book.publish(&asset, 750_000, 20).unwrap();

        assert_eq!(book.entries.len(), 1);
        let quote = book.get_price(&asset, 20).unwrap();
        assert_eq!(quote.value, 750_000);
    }

    #[test]
    fn test_zero_price_rejected() {
        let mut book = PriceBook::new(Pubkey::new_unique(), 60);
        assert_eq!(
            book.publish(&Pubkey::new_unique(), 0, 10),
            Err(LendingError::InvalidAmount.into())
        );
    }
}
