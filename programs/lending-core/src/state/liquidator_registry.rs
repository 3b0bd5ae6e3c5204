use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::error::LendingError;

/// A liquidator identity bound to the code hash that was approved for it.
/// The entry is usable only while the liquidator's current code still
/// hashes to `approved_code_hash`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct VerifiedLiquidator {
    pub identity: Pubkey,
    pub approved_code_hash: [u8; 32],
}

/// Registry of approved liquidators, owned by the liquidation
/// coordinator.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct LiquidatorRegistry {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    pub entries: Vec<VerifiedLiquidator>,
}

impl LiquidatorRegistry {
    pub const DISCRIMINATOR: [u8; 8] = [76, 78, 68, 95, 76, 82, 69, 71]; // "LND_LREG"

    pub const MAX_LIQUIDATORS: usize = 16;

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        4 + (Self::MAX_LIQUIDATORS * 64) + // entries vec
        64; // padding

    pub fn new() -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            entries: Vec::new(),
        }
    }

    pub fn load(data: &[u8]) -> Result<Self, ProgramError> {
        let registry = Self::deserialize(&mut &data[..])
            .map_err(|_| ProgramError::InvalidAccountData)?;
        if registry.discriminator != Self::DISCRIMINATOR || !registry.is_initialized {
            return Err(LendingError::NotInitialized.into());
        }
        Ok(registry)
    }

    pub fn store(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        self.serialize(&mut &mut data[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)?;
        Ok(())
    }

    /// Store the approved hash for an identity. Re-registering replaces
    /// the prior hash, which is how a liquidator is re-approved after a
    /// code change.
    pub fn register(
        &mut self,
        identity: &Pubkey,
        code_hash: [u8; 32],
    ) -> Result<(), ProgramError> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.identity == *identity) {
            entry.approved_code_hash = code_hash;
        } else {
            if self.entries.len() >= Self::MAX_LIQUIDATORS {
                return Err(LendingError::TableFull.into());
            }
            self.entries.push(VerifiedLiquidator {
                identity: *identity,
                approved_code_hash: code_hash,
            });
        }
        Ok(())
    }

    pub fn approved_hash(&self, identity: &Pubkey) -> Option<[u8; 32]> {
        self.entries
            .iter()
            .find(|e| e.identity == *identity)
            .map(|e| e.approved_code_hash)
    }
}
