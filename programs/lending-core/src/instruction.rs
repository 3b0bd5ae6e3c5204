use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum LendingInstruction {
    /// Initialize a lending market
    /// Accounts:
    /// 0. `[signer, writable]` Authority (payer)
    /// 1. `[signer, writable]` Market config account
    /// 2. `[signer, writable]` Ledger account
    /// 3. `[signer, writable]` Price book account
    /// 4. `[signer, writable]` Liquidator registry account
    /// 5. `[]` System program
    /// 6. `[]` Rent sysvar
    InitializeMarket {
        base_asset: Pubkey,
        oracle_authority: Pubkey,
        price_max_age: i64,
    },

    /// Publish a collateral asset price
    /// Accounts:
    /// 0. `[signer]` Oracle authority
    /// 1. `[writable]` Price book account
    /// 2. `[]` Clock sysvar
    PublishPrice {
        asset: Pubkey,
        value: u64,
    },

    /// Deposit base asset
    /// Accounts:
    /// 0. `[signer]` User
    /// 1. `[]` Market config account
    /// 2. `[writable]` Ledger account
    /// 3. `[]` Clock sysvar
    Deposit {
        amount: u64,
    },

    /// Withdraw base asset
    /// Accounts:
    /// 0. `[signer]` User
    /// 1. `[]` Market config account
    /// 2. `[writable]` Ledger account
    /// 3. `[]` Price book account
    /// 4. `[]` Clock sysvar
    Withdraw {
        amount: u64,
    },

    /// Post collateral
    /// Accounts:
    /// 0. `[signer]` User
    /// 1. `[]` Market config account
    /// 2. `[writable]` Ledger account
    AddCollateral {
        asset: Pubkey,
        amount: u64,
    },

    /// Borrow base asset against posted backing
    /// Accounts:
    /// 0. `[signer]` User
    /// 1. `[writable]` Market config account
    /// 2. `[writable]` Ledger account
    /// 3. `[]` Price book account
    /// 4. `[]` Clock sysvar
    Borrow {
        amount: u64,
    },

    /// Repay outstanding debt
    /// Accounts:
    /// 0. `[signer]` User
    /// 1. `[]` Market config account
    /// 2. `[writable]` Ledger account
    /// 3. `[]` Clock sysvar
    Repay {
        amount: u64,
    },

    /// Approve a liquidator's current code
    /// Accounts:
    /// 0. `[signer]` Authority
    /// 1. `[]` Market config account
    /// 2. `[writable]` Liquidator registry account
    /// 3. `[]` Liquidator program account
    /// 4. `[]` Clock sysvar
    RegisterLiquidator,

    /// Liquidate an undercollateralized position
    /// Accounts:
    /// 0. `[signer]` Liquidator operator
    /// 1. `[writable]` Market config account
    /// 2. `[writable]` Ledger account
    /// 3. `[]` Price book account
    /// 4. `[]` Liquidator registry account
    /// 5. `[]` Liquidator program account
    /// 6. `[]` Clock sysvar
    Liquidate {
        borrower: Pubkey,
        /// Base-asset value the liquidator reports seizing
        seize_value: u64,
    },

    /// Log a user's position status
    /// Accounts:
    /// 0. `[]` Market config account
    /// 1. `[]` Ledger account
    /// 2. `[]` Price book account
    /// 3. `[]` Clock sysvar
    EmitLoanStatus {
        user: Pubkey,
    },

    /// Update risk parameters
    /// Accounts:
    /// 0. `[signer]` Authority
    /// 1. `[writable]` Market config account
    /// 2. `[]` Clock sysvar
    UpdateRiskParameters {
        min_collateral_ratio: Option<u64>,
        liquidation_threshold: Option<u64>,
        interest_rate_bps: Option<u64>,
    },

    /// Toggle the emergency halt
    /// Accounts:
    /// 0. `[signer]` Authority
    /// 1. `[writable]` Market config account
    /// 2. `[]` Clock sysvar
    SetEmergencyHalt {
        halt: bool,
    },
}

impl LendingInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&variant, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match variant {
            0 => {
                let payload = InitializeMarketPayload::try_from_slice(rest)?;
                Self::InitializeMarket {
                    base_asset: payload.base_asset,
                    oracle_authority: payload.oracle_authority,
                    price_max_age: payload.price_max_age,
                }
            }
            1 => {
                let payload = PublishPricePayload::try_from_slice(rest)?;
                Self::PublishPrice {
                    asset: payload.asset,
                    value: payload.value,
                }
            }
            2 => {
                let payload = AmountPayload::try_from_slice(rest)?;
                Self::Deposit {
                    amount: payload.amount,
                }
            }
            3 => {
                let payload = AmountPayload::try_from_slice(rest)?;
                Self::Withdraw {
                    amount: payload.amount,
                }
            }
            4 => {
                let payload = AddCollateralPayload::try_from_slice(rest)?;
                Self::AddCollateral {
                    asset: payload.asset,
                    amount: payload.amount,
                }
            }
            5 => {
                let payload = AmountPayload::try_from_slice(rest)?;
                Self::Borrow {
                    amount: payload.amount,
                }
            }
            6 => {
                let payload = AmountPayload::try_from_slice(rest)?;
                Self::Repay {
                    amount: payload.amount,
                }
            }
            7 => Self::RegisterLiquidator,
            8 => {
                let payload = LiquidatePayload::try_from_slice(rest)?;
                Self::Liquidate {
                    borrower: payload.borrower,
                    seize_value: payload.seize_value,
                }
            }
            9 => {
                let payload = UserPayload::try_from_slice(rest)?;
                Self::EmitLoanStatus { user: payload.user }
            }
            10 => {
                let payload = UpdateRiskParametersPayload::try_from_slice(rest)?;
                Self::UpdateRiskParameters {
                    min_collateral_ratio: payload.min_collateral_ratio,
                    liquidation_threshold: payload.liquidation_threshold,
                    interest_rate_bps: payload.interest_rate_bps,
                }
            }
            11 => {
                let payload = SetEmergencyHaltPayload::try_from_slice(rest)?;
                Self::SetEmergencyHalt { halt: payload.halt }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }
}

// Payload structs for complex instructions
#[derive(BorshSerialize, BorshDeserialize)]
struct InitializeMarketPayload {
    base_asset: Pubkey,
    oracle_authority: Pubkey,
    price_max_age: i64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct PublishPricePayload {
    asset: Pubkey,
    value: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct AmountPayload {
    amount: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct AddCollateralPayload {
    asset: Pubkey,
    amount: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct LiquidatePayload {
    borrower: Pubkey,
    seize_value: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct UserPayload {
    user: Pubkey,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct UpdateRiskParametersPayload {
    min_collateral_ratio: Option<u64>,
    liquidation_threshold: Option<u64>,
    interest_rate_bps: Option<u64>,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct SetEmergencyHaltPayload {
    halt: bool,
}

// Helper functions to create instructions
pub fn initialize_market(
    program_id: &Pubkey,
    authority: &Pubkey,
    market: &Pubkey,
    ledger: &Pubkey,
    price_book: &Pubkey,
    registry: &Pubkey,
    base_asset: Pubkey,
    oracle_authority: Pubkey,
    price_max_age: i64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*market, true),
        AccountMeta::new(*ledger, true),
        AccountMeta::new(*price_book, true),
        AccountMeta::new(*registry, true),
        AccountMeta::new_readonly(solana_program::system_program::id(), false),
        AccountMeta::new_readonly(solana_program::sysvar::rent::id(), false),
    ];

    let data = LendingInstruction::InitializeMarket {
        base_asset,
        oracle_authority,
        price_max_age,
    };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn publish_price(
    program_id: &Pubkey,
    oracle_authority: &Pubkey,
    price_book: &Pubkey,
    asset: Pubkey,
    value: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*oracle_authority, true),
        AccountMeta::new(*price_book, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::PublishPrice { asset, value };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn deposit(
    program_id: &Pubkey,
    user: &Pubkey,
    market: &Pubkey,
    ledger: &Pubkey,
    amount: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new_readonly(*market, false),
        AccountMeta::new(*ledger, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::Deposit { amount };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn withdraw(
    program_id: &Pubkey,
    user: &Pubkey,
    market: &Pubkey,
    ledger: &Pubkey,
    price_book: &Pubkey,
    amount: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new_readonly(*market, false),
        AccountMeta::new(*ledger, false),
        AccountMeta::new_readonly(*price_book, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::Withdraw { amount };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn add_collateral(
    program_id: &Pubkey,
    user: &Pubkey,
    market: &Pubkey,
    ledger: &Pubkey,
    asset: Pubkey,
    amount: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new_readonly(*market, false),
        AccountMeta::new(*ledger, false),
    ];

    let data = LendingInstruction::AddCollateral { asset, amount };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn borrow(
    program_id: &Pubkey,
    user: &Pubkey,
    market: &Pubkey,
    ledger: &Pubkey,
    price_book: &Pubkey,
    amount: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new(*market, false),
        AccountMeta::new(*ledger, false),
        AccountMeta::new_readonly(*price_book, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::Borrow { amount };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn repay(
    program_id: &Pubkey,
    user: &Pubkey,
    market: &Pubkey,
    ledger: &Pubkey,
    amount: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*user, true),
        AccountMeta::new_readonly(*market, false),
        AccountMeta::new(*ledger, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::Repay { amount };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn register_liquidator(
    program_id: &Pubkey,
    authority: &Pubkey,
    market: &Pubkey,
    registry: &Pubkey,
    liquidator_program: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new_readonly(*market, false),
        AccountMeta::new(*registry, false),
        AccountMeta::new_readonly(*liquidator_program, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::RegisterLiquidator;

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn liquidate(
    program_id: &Pubkey,
    operator: &Pubkey,
    market: &Pubkey,
    ledger: &Pubkey,
    price_book: &Pubkey,
    registry: &Pubkey,
    liquidator_program: &Pubkey,
    borrower: Pubkey,
    seize_value: u64,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*operator, true),
        AccountMeta::new(*market, false),
        AccountMeta::new(*ledger, false),
        AccountMeta::new_readonly(*price_book, false),
        AccountMeta::new_readonly(*registry, false),
        AccountMeta::new_readonly(*liquidator_program, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::Liquidate {
        borrower,
        seize_value,
    };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn emit_loan_status(
    program_id: &Pubkey,
    market: &Pubkey,
    ledger: &Pubkey,
    price_book: &Pubkey,
    user: Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*market, false),
        AccountMeta::new_readonly(*ledger, false),
        AccountMeta::new_readonly(*price_book, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::EmitLoanStatus { user };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn update_risk_parameters(
    program_id: &Pubkey,
    authority: &Pubkey,
    market: &Pubkey,
    min_collateral_ratio: Option<u64>,
    liquidation_threshold: Option<u64>,
    interest_rate_bps: Option<u64>,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*market, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::UpdateRiskParameters {
        min_collateral_ratio,
        liquidation_threshold,
        interest_rate_bps,
    };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

pub fn set_emergency_halt(
    program_id: &Pubkey,
    authority: &Pubkey,
    market: &Pubkey,
    halt: bool,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*market, false),
        AccountMeta::new_readonly(solana_program::sysvar::clock::id(), false),
    ];

    let data = LendingInstruction::SetEmergencyHalt { halt };

    Instruction {
        program_id: *program_id,
        accounts,
        data: borsh::to_vec(&data).unwrap(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_matches_borsh_encoding() {
        let ix = LendingInstruction::Borrow { amount: 123_456 };
        let data = borsh::to_vec(&ix).unwrap();

        match LendingInstruction::unpack(&data).unwrap() {
            LendingInstruction::Borrow { amount } => assert_eq!(amount, 123_456),
            other => panic!("unexpected instruction: {:?}", other),
        }
    }

    #[test]
    fn test_unpack_rejects_unknown_variant() {
        assert_eq!(
            LendingInstruction::unpack(&[255]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            LendingInstruction::unpack(&[]),
            Err(ProgramError::InvalidInstructionData)
        );
    }
}
