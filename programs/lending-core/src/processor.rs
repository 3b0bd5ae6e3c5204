use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::invoke,
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

use crate::{
    engine::{AuthGate, LendingEngine, UserAction},
    error::LendingError,
    instruction::LendingInstruction,
    liquidation::{GovernanceGate, LiquidationCoordinator, Liquidator},
    state::{Ledger, LiquidatorRegistry, MarketConfig, PriceBook},
};

/// Auth interface adapter: a transaction signature is the authorization
/// proof for user actions.
struct SignerGate {
    signed: bool,
}

impl AuthGate for SignerGate {
    fn is_action_authorized(&self, _user: &Pubkey, _action: UserAction) -> bool {
        self.signed
    }
}

/// Governance interface adapter: a registration carried out by the
/// signed market authority counts as timelock-approved.
struct AuthorityGovernance {
    approved: bool,
}

impl GovernanceGate for AuthorityGovernance {
    fn is_upgrade_approved(&self, _identity: &Pubkey, _at_time: i64) -> bool {
        self.approved
    }
}

/// Liquidator capability backed by a program account. The code bytes
/// are hashed for verification; the seizure the operator's execution
/// produced is reported as a value and enforced against the cap by the
/// coordinator.
struct ProgramAccountLiquidator {
    identity: Pubkey,
    code: Vec<u8>,
    reported_value: u64,
}

impl Liquidator for ProgramAccountLiquidator {
    fn identity(&self) -> Pubkey {
        self.identity
    }

    fn executable_code(&self) -> &[u8] {
        &self.code
    }

    fn attempt_seizure(
        &mut self,
        _borrower: &Pubkey,
        _max_seizable: u64,
    ) -> Result<u64, ProgramError> {
        Ok(self.reported_value)
    }
}

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction = LendingInstruction::unpack(instruction_data)?;

    match instruction {
        LendingInstruction::InitializeMarket {
            base_asset,
            oracle_authority,
            price_max_age,
        } => {
            msg!("Instruction: InitializeMarket");
            process_initialize_market(
                program_id,
                accounts,
                base_asset,
                oracle_authority,
                price_max_age,
            )
        }

        LendingInstruction::PublishPrice { asset, value } => {
            msg!("Instruction: PublishPrice");
            process_publish_price(accounts, asset, value)
        }

        LendingInstruction::Deposit { amount } => {
            msg!("Instruction: Deposit");
            process_deposit(accounts, amount)
        }

        LendingInstruction::Withdraw { amount } => {
            msg!("Instruction: Withdraw");
            process_withdraw(accounts, amount)
        }

        LendingInstruction::AddCollateral { asset, amount } => {
            msg!("Instruction: AddCollateral");
            process_add_collateral(accounts, asset, amount)
        }

        LendingInstruction::Borrow { amount } => {
            msg!("Instruction: Borrow");
            process_borrow(accounts, amount)
        }

        LendingInstruction::Repay { amount } => {
            msg!("Instruction: Repay");
            process_repay(accounts, amount)
        }

        LendingInstruction::RegisterLiquidator => {
            msg!("Instruction: RegisterLiquidator");
            process_register_liquidator(accounts)
        }

        LendingInstruction::Liquidate {
            borrower,
            seize_value,
        } => {
            msg!("Instruction: Liquidate");
            process_liquidate(accounts, borrower, seize_value)
        }

        LendingInstruction::EmitLoanStatus { user } => {
            msg!("Instruction: EmitLoanStatus");
            process_emit_loan_status(accounts, user)
        }

        LendingInstruction::UpdateRiskParameters {
            min_collateral_ratio,
            liquidation_threshold,
            interest_rate_bps,
        } => {
            msg!("Instruction: UpdateRiskParameters");
            process_update_risk_parameters(
                accounts,
                min_collateral_ratio,
                liquidation_threshold,
                interest_rate_bps,
            )
        }

        LendingInstruction::SetEmergencyHalt { halt } => {
            msg!("Instruction: SetEmergencyHalt");
            process_set_emergency_halt(accounts, halt)
        }
    }
}

fn create_state_account<'a>(
    program_id: &Pubkey,
    payer: &AccountInfo<'a>,
    target: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    rent: &Rent,
    space: usize,
) -> ProgramResult {
    let required_lamports = rent.minimum_balance(space);

    invoke(
        &system_instruction::create_account(
            payer.key,
            target.key,
            required_lamports,
            space as u64,
            program_id,
        ),
        &[payer.clone(), target.clone(), system_program.clone()],
    )
}

fn process_initialize_market(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    base_asset: Pubkey,
    oracle_authority: Pubkey,
    price_max_age: i64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let authority_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let price_book_info = next_account_info(account_info_iter)?;
    let registry_info = next_account_info(account_info_iter)?;
    let system_program = next_account_info(account_info_iter)?;
    let rent_sysvar = next_account_info(account_info_iter)?;

    if !authority_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let rent = &Rent::from_account_info(rent_sysvar)?;

    create_state_account(
        program_id,
        authority_info,
        market_info,
        system_program,
        rent,
        MarketConfig::LEN,
    )?;
    create_state_account(
        program_id,
        authority_info,
        ledger_info,
        system_program,
        rent,
        Ledger::LEN,
    )?;
    create_state_account(
        program_id,
        authority_info,
        price_book_info,
        system_program,
        rent,
        PriceBook::LEN,
    )?;
    create_state_account(
        program_id,
        authority_info,
        registry_info,
        system_program,
        rent,
        LiquidatorRegistry::LEN,
    )?;

    let mut config = MarketConfig::default(*authority_info.key, base_asset);
    config.last_update = Clock::get()?.unix_timestamp;
    config.validate()?;
    config.store(&mut market_info.data.borrow_mut()[..])?;

    Ledger::new().store(&mut ledger_info.data.borrow_mut()[..])?;
    PriceBook::new(oracle_authority, price_max_age).store(&mut price_book_info.data.borrow_mut()[..])?;
    LiquidatorRegistry::new().store(&mut registry_info.data.borrow_mut()[..])?;

    msg!(
        "Market initialized: min ratio {}%, liquidation threshold {}%",
        config.min_collateral_ratio,
        config.liquidation_threshold
    );

    Ok(())
}

fn process_publish_price(accounts: &[AccountInfo], asset: Pubkey, value: u64) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let oracle_info = next_account_info(account_info_iter)?;
    let price_book_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    if !oracle_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let mut book = PriceBook::load(&price_book_info.data.borrow()[..])?;

    if book.oracle_authority != *oracle_info.key {
        return Err(LendingError::InvalidAuthority.into());
    }

    let clock = &Clock::from_account_info(clock_sysvar)?;
    book.publish(&asset, value, clock.unix_timestamp)?;
    book.store(&mut price_book_info.data.borrow_mut()[..])?;

    msg!("Price published: {} = {}", asset, value);

    Ok(())
}

fn process_deposit(accounts: &[AccountInfo], amount: u64) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    MarketConfig::load(&market_info.data.borrow()[..])?;

    let mut ledger = Ledger::load(&ledger_info.data.borrow()[..])?;
    let clock = &Clock::from_account_info(clock_sysvar)?;

    LendingEngine::deposit(&mut ledger, user_info.key, amount, clock.unix_timestamp)?;
    ledger.store(&mut ledger_info.data.borrow_mut()[..])?;

    msg!("Deposited {} for {}", amount, user_info.key);

    Ok(())
}

fn process_withdraw(accounts: &[AccountInfo], amount: u64) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let price_book_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let config = MarketConfig::load(&market_info.data.borrow()[..])?;
    let mut ledger = Ledger::load(&ledger_info.data.borrow()[..])?;
    let book = PriceBook::load(&price_book_info.data.borrow()[..])?;
    let clock = &Clock::from_account_info(clock_sysvar)?;

    let gate = SignerGate {
        signed: user_info.is_signer,
    };

    LendingEngine::withdraw(
        &mut ledger,
        &config,
        &book,
        &gate,
        user_info.key,
        amount,
        clock.unix_timestamp,
    )?;
    ledger.store(&mut ledger_info.data.borrow_mut()[..])?;

    msg!("Withdrew {} for {}", amount, user_info.key);

    Ok(())
}

fn process_add_collateral(accounts: &[AccountInfo], asset: Pubkey, amount: u64) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    MarketConfig::load(&market_info.data.borrow()[..])?;

    let mut ledger = Ledger::load(&ledger_info.data.borrow()[..])?;
    LendingEngine::add_collateral(&mut ledger, user_info.key, &asset, amount)?;
    ledger.store(&mut ledger_info.data.borrow_mut()[..])?;

    msg!("Collateral added: {} units of {}", amount, asset);

    Ok(())
}

fn process_borrow(accounts: &[AccountInfo], amount: u64) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let price_book_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let mut config = MarketConfig::load(&market_info.data.borrow()[..])?;
    let mut ledger = Ledger::load(&ledger_info.data.borrow()[..])?;
    let book = PriceBook::load(&price_book_info.data.borrow()[..])?;
    let clock = &Clock::from_account_info(clock_sysvar)?;

    LendingEngine::borrow(
        &mut ledger,
        &config,
        &book,
        user_info.key,
        amount,
        clock.unix_timestamp,
    )?;

    config.total_borrows += 1;

    ledger.store(&mut ledger_info.data.borrow_mut()[..])?;
    config.store(&mut market_info.data.borrow_mut()[..])?;

    msg!("Borrowed {} for {}", amount, user_info.key);

    Ok(())
}

fn process_repay(accounts: &[AccountInfo], amount: u64) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let user_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    if !user_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let config = MarketConfig::load(&market_info.data.borrow()[..])?;
    let mut ledger = Ledger::load(&ledger_info.data.borrow()[..])?;
    let clock = &Clock::from_account_info(clock_sysvar)?;

    let outcome = LendingEngine::repay(
        &mut ledger,
        &config,
        user_info.key,
        amount,
        clock.unix_timestamp,
    )?;
    ledger.store(&mut ledger_info.data.borrow_mut()[..])?;

    msg!(
        "Repaid {} for {}, remaining debt {}, closed {}",
        outcome.applied,
        user_info.key,
        outcome.remaining_debt,
        outcome.loan_closed
    );

    Ok(())
}

fn process_register_liquidator(accounts: &[AccountInfo]) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let authority_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let registry_info = next_account_info(account_info_iter)?;
    let liquidator_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    if !authority_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let config = MarketConfig::load(&market_info.data.borrow()[..])?;
    let mut registry = LiquidatorRegistry::load(&registry_info.data.borrow()[..])?;
    let clock = &Clock::from_account_info(clock_sysvar)?;

    let governance = AuthorityGovernance {
        approved: config.authority == *authority_info.key,
    };

    let liquidator = ProgramAccountLiquidator {
        identity: *liquidator_info.key,
        code: liquidator_info.data.borrow().to_vec(),
        reported_value: 0,
    };

    LiquidationCoordinator::register_verified_liquidator(
        &mut registry,
        &liquidator,
        &governance,
        clock.unix_timestamp,
    )?;
    registry.store(&mut registry_info.data.borrow_mut()[..])?;

    Ok(())
}

fn process_liquidate(
    accounts: &[AccountInfo],
    borrower: Pubkey,
    seize_value: u64,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let operator_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let price_book_info = next_account_info(account_info_iter)?;
    let registry_info = next_account_info(account_info_iter)?;
    let liquidator_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    if !operator_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let mut config = MarketConfig::load(&market_info.data.borrow()[..])?;
    let mut ledger = Ledger::load(&ledger_info.data.borrow()[..])?;
    let book = PriceBook::load(&price_book_info.data.borrow()[..])?;
    let registry = LiquidatorRegistry::load(&registry_info.data.borrow()[..])?;
    let clock = &Clock::from_account_info(clock_sysvar)?;

    let mut liquidator = ProgramAccountLiquidator {
        identity: *liquidator_info.key,
        code: liquidator_info.data.borrow().to_vec(),
        reported_value: seize_value,
    };

    let receipt = LiquidationCoordinator::liquidate(
        &mut ledger,
        &config,
        &book,
        &registry,
        &mut liquidator,
        &borrower,
        clock.unix_timestamp,
    )?;

    config.total_liquidations += 1;

    ledger.store(&mut ledger_info.data.borrow_mut()[..])?;
    config.store(&mut market_info.data.borrow_mut()[..])?;

    msg!(
        "Liquidation complete: seized {} against {} debt",
        receipt.seized_value,
        receipt.debt_cleared
    );

    Ok(())
}

fn process_emit_loan_status(accounts: &[AccountInfo], user: Pubkey) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let market_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let price_book_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    let config = MarketConfig::load(&market_info.data.borrow()[..])?;
    let ledger = Ledger::load(&ledger_info.data.borrow()[..])?;
    let book = PriceBook::load(&price_book_info.data.borrow()[..])?;
    let clock = &Clock::from_account_info(clock_sysvar)?;

    let status =
        LendingEngine::loan_status_ascii(&ledger, &config, &book, &user, clock.unix_timestamp);
    msg!("{}", status);

    Ok(())
}

fn process_update_risk_parameters(
    accounts: &[AccountInfo],
    min_collateral_ratio: Option<u64>,
    liquidation_threshold: Option<u64>,
    interest_rate_bps: Option<u64>,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let authority_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    if !authority_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let mut config = MarketConfig::load(&market_info.data.borrow()[..])?;

    if config.authority != *authority_info.key {
        return Err(LendingError::InvalidAuthority.into());
    }

    if let Some(value) = min_collateral_ratio {
        config.min_collateral_ratio = value;
    }
    if let Some(value) = liquidation_threshold {
        config.liquidation_threshold = value;
    }
    if let Some(value) = interest_rate_bps {
        config.interest_rate_bps = value;
    }

    let clock = &Clock::from_account_info(clock_sysvar)?;
    config.last_update = clock.unix_timestamp;

    config.validate()?;
    config.store(&mut market_info.data.borrow_mut()[..])?;

    msg!("Risk parameters updated");

    Ok(())
}

fn process_set_emergency_halt(accounts: &[AccountInfo], halt: bool) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let authority_info = next_account_info(account_info_iter)?;
    let market_info = next_account_info(account_info_iter)?;
    let clock_sysvar = next_account_info(account_info_iter)?;

    if !authority_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let mut config = MarketConfig::load(&market_info.data.borrow()[..])?;

    if config.authority != *authority_info.key {
        return Err(LendingError::InvalidAuthority.into());
    }

    let clock = &Clock::from_account_info(clock_sysvar)?;
    config.emergency_halt = halt;
    config.last_update = clock.unix_timestamp;
    config.store(&mut market_info.data.borrow_mut()[..])?;

    msg!("Emergency halt {}", if halt { "ACTIVATED" } else { "deactivated" });

    Ok(())
}
