// Collateralized lending risk and accounting engine
// Native Solana implementation - NO ANCHOR

pub mod engine;
pub mod error;
pub mod instruction;
pub mod liquidation;
pub mod math;
pub mod processor;
pub mod state;

use processor::process_instruction;

// Declare program ID
solana_program::declare_id!("LendCore11111111111111111111111111111111111");

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process_instruction);
