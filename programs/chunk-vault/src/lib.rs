//! # Module overview
//! On-chain side of the chunked payload store. A session account declares a
//! chunk count and content digest up front; chunks arrive as individual
//! StoreChunk transactions whose bytes stay in the ledger record; finalize
//! flips the session to retrievable.
//!
//! # Instruction set
//! init_storage: one-time per-owner storage account.
//! create_session: allocate the session header PDA for (owner, session_id).
//! store_chunk: validate one chunk transaction; ledger history is the store.
//! finalize_session: Active → Finalized, one way.
//!
//! Instruction data uses a single-byte discriminator and fixed field order
//! (see `instruction`), and accounts use fixed offsets (see `state`), so the
//! client crate parses both without this program's runtime.

use solana_program::{
    account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey,
};

pub mod error;
pub mod instruction;
pub mod state;

mod chunk;
mod finalize;
mod init;

use error::VaultError;
use instruction::VaultInstruction;

solana_program::declare_id!("GuYTwBZkmNBp7RFphRTXFbTcJeuhLMH3m79swU2XHSzo");

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process_instruction);

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction =
        VaultInstruction::unpack(instruction_data).map_err(|_| VaultError::Layout)?;
    match instruction {
        VaultInstruction::InitStorage => init::handle_init_storage(program_id, accounts),
        VaultInstruction::CreateSession {
            session_id,
            total_chunks,
            digest,
        } => init::handle_create_session(program_id, accounts, session_id, total_chunks, digest),
        VaultInstruction::StoreChunk {
            session_id,
            chunk_index,
            method,
            data,
        } => chunk::handle_store_chunk(program_id, accounts, session_id, chunk_index, method, &data),
        VaultInstruction::FinalizeSession { session_id } => {
            finalize::handle_finalize_session(program_id, accounts, session_id)
        }
    }
}
