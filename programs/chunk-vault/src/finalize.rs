//! FinalizeSession: the one-way Active → Finalized transition.
//!
//! Downloads refuse non-finalized sessions, so this is the gate that makes an
//! upload retrievable. A second finalize is an error, not a no-op; the client
//! must never see a backward transition.

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    pubkey::Pubkey,
};

use crate::chunk::checked_session;
use crate::error::VaultError;
use crate::state::{SessionStatus, SESSION_ID_LEN, STATUS_OFFSET};

pub fn handle_finalize_session(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    session_id: [u8; SESSION_ID_LEN],
) -> ProgramResult {
    let iter = &mut accounts.iter();
    let session = next_account_info(iter)?;
    let owner = next_account_info(iter)?;

    let state = checked_session(program_id, session, owner, &session_id)?;
    if state.status != SessionStatus::Active {
        return Err(VaultError::SessionFinalized.into());
    }

    session.try_borrow_mut_data()?[STATUS_OFFSET] = SessionStatus::Finalized.as_byte();
    msg!("session finalized ({} chunks)", state.total_chunks);
    Ok(())
}
