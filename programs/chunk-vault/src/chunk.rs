//! StoreChunk validation.
//!
//! The chunk bytes are deliberately NOT copied into any account: the signed
//! transaction carrying this instruction is the durable record, and readers
//! recover `(chunk_index, bytes)` pairs from transaction history. The handler
//! only enforces the session invariants.

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::error::VaultError;
use crate::state::{SessionState, SessionStatus, MAX_CHUNK_BYTES, SESSION_ID_LEN};

/// Common guard for chunk-path instructions: the session account must belong
/// to this program, match the claimed id, and be owned by the signer.
pub(crate) fn checked_session(
    program_id: &Pubkey,
    session: &AccountInfo,
    owner: &AccountInfo,
    session_id: &[u8; SESSION_ID_LEN],
) -> Result<SessionState, ProgramError> {
    if !owner.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    if session.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }
    let state =
        SessionState::read(&session.try_borrow_data()?).map_err(|_| VaultError::Layout)?;
    if state.owner != owner.key.to_bytes() {
        return Err(VaultError::OwnerMismatch.into());
    }
    if state.session_id != *session_id {
        return Err(VaultError::SessionIdMismatch.into());
    }
    Ok(state)
}

pub fn handle_store_chunk(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    session_id: [u8; SESSION_ID_LEN],
    chunk_index: u32,
    method: u8,
    data: &[u8],
) -> ProgramResult {
    let iter = &mut accounts.iter();
    let session = next_account_info(iter)?;
    let owner = next_account_info(iter)?;

    let state = checked_session(program_id, session, owner, &session_id)?;
    if state.status != SessionStatus::Active {
        return Err(VaultError::SessionFinalized.into());
    }
    if chunk_index >= state.total_chunks {
        return Err(VaultError::ChunkIndexOutOfRange.into());
    }
    if data.is_empty() || data.len() > MAX_CHUNK_BYTES {
        return Err(VaultError::ChunkSizeInvalid.into());
    }

    msg!(
        "chunk {}/{} accepted ({} bytes, method {})",
        chunk_index,
        state.total_chunks,
        data.len(),
        method
    );
    Ok(())
}
