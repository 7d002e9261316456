//! Provisioning instructions.
//!
//! InitStorage: one-time per-owner storage account; a second attempt fails
//! with `AlreadyInitialized` so clients can classify and swallow it.
//! CreateSession: allocates the 85-byte session header and pins the declared
//! chunk count and content digest for the lifetime of the session.

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::error::VaultError;
use crate::state::{
    SessionState, SessionStatus, StorageState, DIGEST_LEN, SESSION_ACCOUNT_SPACE, SESSION_ID_LEN,
    SESSION_SEED, STORAGE_ACCOUNT_SPACE, STORAGE_SEED,
};

fn create_pda<'a>(
    program_id: &Pubkey,
    payer: &AccountInfo<'a>,
    target: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    space: usize,
    seeds: &[&[u8]],
    bump: u8,
) -> ProgramResult {
    let rent = Rent::get()?;
    let bump_seed = [bump];
    let mut signer_seeds = seeds.to_vec();
    signer_seeds.push(&bump_seed);
    invoke_signed(
        &system_instruction::create_account(
            payer.key,
            target.key,
            rent.minimum_balance(space),
            space as u64,
            program_id,
        ),
        &[payer.clone(), target.clone(), system_program.clone()],
        &[&signer_seeds],
    )
}

pub fn handle_init_storage(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
    let iter = &mut accounts.iter();
    let storage = next_account_info(iter)?;
    let owner = next_account_info(iter)?;
    let system_program = next_account_info(iter)?;

    if !owner.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    let (expected, bump) =
        Pubkey::find_program_address(&[STORAGE_SEED, owner.key.as_ref()], program_id);
    if expected != *storage.key {
        return Err(ProgramError::InvalidSeeds);
    }
    if !storage.data_is_empty() {
        return Err(VaultError::AlreadyInitialized.into());
    }

    create_pda(
        program_id,
        owner,
        storage,
        system_program,
        STORAGE_ACCOUNT_SPACE,
        &[STORAGE_SEED, owner.key.as_ref()],
        bump,
    )?;

    let state = StorageState {
        owner: owner.key.to_bytes(),
        sessions_created: 0,
    };
    state
        .write(&mut storage.try_borrow_mut_data()?)
        .map_err(|_| VaultError::Layout)?;
    msg!("storage initialized for {}", owner.key);
    Ok(())
}

pub fn handle_create_session(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    session_id: [u8; SESSION_ID_LEN],
    total_chunks: u32,
    digest: [u8; DIGEST_LEN],
) -> ProgramResult {
    let iter = &mut accounts.iter();
    let session = next_account_info(iter)?;
    let storage = next_account_info(iter)?;
    let owner = next_account_info(iter)?;
    let system_program = next_account_info(iter)?;

    if !owner.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }
    if total_chunks == 0 {
        return Err(VaultError::InvalidChunkCount.into());
    }

    let (expected_storage, _) =
        Pubkey::find_program_address(&[STORAGE_SEED, owner.key.as_ref()], program_id);
    if expected_storage != *storage.key || storage.owner != program_id {
        return Err(VaultError::StorageUninitialized.into());
    }
    let mut storage_state =
        StorageState::read(&storage.try_borrow_data()?).map_err(|_| VaultError::Layout)?;
    if storage_state.owner != owner.key.to_bytes() {
        return Err(VaultError::OwnerMismatch.into());
    }

    let (expected_session, bump) = Pubkey::find_program_address(
        &[SESSION_SEED, owner.key.as_ref(), &session_id],
        program_id,
    );
    if expected_session != *session.key {
        return Err(ProgramError::InvalidSeeds);
    }
    if !session.data_is_empty() {
        return Err(VaultError::SessionExists.into());
    }

    create_pda(
        program_id,
        owner,
        session,
        system_program,
        SESSION_ACCOUNT_SPACE,
        &[SESSION_SEED, owner.key.as_ref(), &session_id],
        bump,
    )?;

    let state = SessionState {
        owner: owner.key.to_bytes(),
        session_id,
        total_chunks,
        digest,
        status: SessionStatus::Active,
    };
    state
        .write(&mut session.try_borrow_mut_data()?)
        .map_err(|_| VaultError::Layout)?;

    storage_state.sessions_created += 1;
    storage_state
        .write(&mut storage.try_borrow_mut_data()?)
        .map_err(|_| VaultError::Layout)?;

    msg!("session created: {} chunks declared", total_chunks);
    Ok(())
}
