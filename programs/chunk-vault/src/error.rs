//! Program errors with stable discriminants.
//!
//! Codes start at 1000 so clients can tell them apart from builtin program
//! errors when they come back through an RPC error payload. Clients match on
//! `AlreadyInitialized` to treat a second InitStorage for the same owner as
//! success.

use solana_program::program_error::ProgramError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[repr(u32)]
pub enum VaultError {
    #[error("owner storage already initialized")]
    AlreadyInitialized = 1000,
    #[error("session already exists")]
    SessionExists = 1001,
    #[error("declared chunk count must be nonzero")]
    InvalidChunkCount = 1002,
    #[error("signer does not own this session")]
    OwnerMismatch = 1003,
    #[error("session id mismatch")]
    SessionIdMismatch = 1004,
    #[error("session is already finalized")]
    SessionFinalized = 1005,
    #[error("chunk index out of declared range")]
    ChunkIndexOutOfRange = 1006,
    #[error("chunk is empty or exceeds the chunk size cap")]
    ChunkSizeInvalid = 1007,
    #[error("malformed account or instruction layout")]
    Layout = 1008,
    #[error("owner storage account not initialized")]
    StorageUninitialized = 1009,
}

impl From<VaultError> for ProgramError {
    fn from(e: VaultError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
