//! Account layouts and size constants.
//!
//! Both accounts use fixed offsets so clients can parse them straight out of
//! `getAccountInfo` data without a serde framework. Chunk bytes are never held
//! in an account; the transaction record is the storage medium and the session
//! account is the 85-byte header describing the chunk set.

// Session account: owner(32) | session_id(16) | total_chunks(u32) | digest(32) | status(1)
pub const OWNER_OFFSET: usize = 0;
pub const SESSION_ID_OFFSET: usize = 32;
pub const TOTAL_CHUNKS_OFFSET: usize = 48;
pub const DIGEST_OFFSET: usize = 52;
pub const STATUS_OFFSET: usize = 84;
pub const SESSION_ACCOUNT_SPACE: usize = 85;

// Storage account: owner(32) | sessions_created(u64)
pub const STORAGE_ACCOUNT_SPACE: usize = 40;

pub const SESSION_ID_LEN: usize = 16;
pub const DIGEST_LEN: usize = 32;

/// Hard cap on a single chunk; keeps every StoreChunk transaction well under
/// the ledger's per-transaction data limit.
pub const MAX_CHUNK_BYTES: usize = 900;

pub const SESSION_SEED: &[u8] = b"session";
pub const STORAGE_SEED: &[u8] = b"storage";

/// Byte-layout violations shared by account and instruction parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("data too short: {actual} < {expected} bytes")]
    TooShort { expected: usize, actual: usize },
    #[error("unknown session status byte {0}")]
    BadStatus(u8),
    #[error("unknown instruction discriminator {0}")]
    BadDiscriminator(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionStatus {
    Active = 0,
    Finalized = 1,
}

impl SessionStatus {
    pub fn from_byte(b: u8) -> Result<Self, LayoutError> {
        match b {
            0 => Ok(Self::Active),
            1 => Ok(Self::Finalized),
            other => Err(LayoutError::BadStatus(other)),
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Parsed session account. Immutable after creation except for `status`,
/// which only ever moves Active → Finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub owner: [u8; 32],
    pub session_id: [u8; SESSION_ID_LEN],
    pub total_chunks: u32,
    pub digest: [u8; DIGEST_LEN],
    pub status: SessionStatus,
}

impl SessionState {
    pub fn read(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() < SESSION_ACCOUNT_SPACE {
            return Err(LayoutError::TooShort {
                expected: SESSION_ACCOUNT_SPACE,
                actual: data.len(),
            });
        }
        let mut owner = [0u8; 32];
        owner.copy_from_slice(&data[OWNER_OFFSET..OWNER_OFFSET + 32]);
        let mut session_id = [0u8; SESSION_ID_LEN];
        session_id.copy_from_slice(&data[SESSION_ID_OFFSET..SESSION_ID_OFFSET + SESSION_ID_LEN]);
        let mut chunks_le = [0u8; 4];
        chunks_le.copy_from_slice(&data[TOTAL_CHUNKS_OFFSET..TOTAL_CHUNKS_OFFSET + 4]);
        let mut digest = [0u8; DIGEST_LEN];
        digest.copy_from_slice(&data[DIGEST_OFFSET..DIGEST_OFFSET + DIGEST_LEN]);
        Ok(Self {
            owner,
            session_id,
            total_chunks: u32::from_le_bytes(chunks_le),
            digest,
            status: SessionStatus::from_byte(data[STATUS_OFFSET])?,
        })
    }

    pub fn write(&self, data: &mut [u8]) -> Result<(), LayoutError> {
        if data.len() < SESSION_ACCOUNT_SPACE {
            return Err(LayoutError::TooShort {
                expected: SESSION_ACCOUNT_SPACE,
                actual: data.len(),
            });
        }
        data[OWNER_OFFSET..OWNER_OFFSET + 32].copy_from_slice(&self.owner);
        data[SESSION_ID_OFFSET..SESSION_ID_OFFSET + SESSION_ID_LEN]
            .copy_from_slice(&self.session_id);
        data[TOTAL_CHUNKS_OFFSET..TOTAL_CHUNKS_OFFSET + 4]
            .copy_from_slice(&self.total_chunks.to_le_bytes());
        data[DIGEST_OFFSET..DIGEST_OFFSET + DIGEST_LEN].copy_from_slice(&self.digest);
        data[STATUS_OFFSET] = self.status.as_byte();
        Ok(())
    }
}

/// Parsed per-owner storage account, provisioned once per owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageState {
    pub owner: [u8; 32],
    pub sessions_created: u64,
}

impl StorageState {
    pub fn read(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() < STORAGE_ACCOUNT_SPACE {
            return Err(LayoutError::TooShort {
                expected: STORAGE_ACCOUNT_SPACE,
                actual: data.len(),
            });
        }
        let mut owner = [0u8; 32];
        owner.copy_from_slice(&data[..32]);
        let mut count_le = [0u8; 8];
        count_le.copy_from_slice(&data[32..40]);
        Ok(Self {
            owner,
            sessions_created: u64::from_le_bytes(count_le),
        })
    }

    pub fn write(&self, data: &mut [u8]) -> Result<(), LayoutError> {
        if data.len() < STORAGE_ACCOUNT_SPACE {
            return Err(LayoutError::TooShort {
                expected: STORAGE_ACCOUNT_SPACE,
                actual: data.len(),
            });
        }
        data[..32].copy_from_slice(&self.owner);
        data[32..40].copy_from_slice(&self.sessions_created.to_le_bytes());
        Ok(())
    }
}
