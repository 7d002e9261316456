//! Instruction encoding.
//!
//! Single-byte discriminator followed by fixed-order fields. The StoreChunk
//! layout is load-bearing beyond the program itself: clients re-parse it out
//! of transaction history to recover chunk bytes, so the field order
//! `discriminator | session_id | chunk_index | method | bytes` must stay
//! stable.

use crate::state::{LayoutError, DIGEST_LEN, SESSION_ID_LEN};

pub const DISC_INIT_STORAGE: u8 = 0;
pub const DISC_CREATE_SESSION: u8 = 1;
pub const DISC_STORE_CHUNK: u8 = 2;
pub const DISC_FINALIZE_SESSION: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultInstruction {
    /// Provision the one-time per-owner storage account.
    InitStorage,
    /// Create a session with a declared chunk count and content digest.
    CreateSession {
        session_id: [u8; SESSION_ID_LEN],
        total_chunks: u32,
        digest: [u8; DIGEST_LEN],
    },
    /// Record one chunk. The bytes live in the transaction record only.
    StoreChunk {
        session_id: [u8; SESSION_ID_LEN],
        chunk_index: u32,
        method: u8,
        data: Vec<u8>,
    },
    /// Mark the session's chunk set complete.
    FinalizeSession { session_id: [u8; SESSION_ID_LEN] },
}

fn take_session_id(data: &[u8], offset: usize) -> Result<[u8; SESSION_ID_LEN], LayoutError> {
    if data.len() < offset + SESSION_ID_LEN {
        return Err(LayoutError::TooShort {
            expected: offset + SESSION_ID_LEN,
            actual: data.len(),
        });
    }
    let mut id = [0u8; SESSION_ID_LEN];
    id.copy_from_slice(&data[offset..offset + SESSION_ID_LEN]);
    Ok(id)
}

fn take_u32(data: &[u8], offset: usize) -> Result<u32, LayoutError> {
    if data.len() < offset + 4 {
        return Err(LayoutError::TooShort {
            expected: offset + 4,
            actual: data.len(),
        });
    }
    let mut le = [0u8; 4];
    le.copy_from_slice(&data[offset..offset + 4]);
    Ok(u32::from_le_bytes(le))
}

impl VaultInstruction {
    pub fn pack(&self) -> Vec<u8> {
        match self {
            Self::InitStorage => vec![DISC_INIT_STORAGE],
            Self::CreateSession {
                session_id,
                total_chunks,
                digest,
            } => {
                let mut out = Vec::with_capacity(1 + SESSION_ID_LEN + 4 + DIGEST_LEN);
                out.push(DISC_CREATE_SESSION);
                out.extend_from_slice(session_id);
                out.extend_from_slice(&total_chunks.to_le_bytes());
                out.extend_from_slice(digest);
                out
            }
            Self::StoreChunk {
                session_id,
                chunk_index,
                method,
                data,
            } => {
                let mut out = Vec::with_capacity(1 + SESSION_ID_LEN + 4 + 1 + data.len());
                out.push(DISC_STORE_CHUNK);
                out.extend_from_slice(session_id);
                out.extend_from_slice(&chunk_index.to_le_bytes());
                out.push(*method);
                out.extend_from_slice(data);
                out
            }
            Self::FinalizeSession { session_id } => {
                let mut out = Vec::with_capacity(1 + SESSION_ID_LEN);
                out.push(DISC_FINALIZE_SESSION);
                out.extend_from_slice(session_id);
                out
            }
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, LayoutError> {
        let disc = *data.first().ok_or(LayoutError::TooShort {
            expected: 1,
            actual: 0,
        })?;
        match disc {
            DISC_INIT_STORAGE => Ok(Self::InitStorage),
            DISC_CREATE_SESSION => Ok(Self::CreateSession {
                session_id: take_session_id(data, 1)?,
                total_chunks: take_u32(data, 1 + SESSION_ID_LEN)?,
                digest: {
                    let off = 1 + SESSION_ID_LEN + 4;
                    if data.len() < off + DIGEST_LEN {
                        return Err(LayoutError::TooShort {
                            expected: off + DIGEST_LEN,
                            actual: data.len(),
                        });
                    }
                    let mut digest = [0u8; DIGEST_LEN];
                    digest.copy_from_slice(&data[off..off + DIGEST_LEN]);
                    digest
                },
            }),
            DISC_STORE_CHUNK => {
                let session_id = take_session_id(data, 1)?;
                let chunk_index = take_u32(data, 1 + SESSION_ID_LEN)?;
                let method_off = 1 + SESSION_ID_LEN + 4;
                if data.len() < method_off + 1 {
                    return Err(LayoutError::TooShort {
                        expected: method_off + 1,
                        actual: data.len(),
                    });
                }
                Ok(Self::StoreChunk {
                    session_id,
                    chunk_index,
                    method: data[method_off],
                    data: data[method_off + 1..].to_vec(),
                })
            }
            DISC_FINALIZE_SESSION => Ok(Self::FinalizeSession {
                session_id: take_session_id(data, 1)?,
            }),
            other => Err(LayoutError::BadDiscriminator(other)),
        }
    }
}
