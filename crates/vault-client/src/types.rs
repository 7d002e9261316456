//! Data model shared across the upload and retrieval paths.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use chunk_vault::state::{SessionState, SessionStatus};

/// Transaction signature as the ledger reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(pub String);

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Finality levels in increasing order; `Confirmed` is the lock-in point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfirmationLevel {
    Processed,
    Confirmed,
    Finalized,
}

#[derive(Debug, Clone)]
pub struct SignatureStatus {
    pub level: ConfirmationLevel,
    pub err: Option<String>,
}

impl SignatureStatus {
    pub fn is_confirmed(&self) -> bool {
        self.err.is_none() && self.level >= ConfirmationLevel::Confirmed
    }
}

/// One instruction inside a transaction, in the shape the ledger boundary
/// exchanges: program id and account addresses as strings, data as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionData {
    pub program_id: String,
    pub accounts: Vec<String>,
    pub data: Vec<u8>,
}

/// A transaction built locally and not yet signed.
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub recent_reference: String,
    pub fee_payer: String,
    pub instructions: Vec<InstructionData>,
}

/// A signed transaction as an opaque payload the ledger accepts verbatim.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub payload_base64: String,
}

/// One transaction from an account's history, as returned by the ledger
/// boundary. Failed transactions are included with `err` set so readers can
/// skip them.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub signature: Signature,
    pub err: Option<String>,
    pub instructions: Vec<InstructionData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Pending,
    Confirmed,
    Failed,
}

/// Bookkeeping for one submission attempt of one chunk. A chunk accumulates
/// one record per attempt; exactly one must end `Confirmed` for the session
/// to finalize.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub chunk_index: u32,
    /// `None` when the submit itself was rejected before a signature existed.
    pub signature: Option<Signature>,
    pub attempt: u32,
    pub outcome: DispatchOutcome,
}

/// Terminal output of a successful upload.
#[derive(Debug, Clone)]
pub struct StorageResult {
    pub session_handle: String,
    pub total_chunks: u32,
    /// Confirmed chunk signatures in index order, then the finalize signature.
    pub signatures: Vec<Signature>,
    /// Every dispatch attempt, failed ones included, for diagnostics.
    pub attempts: Vec<DispatchRecord>,
    pub content_digest: [u8; 32],
    pub compressed: bool,
    pub original_len: usize,
    pub encoded_len: usize,
}

/// Terminal output of a successful download.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub payload: Vec<u8>,
    pub encoded_len: usize,
    pub metadata: SessionState,
}

// ── Session-service wire types ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadDescription {
    pub encoded_len: u64,
    /// Hex of the 32-byte content digest over the full encoded stream.
    pub content_digest: String,
    pub method: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub owner_key: String,
    /// Hex of the 16-byte session id, generated client-side and echoed back.
    pub session_id: String,
    pub payload_description: PayloadDescription,
    pub chunk_size_hint: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkTxTemplate {
    pub chunk_index: u32,
    pub program_id: String,
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub session_handle: String,
    /// Opaque signable payloads; the client never inspects them.
    pub create_session_tx: String,
    #[serde(default)]
    pub init_storage_tx: Option<String>,
    pub per_chunk_tx_templates: Vec<ChunkTxTemplate>,
    pub finalize_tx: String,
    pub content_digest: String,
    pub total_chunks: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDownload {
    pub chunk_index: u32,
    pub data_base64: String,
}
