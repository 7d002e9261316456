//! Client error taxonomy.
//!
//! Fatal vs recoverable is decided by the owning loop: dispatch failures and
//! confirmation timeouts feed the bounded retry rounds, `UploadFailed` is what
//! escapes when the budget runs out, and the read-path integrity variants
//! (`ChunkCountMismatch`, `DigestMismatch`) are never downgraded to warnings.

pub type Result<T> = std::result::Result<T, VaultClientError>;

#[derive(Debug, thiserror::Error)]
pub enum VaultClientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("session creation failed: {0}")]
    SessionCreationFailed(String),

    #[error("chunk dispatch failed: {0}")]
    ChunkDispatchFailed(String),

    #[error("confirmation timed out with {pending} signature(s) still pending")]
    ConfirmationTimeout { pending: usize },

    #[error("upload failed; unconfirmed chunk indices: {indices:?}")]
    UploadFailed { indices: Vec<u32> },

    #[error(
        "finalization failed for session {handle}: {reason}; \
         chunks are uploaded but the session is not yet retrievable"
    )]
    FinalizationFailed { handle: String, reason: String },

    #[error("session {handle} not finalized after {attempts} attempt(s)")]
    SessionNotFinalized { handle: String, attempts: u32 },

    #[error("session metadata unavailable for {handle}: {reason}")]
    MetadataUnavailable { handle: String, reason: String },

    #[error("chunk count mismatch: declared {declared}, observed {observed}")]
    ChunkCountMismatch { declared: u32, observed: u32 },

    #[error("content digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch { expected: String, computed: String },

    #[error("malformed encoded stream: {0}")]
    MalformedStream(String),

    #[error("session service error: {0}")]
    Service(String),

    #[error("ledger rpc error{}: {message}", code.map(|c| format!(" (code {c})")).unwrap_or_default())]
    Rpc { code: Option<u32>, message: String },

    #[error("wallet signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Layout(#[from] chunk_vault::state::LayoutError),
}

impl VaultClientError {
    pub(crate) fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc {
            code: None,
            message: message.into(),
        }
    }

    /// True when an RPC rejection means the per-owner storage account already
    /// exists: either the program's own code or the system program refusing to
    /// re-create the account.
    pub(crate) fn is_already_initialized(&self) -> bool {
        match self {
            Self::Rpc { code, message } => {
                *code == Some(chunk_vault::error::VaultError::AlreadyInitialized as u32)
                    || message.contains("already in use")
                    || message.contains("already initialized")
            }
            _ => false,
        }
    }
}
