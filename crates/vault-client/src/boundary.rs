//! External collaborator boundaries.
//!
//! Everything the core needs from the outside world comes through these four
//! traits, so transports are swappable and tests run against in-memory fakes.
//! The HTTP implementations live in `rpc` and `service`.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ChunkDownload, CreateSessionRequest, CreateSessionResponse, Signature, SignatureStatus,
    SignedTransaction, TransactionRecord, UnsignedTransaction,
};

/// Ledger RPC boundary. One `get_signature_statuses` call covers an entire
/// confirmation round regardless of batch size.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn submit_transaction(&self, tx: &SignedTransaction) -> Result<Signature>;

    async fn simulate_transaction(&self, tx: &SignedTransaction) -> Result<()>;

    /// Statuses for a batch of signatures in one round trip; `None` means the
    /// ledger has not seen the signature yet.
    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>>;

    async fn get_account_info(&self, address: &str) -> Result<Option<Vec<u8>>>;

    /// Full transaction history for an address, failed transactions included.
    async fn get_transaction_history(&self, address: &str) -> Result<Vec<TransactionRecord>>;

    /// A fresh reference point (recent block reference) shared across a batch.
    async fn get_recent_reference(&self) -> Result<String>;
}

/// Session-creation service boundary. Returned transactions are opaque
/// signable payloads; the core never parses them.
#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse>;

    /// Direct chunk download for finalized sessions, the preferred
    /// acquisition path.
    async fn download_chunks(&self, session_handle: &str) -> Result<Vec<ChunkDownload>>;
}

/// Wallet boundary. Signing is local key work and stays synchronous.
pub trait WalletSigner: Send + Sync {
    /// The owner address used for fee paying and session ownership.
    fn owner(&self) -> String;

    fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction>;

    /// Sign a service-provided template without inspecting it.
    fn sign_template(&self, template_base64: &str) -> Result<SignedTransaction>;
}

/// Metadata index boundary: write-only from the core's perspective. The pair
/// is emitted once per finalized session and never read back.
#[async_trait]
pub trait MetadataSink: Send + Sync {
    async fn record(&self, logical_id: &str, session_handle: &str) -> Result<()>;
}

/// Sink for callers that keep no logical-id index.
pub struct NullMetadataSink;

#[async_trait]
impl MetadataSink for NullMetadataSink {
    async fn record(&self, _logical_id: &str, _session_handle: &str) -> Result<()> {
        Ok(())
    }
}
