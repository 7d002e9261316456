//! Upload orchestration.
//!
//! encode → session gate → bounded dispatch/confirm rounds → finalize.
//! The retry loop is an explicit state machine over the unresolved index
//! set: each round re-dispatches only what is still unconfirmed, with a
//! fresh reference point and new signatures, and the round count bounds
//! termination no matter how chunks keep failing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::boundary::{LedgerRpc, MetadataSink, SessionService, WalletSigner};
use crate::config::VaultConfig;
use crate::confirm::ConfirmationTracker;
use crate::dispatch::{ChunkWork, Dispatcher, DispatchStrategy};
use crate::encode::{encode, split_chunks, EncodingMethod};
use crate::error::{Result, VaultClientError};
use crate::session::{OpenSession, SessionManager};
use crate::types::{DispatchOutcome, DispatchRecord, Signature, StorageResult};

/// Options for one store call.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    pub compress: bool,
    pub strategy: DispatchStrategy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            compress: true,
            strategy: DispatchStrategy::FireAndForget,
        }
    }
}

/// Client-side uploader driving the session program through the service and
/// ledger boundaries.
pub struct VaultUploader {
    config: VaultConfig,
    rpc: Arc<dyn LedgerRpc>,
    service: Arc<dyn SessionService>,
    signer: Arc<dyn WalletSigner>,
    metadata: Arc<dyn MetadataSink>,
}

impl VaultUploader {
    pub fn new(
        config: VaultConfig,
        rpc: Arc<dyn LedgerRpc>,
        service: Arc<dyn SessionService>,
        signer: Arc<dyn WalletSigner>,
        metadata: Arc<dyn MetadataSink>,
    ) -> Self {
        Self {
            config,
            rpc,
            service,
            signer,
            metadata,
        }
    }

    /// Store `payload` under a new session and return the terminal result.
    /// Fails atomically from the caller's perspective: either every chunk
    /// confirmed and the session finalized, or an error names what did not.
    pub async fn store(
        &self,
        logical_id: &str,
        payload: &[u8],
        options: StoreOptions,
    ) -> Result<StorageResult> {
        let encoded = encode(payload, options.compress)?;
        let chunks = split_chunks(&encoded.stream, self.config.chunk_size)?;
        let total_chunks = chunks.len() as u32;
        tracing::info!(
            logical_id,
            total_chunks,
            original_len = encoded.original_len,
            encoded_len = encoded.stream.len(),
            compressed = (encoded.method == EncodingMethod::Deflate),
            "starting upload"
        );

        let manager = SessionManager {
            service: self.service.as_ref(),
            rpc: self.rpc.as_ref(),
            signer: self.signer.as_ref(),
            config: &self.config,
        };
        let session = manager.open(&encoded).await?;

        let dispatcher = Dispatcher {
            rpc: self.rpc.as_ref(),
            signer: self.signer.as_ref(),
            config: &self.config,
        };

        let mut attempts: Vec<DispatchRecord> = Vec::new();
        let mut confirmed: HashMap<u32, Signature> = HashMap::new();
        let mut unresolved: Vec<u32> = (0..total_chunks).collect();

        for round in 1..=self.config.dispatch_rounds {
            let work: Vec<ChunkWork<'_>> = unresolved
                .iter()
                .map(|&index| ChunkWork {
                    index,
                    bytes: &chunks[index as usize],
                    template: &session.chunk_templates[index as usize],
                })
                .collect();
            let records = dispatcher
                .run_round(
                    &session.session_id,
                    encoded.method.as_byte(),
                    &work,
                    options.strategy,
                    round,
                )
                .await?;

            for record in &records {
                if record.outcome == DispatchOutcome::Confirmed {
                    if let Some(signature) = &record.signature {
                        confirmed.insert(record.chunk_index, signature.clone());
                    }
                }
            }
            attempts.extend(records);
            unresolved.retain(|index| !confirmed.contains_key(index));

            if unresolved.is_empty() {
                break;
            }
            tracing::warn!(
                round,
                unresolved = ?unresolved,
                "dispatch round left unconfirmed chunks"
            );
        }

        if !unresolved.is_empty() {
            return Err(VaultClientError::UploadFailed {
                indices: unresolved,
            });
        }

        let finalize_signature = self.finalize(&session).await?;
        tracing::info!(
            session = %session.handle,
            signature = %finalize_signature,
            "session finalized"
        );

        // The index is a write-only collaborator; a failed write must not
        // undo a finalized upload.
        if let Err(e) = self.metadata.record(logical_id, &session.handle).await {
            tracing::warn!(session = %session.handle, "metadata index write failed: {e}");
        }

        let mut signatures: Vec<Signature> = (0..total_chunks)
            .filter_map(|index| confirmed.get(&index).cloned())
            .collect();
        signatures.push(finalize_signature);

        Ok(StorageResult {
            session_handle: session.handle,
            total_chunks,
            signatures,
            attempts,
            content_digest: encoded.digest,
            compressed: encoded.method == EncodingMethod::Deflate,
            original_len: encoded.original_len,
            encoded_len: encoded.stream.len(),
        })
    }

    /// Submit the closing transaction under the same submit-and-confirm
    /// discipline as a chunk. Failure leaves the session Active and must be
    /// surfaced, never swallowed.
    async fn finalize(&self, session: &OpenSession) -> Result<Signature> {
        let signed = self
            .signer
            .sign_template(&session.finalize_tx)
            .map_err(|e| VaultClientError::FinalizationFailed {
                handle: session.handle.clone(),
                reason: e.to_string(),
            })?;
        let signature = self
            .rpc
            .submit_transaction(&signed)
            .await
            .map_err(|e| VaultClientError::FinalizationFailed {
                handle: session.handle.clone(),
                reason: e.to_string(),
            })?;
        let tracker = ConfirmationTracker::new(
            self.rpc.as_ref(),
            self.config.confirm_interval,
            self.config.confirm_timeout,
        );
        let outcome = tracker.confirm(std::slice::from_ref(&signature)).await?;
        if outcome.confirmed.is_empty() {
            return Err(VaultClientError::FinalizationFailed {
                handle: session.handle.clone(),
                reason: format!("finalize transaction {signature} did not confirm"),
            });
        }
        Ok(signature)
    }
}
