//! Retrieval and reconstruction.
//!
//! FetchMetadata → AcquireChunks → Reassemble → DetectEncoding, with a
//! bounded metadata retry loop in front. Chunk acquisition is pluggable:
//! the service download endpoint when available, otherwise a scan of the
//! session account's transaction history that re-parses the StoreChunk
//! instruction layout. Arrival order is irrelevant — the embedded chunk
//! index is the only ordering truth.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chunk_vault::instruction::VaultInstruction;
use chunk_vault::state::{SessionState, SessionStatus};
use sha2::{Digest, Sha256};

use crate::boundary::{LedgerRpc, SessionService};
use crate::cache::ChunkCache;
use crate::config::VaultConfig;
use crate::encode::decode;
use crate::error::{Result, VaultClientError};
use crate::types::RetrievalResult;

/// How chunk bytes are acquired for a finalized session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSource {
    /// Ask the service's download endpoint. Preferred.
    ServiceDownload,
    /// Re-derive chunks from the session account's transaction history.
    HistoryScan,
}

pub struct VaultRetriever {
    config: VaultConfig,
    rpc: Arc<dyn LedgerRpc>,
    service: Arc<dyn SessionService>,
}

impl VaultRetriever {
    pub fn new(
        config: VaultConfig,
        rpc: Arc<dyn LedgerRpc>,
        service: Arc<dyn SessionService>,
    ) -> Self {
        Self {
            config,
            rpc,
            service,
        }
    }

    /// Reconstruct the payload stored under `session_handle`, consulting and
    /// filling `cache`.
    pub async fn retrieve(
        &self,
        cache: &mut ChunkCache,
        session_handle: &str,
        source: ChunkSource,
    ) -> Result<RetrievalResult> {
        if let Some(hit) = cache.get(session_handle) {
            tracing::debug!(session = %session_handle, "cache hit");
            return Ok(hit.clone());
        }

        let metadata = self.await_finalized(session_handle).await?;
        let pairs = match source {
            ChunkSource::ServiceDownload => self.download(session_handle).await?,
            ChunkSource::HistoryScan => self.scan_history(session_handle, &metadata).await?,
        };

        let stream = reassemble(session_handle, &metadata, pairs)?;
        let payload = decode(&stream)?;
        let result = RetrievalResult {
            payload,
            encoded_len: stream.len(),
            metadata,
        };
        cache.insert(session_handle, result.clone());
        Ok(result)
    }

    /// Bounded metadata loop: re-fetch while the session is missing or still
    /// Active, then fail naming the handle.
    async fn await_finalized(&self, session_handle: &str) -> Result<SessionState> {
        let attempts = self.config.metadata_retries + 1;
        let mut last_reason = String::from("account not found");
        for attempt in 1..=attempts {
            match self.rpc.get_account_info(session_handle).await {
                Ok(Some(data)) => {
                    let state = SessionState::read(&data)?;
                    if state.status == SessionStatus::Finalized {
                        return Ok(state);
                    }
                    tracing::info!(
                        session = %session_handle,
                        attempt,
                        "session not finalized yet"
                    );
                    if attempt == attempts {
                        return Err(VaultClientError::SessionNotFinalized {
                            handle: session_handle.to_string(),
                            attempts,
                        });
                    }
                }
                Ok(None) => {
                    tracing::warn!(session = %session_handle, attempt, "session account absent");
                    last_reason = "account not found".into();
                }
                Err(e) => {
                    tracing::warn!(session = %session_handle, attempt, "metadata fetch failed: {e}");
                    last_reason = e.to_string();
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.metadata_retry_delay).await;
            }
        }
        Err(VaultClientError::MetadataUnavailable {
            handle: session_handle.to_string(),
            reason: last_reason,
        })
    }

    async fn download(&self, session_handle: &str) -> Result<Vec<(u32, Vec<u8>)>> {
        let downloads = self.service.download_chunks(session_handle).await?;
        downloads
            .into_iter()
            .map(|c| {
                let bytes = STANDARD.decode(&c.data_base64).map_err(|e| {
                    VaultClientError::Service(format!(
                        "chunk {} payload is not valid base64: {e}",
                        c.chunk_index
                    ))
                })?;
                Ok((c.chunk_index, bytes))
            })
            .collect()
    }

    /// Fallback acquisition: walk the session account's history and pull
    /// `(chunk_index, bytes)` out of every successful StoreChunk instruction
    /// that names this session.
    async fn scan_history(
        &self,
        session_handle: &str,
        metadata: &SessionState,
    ) -> Result<Vec<(u32, Vec<u8>)>> {
        let records = self.rpc.get_transaction_history(session_handle).await?;
        let mut pairs = Vec::new();
        for record in records {
            if record.err.is_some() {
                continue; // failed attempt; its bytes never counted
            }
            for instruction in &record.instructions {
                match VaultInstruction::unpack(&instruction.data) {
                    Ok(VaultInstruction::StoreChunk {
                        session_id,
                        chunk_index,
                        data,
                        ..
                    }) if session_id == metadata.session_id => {
                        pairs.push((chunk_index, data));
                    }
                    // Other instructions and foreign payloads are expected
                    // in a shared history; skip them.
                    _ => {}
                }
            }
        }
        Ok(pairs)
    }
}

/// Sort by index, reject holes/count drift, verify the digest, and return
/// the contiguous encoded stream.
fn reassemble(
    session_handle: &str,
    metadata: &SessionState,
    pairs: Vec<(u32, Vec<u8>)>,
) -> Result<Vec<u8>> {
    let mut by_index: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
    for (index, bytes) in pairs {
        if index >= metadata.total_chunks {
            tracing::warn!(
                session = %session_handle,
                index,
                declared = metadata.total_chunks,
                "ignoring chunk outside the declared range"
            );
            continue;
        }
        // Duplicates come from retried uploads; first confirmed copy wins.
        by_index.entry(index).or_insert(bytes);
    }

    let observed = by_index.len() as u32;
    if observed != metadata.total_chunks {
        tracing::warn!(
            session = %session_handle,
            declared = metadata.total_chunks,
            observed,
            "chunk count mismatch; refusing to reassemble"
        );
        return Err(VaultClientError::ChunkCountMismatch {
            declared: metadata.total_chunks,
            observed,
        });
    }

    // Keys are dense 0..total_chunks here, so in-order concatenation is the
    // original stream.
    let stream: Vec<u8> = by_index.into_values().flatten().collect();
    let computed: [u8; 32] = Sha256::digest(&stream).into();
    if computed != metadata.digest {
        return Err(VaultClientError::DigestMismatch {
            expected: hex::encode(metadata.digest),
            computed: hex::encode(computed),
        });
    }
    Ok(stream)
}
