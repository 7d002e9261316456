//! Chunk transaction dispatch.
//!
//! All three strategies produce the same logical outcome — every chunk
//! submitted and resolved — with different latency/rate trade-offs:
//!
//! * BatchedParallel: staggered concurrent submission in fixed-size groups,
//!   one group in flight unconfirmed at a time.
//! * Sequential: one chunk submitted and confirmed at a time; the fallback
//!   when parallel dispatch proves unreliable against an endpoint.
//! * FireAndForget: everything submitted up front, the whole signature set
//!   confirmed in a single tracker pass. Fastest.
//!
//! A round fetches one fresh reference point and reuses it across every
//! submission in that round. Submission order is best-effort only; the chunk
//! index embedded in each transaction is the sole ordering truth.

use chunk_vault::instruction::VaultInstruction;
use chunk_vault::state::SESSION_ID_LEN;
use futures::future::join_all;

use crate::boundary::{LedgerRpc, WalletSigner};
use crate::config::VaultConfig;
use crate::confirm::ConfirmationTracker;
use crate::error::Result;
use crate::types::{
    ChunkTxTemplate, DispatchOutcome, DispatchRecord, InstructionData, Signature,
    UnsignedTransaction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStrategy {
    BatchedParallel,
    Sequential,
    FireAndForget,
}

/// One chunk's work item for a dispatch round.
pub(crate) struct ChunkWork<'a> {
    pub index: u32,
    pub bytes: &'a [u8],
    pub template: &'a ChunkTxTemplate,
}

pub(crate) struct Dispatcher<'a> {
    pub rpc: &'a dyn LedgerRpc,
    pub signer: &'a dyn WalletSigner,
    pub config: &'a VaultConfig,
}

impl<'a> Dispatcher<'a> {
    /// Submit and resolve one round over `work`. Every work item comes back
    /// as exactly one record with outcome `Confirmed` or `Failed`.
    pub async fn run_round(
        &self,
        session_id: &[u8; SESSION_ID_LEN],
        method: u8,
        work: &[ChunkWork<'_>],
        strategy: DispatchStrategy,
        attempt: u32,
    ) -> Result<Vec<DispatchRecord>> {
        if work.is_empty() {
            return Ok(Vec::new());
        }
        let reference = self.rpc.get_recent_reference().await?;
        tracing::debug!(
            attempt,
            chunks = work.len(),
            ?strategy,
            reference = %reference,
            "dispatch round starting"
        );
        match strategy {
            DispatchStrategy::FireAndForget => {
                self.fire_and_forget(session_id, method, work, &reference, attempt)
                    .await
            }
            DispatchStrategy::BatchedParallel => {
                let mut records = Vec::with_capacity(work.len());
                for group in work.chunks(self.config.batch_size.max(1)) {
                    let group_records = self
                        .submit_group(session_id, method, group, &reference, attempt, true)
                        .await;
                    records.extend(self.resolve(group_records).await?);
                }
                Ok(records)
            }
            DispatchStrategy::Sequential => {
                let mut records = Vec::with_capacity(work.len());
                for item in work {
                    let submitted = self
                        .submit_one(session_id, method, item, &reference, attempt)
                        .await;
                    records.extend(self.resolve(vec![submitted]).await?);
                    tokio::time::sleep(self.config.sequential_delay).await;
                }
                Ok(records)
            }
        }
    }

    async fn fire_and_forget(
        &self,
        session_id: &[u8; SESSION_ID_LEN],
        method: u8,
        work: &[ChunkWork<'_>],
        reference: &str,
        attempt: u32,
    ) -> Result<Vec<DispatchRecord>> {
        let submitted = self
            .submit_group(session_id, method, work, reference, attempt, false)
            .await;
        self.resolve(submitted).await
    }

    /// Concurrently submit a group; with `stagger` each submission waits its
    /// slot so relative order is preserved without serializing round trips.
    async fn submit_group(
        &self,
        session_id: &[u8; SESSION_ID_LEN],
        method: u8,
        group: &[ChunkWork<'_>],
        reference: &str,
        attempt: u32,
        stagger: bool,
    ) -> Vec<DispatchRecord> {
        let futures = group.iter().enumerate().map(|(slot, item)| async move {
            if stagger {
                tokio::time::sleep(self.config.batch_stagger * slot as u32).await;
            }
            self.submit_one(session_id, method, item, reference, attempt)
                .await
        });
        join_all(futures).await
    }

    async fn submit_one(
        &self,
        session_id: &[u8; SESSION_ID_LEN],
        method: u8,
        item: &ChunkWork<'_>,
        reference: &str,
        attempt: u32,
    ) -> DispatchRecord {
        let tx = self.build_chunk_tx(session_id, method, item, reference);
        let signed = match self.signer.sign(&tx) {
            Ok(signed) => signed,
            Err(e) => {
                tracing::warn!(chunk = item.index, "signing failed: {e}");
                return DispatchRecord {
                    chunk_index: item.index,
                    signature: None,
                    attempt,
                    outcome: DispatchOutcome::Failed,
                };
            }
        };
        match self.rpc.submit_transaction(&signed).await {
            Ok(signature) => DispatchRecord {
                chunk_index: item.index,
                signature: Some(signature),
                attempt,
                outcome: DispatchOutcome::Pending,
            },
            Err(e) => {
                tracing::warn!(chunk = item.index, "submit rejected: {e}");
                DispatchRecord {
                    chunk_index: item.index,
                    signature: None,
                    attempt,
                    outcome: DispatchOutcome::Failed,
                }
            }
        }
    }

    /// Confirm every pending record in one tracker pass and fix outcomes.
    async fn resolve(&self, mut records: Vec<DispatchRecord>) -> Result<Vec<DispatchRecord>> {
        let pending: Vec<(usize, Signature)> = records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| match (r.outcome, &r.signature) {
                (DispatchOutcome::Pending, Some(signature)) => Some((i, signature.clone())),
                _ => None,
            })
            .collect();
        if pending.is_empty() {
            return Ok(records);
        }
        let signatures: Vec<Signature> = pending.iter().map(|(_, s)| s.clone()).collect();
        let tracker = ConfirmationTracker::new(
            self.rpc,
            self.config.confirm_interval,
            self.config.confirm_timeout,
        );
        let outcome = tracker.confirm(&signatures).await?;
        for position in outcome.confirmed {
            records[pending[position].0].outcome = DispatchOutcome::Confirmed;
        }
        for position in outcome.failed {
            records[pending[position].0].outcome = DispatchOutcome::Failed;
        }
        Ok(records)
    }

    /// Chunk transaction body: discriminator, session id, chunk index, method
    /// tag, raw bytes — in that order, because history scans parse it back.
    fn build_chunk_tx(
        &self,
        session_id: &[u8; SESSION_ID_LEN],
        method: u8,
        item: &ChunkWork<'_>,
        reference: &str,
    ) -> UnsignedTransaction {
        let data = VaultInstruction::StoreChunk {
            session_id: *session_id,
            chunk_index: item.index,
            method,
            data: item.bytes.to_vec(),
        }
        .pack();
        UnsignedTransaction {
            recent_reference: reference.to_string(),
            fee_payer: self.signer.owner(),
            instructions: vec![InstructionData {
                program_id: item.template.program_id.clone(),
                accounts: item.template.accounts.clone(),
                data,
            }],
        }
    }
}
