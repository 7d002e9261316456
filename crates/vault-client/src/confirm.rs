//! Confirmation tracking.
//!
//! One batched status query per round over every outstanding signature.
//! Confirmed is monotonic: once a signature locks in it leaves the pending
//! set and is never queried again. An error status fails immediately; a
//! missing status just means the ledger has not seen the signature yet.
//! Whatever is still pending when the wall-clock budget runs out is handed
//! back as failed so the retry loop can re-dispatch those chunks.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;

use crate::boundary::LedgerRpc;
use crate::error::Result;
use crate::types::Signature;

/// Outcome of one confirmation pass. Positions index into the input slice;
/// a position is in exactly one of the two sets.
#[derive(Debug, Clone, Default)]
pub struct ConfirmOutcome {
    pub confirmed: Vec<usize>,
    pub failed: Vec<usize>,
}

pub(crate) struct ConfirmationTracker<'a> {
    rpc: &'a dyn LedgerRpc,
    interval: Duration,
    timeout: Duration,
}

impl<'a> ConfirmationTracker<'a> {
    pub fn new(rpc: &'a dyn LedgerRpc, interval: Duration, timeout: Duration) -> Self {
        Self {
            rpc,
            interval,
            timeout,
        }
    }

    pub async fn confirm(&self, signatures: &[Signature]) -> Result<ConfirmOutcome> {
        let mut pending: BTreeSet<usize> = (0..signatures.len()).collect();
        let mut confirmed: Vec<usize> = Vec::new();
        let mut failed: Vec<usize> = Vec::new();
        let deadline = Instant::now() + self.timeout;
        let mut round = 0u32;

        while !pending.is_empty() {
            round += 1;
            let positions: Vec<usize> = pending.iter().copied().collect();
            let outstanding: Vec<Signature> =
                positions.iter().map(|&i| signatures[i].clone()).collect();
            // The one batched query of this round.
            let statuses = self.rpc.get_signature_statuses(&outstanding).await?;

            for (position, status) in positions.into_iter().zip(statuses) {
                match status {
                    None => {} // not yet seen; stays pending
                    Some(s) if s.err.is_some() => {
                        tracing::warn!(
                            signature = %signatures[position],
                            err = s.err.as_deref().unwrap_or(""),
                            "signature failed on ledger"
                        );
                        pending.remove(&position);
                        failed.push(position);
                    }
                    Some(s) if s.is_confirmed() => {
                        pending.remove(&position);
                        confirmed.push(position);
                    }
                    Some(_) => {} // processed but below the lock-in level
                }
            }

            if pending.is_empty() || Instant::now() + self.interval > deadline {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        if !pending.is_empty() {
            tracing::warn!(
                rounds = round,
                timed_out = pending.len(),
                "confirmation budget exhausted; treating remaining as failed"
            );
            failed.extend(pending);
        }
        Ok(ConfirmOutcome { confirmed, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConfirmationLevel, SignatureStatus, SignedTransaction, TransactionRecord};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted RPC: each confirm round pops the next status vector.
    struct ScriptedRpc {
        script: Mutex<Vec<Vec<Option<SignatureStatus>>>>,
        queries: Mutex<Vec<usize>>,
    }

    impl ScriptedRpc {
        fn new(script: Vec<Vec<Option<SignatureStatus>>>) -> Self {
            Self {
                script: Mutex::new(script),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerRpc for ScriptedRpc {
        async fn submit_transaction(&self, _tx: &SignedTransaction) -> Result<Signature> {
            unreachable!("tracker never submits")
        }
        async fn simulate_transaction(&self, _tx: &SignedTransaction) -> Result<()> {
            unreachable!()
        }
        async fn get_signature_statuses(
            &self,
            signatures: &[Signature],
        ) -> Result<Vec<Option<SignatureStatus>>> {
            self.queries.lock().unwrap().push(signatures.len());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Ok(vec![None; signatures.len()]);
            }
            Ok(script.remove(0))
        }
        async fn get_account_info(&self, _address: &str) -> Result<Option<Vec<u8>>> {
            unreachable!()
        }
        async fn get_transaction_history(
            &self,
            _address: &str,
        ) -> Result<Vec<TransactionRecord>> {
            unreachable!()
        }
        async fn get_recent_reference(&self) -> Result<String> {
            unreachable!()
        }
    }

    fn sigs(n: usize) -> Vec<Signature> {
        (0..n).map(|i| Signature(format!("sig-{i}"))).collect()
    }

    fn ok(level: ConfirmationLevel) -> Option<SignatureStatus> {
        Some(SignatureStatus { level, err: None })
    }

    fn failed() -> Option<SignatureStatus> {
        Some(SignatureStatus {
            level: ConfirmationLevel::Processed,
            err: Some("program error".into()),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_signatures_leave_the_pending_set() {
        let rpc = ScriptedRpc::new(vec![
            // Round 1: first confirms, second unseen, third only processed.
            vec![ok(ConfirmationLevel::Confirmed), None, ok(ConfirmationLevel::Processed)],
            // Round 2: only positions 1 and 2 are queried.
            vec![ok(ConfirmationLevel::Finalized), ok(ConfirmationLevel::Confirmed)],
        ]);
        let tracker = ConfirmationTracker::new(
            &rpc,
            Duration::from_millis(700),
            Duration::from_secs(30),
        );
        let outcome = tracker.confirm(&sigs(3)).await.unwrap();
        assert_eq!(outcome.confirmed, vec![0, 1, 2]);
        assert!(outcome.failed.is_empty());
        // Batched: one query per round, shrinking as signatures lock in.
        assert_eq!(*rpc.queries.lock().unwrap(), vec![3, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn error_status_fails_immediately_without_waiting() {
        let rpc = ScriptedRpc::new(vec![vec![
            ok(ConfirmationLevel::Confirmed),
            failed(),
        ]]);
        let tracker = ConfirmationTracker::new(
            &rpc,
            Duration::from_millis(700),
            Duration::from_secs(30),
        );
        let outcome = tracker.confirm(&sigs(2)).await.unwrap();
        assert_eq!(outcome.confirmed, vec![0]);
        assert_eq!(outcome.failed, vec![1]);
        // Everything resolved in round one; no second query.
        assert_eq!(*rpc.queries.lock().unwrap(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_converts_pending_to_failed() {
        let rpc = ScriptedRpc::new(vec![]); // never any status
        let tracker = ConfirmationTracker::new(
            &rpc,
            Duration::from_millis(500),
            Duration::from_secs(2),
        );
        let outcome = tracker.confirm(&sigs(2)).await.unwrap();
        assert!(outcome.confirmed.is_empty());
        assert_eq!(outcome.failed, vec![0, 1]);
        // Bounded: the loop cannot have run more than budget / interval rounds.
        assert!(rpc.queries.lock().unwrap().len() <= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn no_signature_is_both_confirmed_and_failed() {
        let rpc = ScriptedRpc::new(vec![
            vec![ok(ConfirmationLevel::Confirmed), None, failed()],
        ]);
        let tracker = ConfirmationTracker::new(
            &rpc,
            Duration::from_millis(100),
            Duration::from_millis(150),
        );
        let outcome = tracker.confirm(&sigs(3)).await.unwrap();
        for p in &outcome.confirmed {
            assert!(!outcome.failed.contains(p));
        }
        assert_eq!(outcome.confirmed.len() + outcome.failed.len(), 3);
    }
}
