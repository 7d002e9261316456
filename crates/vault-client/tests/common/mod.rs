//! Shared in-memory fakes for the upload/download scenarios.
//!
//! The mock ledger executes the same instruction layout the real program
//! validates: templates and built transactions travel as base64 JSON, chunk
//! instructions are unpacked with `VaultInstruction`, and session accounts
//! are real 85-byte layouts readable by the client's own parser.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use chunk_vault::instruction::VaultInstruction;
use chunk_vault::state::{
    SessionState, SessionStatus, StorageState, SESSION_ACCOUNT_SPACE, STATUS_OFFSET,
    STORAGE_ACCOUNT_SPACE,
};
use vault_client::boundary::{LedgerRpc, MetadataSink, SessionService, WalletSigner};
use vault_client::error::{Result, VaultClientError};
use vault_client::types::{
    ChunkDownload, ChunkTxTemplate, ConfirmationLevel, CreateSessionRequest,
    CreateSessionResponse, InstructionData, Signature, SignatureStatus, SignedTransaction,
    TransactionRecord, UnsignedTransaction,
};
use vault_client::VaultConfig;

pub const PROGRAM_ID: &str = "GuYTwBZkmNBp7RFphRTXFbTcJeuhLMH3m79swU2XHSzo";

/// Fast timings so paused-clock tests stay snappy.
pub fn test_config() -> VaultConfig {
    VaultConfig {
        chunk_size: 675,
        batch_size: 5,
        batch_stagger: std::time::Duration::from_millis(5),
        sequential_delay: std::time::Duration::from_millis(5),
        confirm_interval: std::time::Duration::from_millis(10),
        confirm_timeout: std::time::Duration::from_secs(2),
        dispatch_rounds: 3,
        metadata_retries: 3,
        metadata_retry_delay: std::time::Duration::from_millis(10),
    }
}

fn hash32(s: &str) -> [u8; 32] {
    Sha256::digest(s.as_bytes()).into()
}

fn storage_address(owner: &str) -> String {
    format!("storage-{owner}")
}

/// Wire form both fakes understand: service templates and signer-built
/// transactions are base64 of this JSON.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
enum MockTx {
    #[serde(rename_all = "camelCase")]
    InitStorage { owner: String },
    #[serde(rename_all = "camelCase")]
    CreateSession {
        handle: String,
        owner: String,
        session_id_hex: String,
        total_chunks: u32,
        digest_hex: String,
    },
    #[serde(rename_all = "camelCase")]
    Finalize { handle: String },
    #[serde(rename_all = "camelCase")]
    Built {
        program_id: String,
        accounts: Vec<String>,
        data_base64: String,
    },
}

fn encode_mock_tx(tx: &MockTx) -> String {
    STANDARD.encode(serde_json::to_vec(tx).expect("mock tx serializes"))
}

#[derive(Default)]
struct LedgerInner {
    accounts: HashMap<String, Vec<u8>>,
    statuses: HashMap<String, SignatureStatus>,
    history: HashMap<String, Vec<TransactionRecord>>,
    /// chunk_index → remaining scripted confirmation failures.
    fail_chunks: HashMap<u32, u32>,
    /// Sizes of every batched status query, in order.
    status_query_sizes: Vec<usize>,
    next_sig: u64,
    next_ref: u64,
    account_reads: u64,
    /// While positive, account reads report Active even if finalized.
    force_active_reads: u32,
}

#[derive(Default)]
pub struct MockLedger {
    inner: Mutex<LedgerInner>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the next `times` submissions of `chunk_index` to fail on
    /// confirmation (the submit itself is accepted).
    pub fn fail_chunk(&self, chunk_index: u32, times: u32) {
        self.inner
            .lock()
            .unwrap()
            .fail_chunks
            .insert(chunk_index, times);
    }

    /// Make the next `reads` account fetches report Active regardless of the
    /// stored status byte.
    pub fn force_active_reads(&self, reads: u32) {
        self.inner.lock().unwrap().force_active_reads = reads;
    }

    pub fn account_reads(&self) -> u64 {
        self.inner.lock().unwrap().account_reads
    }

    pub fn status_query_sizes(&self) -> Vec<usize> {
        self.inner.lock().unwrap().status_query_sizes.clone()
    }

    /// Seed a session account directly, bypassing the upload path.
    pub fn seed_session(&self, handle: &str, state: &SessionState) {
        let mut data = vec![0u8; SESSION_ACCOUNT_SPACE];
        state.write(&mut data).unwrap();
        self.inner
            .lock()
            .unwrap()
            .accounts
            .insert(handle.to_string(), data);
    }

    /// Seed one history record directly, bypassing the upload path.
    pub fn seed_chunk_history(&self, handle: &str, session_id: [u8; 16], index: u32, bytes: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_sig += 1;
        let signature = Signature(format!("seeded-{}", inner.next_sig));
        let data = VaultInstruction::StoreChunk {
            session_id,
            chunk_index: index,
            method: 0,
            data: bytes.to_vec(),
        }
        .pack();
        inner
            .history
            .entry(handle.to_string())
            .or_default()
            .push(TransactionRecord {
                signature,
                err: None,
                instructions: vec![InstructionData {
                    program_id: PROGRAM_ID.to_string(),
                    accounts: vec![handle.to_string()],
                    data,
                }],
            });
    }

    fn next_signature(inner: &mut LedgerInner, err: Option<String>) -> Signature {
        inner.next_sig += 1;
        let signature = Signature(format!("sig-{}", inner.next_sig));
        inner.statuses.insert(
            signature.0.clone(),
            SignatureStatus {
                level: ConfirmationLevel::Confirmed,
                err,
            },
        );
        signature
    }

    fn execute(&self, payload_base64: &str) -> Result<Signature> {
        let raw = STANDARD
            .decode(payload_base64)
            .map_err(|e| VaultClientError::Rpc {
                code: None,
                message: format!("malformed payload: {e}"),
            })?;
        let tx: MockTx = serde_json::from_slice(&raw).map_err(|e| VaultClientError::Rpc {
            code: None,
            message: format!("unrecognized payload: {e}"),
        })?;
        let mut inner = self.inner.lock().unwrap();
        match tx {
            MockTx::InitStorage { owner } => {
                let address = storage_address(&owner);
                if inner.accounts.contains_key(&address) {
                    return Err(VaultClientError::Rpc {
                        code: Some(chunk_vault::error::VaultError::AlreadyInitialized as u32),
                        message: "owner storage already initialized".into(),
                    });
                }
                let mut data = vec![0u8; STORAGE_ACCOUNT_SPACE];
                StorageState {
                    owner: hash32(&owner),
                    sessions_created: 0,
                }
                .write(&mut data)
                .unwrap();
                inner.accounts.insert(address, data);
                Ok(Self::next_signature(&mut inner, None))
            }
            MockTx::CreateSession {
                handle,
                owner,
                session_id_hex,
                total_chunks,
                digest_hex,
            } => {
                let mut session_id = [0u8; 16];
                session_id.copy_from_slice(&hex::decode(session_id_hex).unwrap());
                let mut digest = [0u8; 32];
                digest.copy_from_slice(&hex::decode(digest_hex).unwrap());
                let mut data = vec![0u8; SESSION_ACCOUNT_SPACE];
                SessionState {
                    owner: hash32(&owner),
                    session_id,
                    total_chunks,
                    digest,
                    status: SessionStatus::Active,
                }
                .write(&mut data)
                .unwrap();
                inner.accounts.insert(handle, data);
                Ok(Self::next_signature(&mut inner, None))
            }
            MockTx::Finalize { handle } => {
                let data = inner
                    .accounts
                    .get_mut(&handle)
                    .ok_or_else(|| VaultClientError::Rpc {
                        code: None,
                        message: format!("finalize: unknown session {handle}"),
                    })?;
                data[STATUS_OFFSET] = SessionStatus::Finalized.as_byte();
                Ok(Self::next_signature(&mut inner, None))
            }
            MockTx::Built {
                program_id,
                accounts,
                data_base64,
            } => {
                let data = STANDARD.decode(&data_base64).unwrap();
                let instruction =
                    VaultInstruction::unpack(&data).map_err(|e| VaultClientError::Rpc {
                        code: None,
                        message: format!("instruction: {e}"),
                    })?;
                let VaultInstruction::StoreChunk {
                    session_id,
                    chunk_index,
                    ..
                } = &instruction
                else {
                    return Err(VaultClientError::Rpc {
                        code: None,
                        message: "mock ledger only executes StoreChunk directly".into(),
                    });
                };
                let handle = accounts
                    .first()
                    .cloned()
                    .ok_or_else(|| VaultClientError::Rpc {
                        code: None,
                        message: "chunk transaction names no session account".into(),
                    })?;
                let session_data =
                    inner
                        .accounts
                        .get(&handle)
                        .ok_or_else(|| VaultClientError::Rpc {
                            code: None,
                            message: format!("unknown session {handle}"),
                        })?;
                let state = SessionState::read(session_data).unwrap();
                assert_eq!(state.session_id, *session_id, "session id mismatch");
                assert!(*chunk_index < state.total_chunks, "index out of range");
                assert_eq!(state.status, SessionStatus::Active, "session not active");

                let scripted_failure = match inner.fail_chunks.get_mut(chunk_index) {
                    Some(remaining) if *remaining > 0 => {
                        *remaining -= 1;
                        true
                    }
                    _ => false,
                };
                let err = scripted_failure.then(|| "scripted chunk failure".to_string());
                let signature = Self::next_signature(&mut inner, err.clone());
                inner
                    .history
                    .entry(handle)
                    .or_default()
                    .push(TransactionRecord {
                        signature: signature.clone(),
                        err,
                        instructions: vec![InstructionData {
                            program_id,
                            accounts,
                            data,
                        }],
                    });
                Ok(signature)
            }
        }
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn submit_transaction(&self, tx: &SignedTransaction) -> Result<Signature> {
        self.execute(&tx.payload_base64)
    }

    async fn simulate_transaction(&self, _tx: &SignedTransaction) -> Result<()> {
        Ok(())
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_query_sizes.push(signatures.len());
        Ok(signatures
            .iter()
            .map(|s| inner.statuses.get(&s.0).cloned())
            .collect())
    }

    async fn get_account_info(&self, address: &str) -> Result<Option<Vec<u8>>> {
        let mut inner = self.inner.lock().unwrap();
        inner.account_reads += 1;
        let mut data = match inner.accounts.get(address) {
            Some(data) => data.clone(),
            None => return Ok(None),
        };
        if inner.force_active_reads > 0 && data.len() == SESSION_ACCOUNT_SPACE {
            inner.force_active_reads -= 1;
            data[STATUS_OFFSET] = SessionStatus::Active.as_byte();
        }
        Ok(Some(data))
    }

    async fn get_transaction_history(&self, address: &str) -> Result<Vec<TransactionRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.history.get(address).cloned().unwrap_or_default())
    }

    async fn get_recent_reference(&self) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_ref += 1;
        Ok(format!("ref-{}", inner.next_ref))
    }
}

/// Service fake: fabricates templates the mock ledger executes, and serves
/// downloads straight from the ledger's history.
pub struct MockSessionService {
    ledger: Arc<MockLedger>,
}

impl MockSessionService {
    pub fn new(ledger: Arc<MockLedger>) -> Arc<Self> {
        Arc::new(Self { ledger })
    }
}

#[async_trait]
impl SessionService for MockSessionService {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse> {
        let total_chunks = (request.payload_description.encoded_len as usize)
            .div_ceil(request.chunk_size_hint as usize) as u32;
        let handle = format!("session-{}", &request.session_id[..8]);
        let per_chunk_tx_templates = (0..total_chunks)
            .map(|chunk_index| ChunkTxTemplate {
                chunk_index,
                program_id: PROGRAM_ID.to_string(),
                accounts: vec![handle.clone(), request.owner_key.clone()],
            })
            .collect();
        Ok(CreateSessionResponse {
            session_id: request.session_id.clone(),
            session_handle: handle.clone(),
            create_session_tx: encode_mock_tx(&MockTx::CreateSession {
                handle: handle.clone(),
                owner: request.owner_key.clone(),
                session_id_hex: request.session_id.clone(),
                total_chunks,
                digest_hex: request.payload_description.content_digest.clone(),
            }),
            init_storage_tx: Some(encode_mock_tx(&MockTx::InitStorage {
                owner: request.owner_key.clone(),
            })),
            per_chunk_tx_templates,
            finalize_tx: encode_mock_tx(&MockTx::Finalize { handle }),
            content_digest: request.payload_description.content_digest.clone(),
            total_chunks,
        })
    }

    async fn download_chunks(&self, session_handle: &str) -> Result<Vec<ChunkDownload>> {
        let records = self.ledger.get_transaction_history(session_handle).await?;
        let mut downloads = Vec::new();
        for record in records {
            if record.err.is_some() {
                continue;
            }
            for instruction in &record.instructions {
                if let Ok(VaultInstruction::StoreChunk {
                    chunk_index, data, ..
                }) = VaultInstruction::unpack(&instruction.data)
                {
                    downloads.push(ChunkDownload {
                        chunk_index,
                        data_base64: STANDARD.encode(data),
                    });
                }
            }
        }
        Ok(downloads)
    }
}

/// Signer fake: no real cryptography, just the wire form the mock ledger
/// executes.
pub struct TestSigner {
    owner: String,
}

impl TestSigner {
    pub fn new(owner: &str) -> Arc<Self> {
        Arc::new(Self {
            owner: owner.to_string(),
        })
    }
}

impl WalletSigner for TestSigner {
    fn owner(&self) -> String {
        self.owner.clone()
    }

    fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction> {
        let instruction = tx
            .instructions
            .first()
            .ok_or_else(|| VaultClientError::Signing("transaction has no instructions".into()))?;
        Ok(SignedTransaction {
            payload_base64: encode_mock_tx(&MockTx::Built {
                program_id: instruction.program_id.clone(),
                accounts: instruction.accounts.clone(),
                data_base64: STANDARD.encode(&instruction.data),
            }),
        })
    }

    fn sign_template(&self, template_base64: &str) -> Result<SignedTransaction> {
        Ok(SignedTransaction {
            payload_base64: template_base64.to_string(),
        })
    }
}

/// Metadata sink that remembers what was emitted.
#[derive(Default)]
pub struct RecordingSink {
    pub records: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl MetadataSink for RecordingSink {
    async fn record(&self, logical_id: &str, session_handle: &str) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .push((logical_id.to_string(), session_handle.to_string()));
        Ok(())
    }
}
