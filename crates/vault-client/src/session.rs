//! Session negotiation.
//!
//! Creation is a prerequisite gate: no chunk dispatch begins until the
//! session account exists on the ledger and agrees with what the service
//! promised. The one-time storage initialization is idempotent from the
//! caller's point of view — "already initialized" is success, anything else
//! aborts before a single chunk is sent.

use chunk_vault::state::{SessionState, SESSION_ID_LEN};

use crate::boundary::{LedgerRpc, SessionService, WalletSigner};
use crate::config::VaultConfig;
use crate::confirm::ConfirmationTracker;
use crate::encode::EncodedPayload;
use crate::error::{Result, VaultClientError};
use crate::types::{
    ChunkTxTemplate, CreateSessionRequest, PayloadDescription, Signature,
};

/// Everything the dispatch phase needs from a freshly created session.
pub(crate) struct OpenSession {
    pub session_id: [u8; SESSION_ID_LEN],
    pub handle: String,
    pub chunk_templates: Vec<ChunkTxTemplate>,
    pub finalize_tx: String,
}

pub(crate) struct SessionManager<'a> {
    pub service: &'a dyn SessionService,
    pub rpc: &'a dyn LedgerRpc,
    pub signer: &'a dyn WalletSigner,
    pub config: &'a VaultConfig,
}

impl<'a> SessionManager<'a> {
    pub async fn open(&self, encoded: &EncodedPayload) -> Result<OpenSession> {
        let session_id: [u8; SESSION_ID_LEN] = *uuid::Uuid::new_v4().as_bytes();
        let chunk_count = encoded.chunk_count(self.config.chunk_size);

        let request = CreateSessionRequest {
            owner_key: self.signer.owner(),
            session_id: hex::encode(session_id),
            payload_description: PayloadDescription {
                encoded_len: encoded.stream.len() as u64,
                content_digest: hex::encode(encoded.digest),
                method: encoded.method.as_byte(),
            },
            chunk_size_hint: self.config.chunk_size as u32,
        };
        let response = self
            .service
            .create_session(&request)
            .await
            .map_err(|e| VaultClientError::SessionCreationFailed(e.to_string()))?;

        // Every later operation must agree with the declared chunk count.
        if response.total_chunks != chunk_count {
            return Err(VaultClientError::SessionCreationFailed(format!(
                "service declared {} chunks, encoder produced {}",
                response.total_chunks, chunk_count
            )));
        }
        if response.session_id != request.session_id {
            return Err(VaultClientError::SessionCreationFailed(
                "service echoed a different session id".into(),
            ));
        }
        if response.per_chunk_tx_templates.len() != chunk_count as usize
            || response
                .per_chunk_tx_templates
                .iter()
                .enumerate()
                .any(|(i, t)| t.chunk_index != i as u32)
        {
            return Err(VaultClientError::SessionCreationFailed(
                "per-chunk templates are not dense over the chunk range".into(),
            ));
        }

        if let Some(init_tx) = &response.init_storage_tx {
            self.ensure_storage_initialized(init_tx).await?;
        }

        let create_signature = self.submit_and_confirm(&response.create_session_tx).await?;
        tracing::info!(
            session = %response.session_handle,
            chunks = chunk_count,
            signature = %create_signature,
            "session created"
        );

        // Read-back gate: the session must be visible and match before any
        // chunk is dispatched.
        let account = self
            .rpc
            .get_account_info(&response.session_handle)
            .await?
            .ok_or_else(|| {
                VaultClientError::SessionCreationFailed(format!(
                    "session account {} absent after creation",
                    response.session_handle
                ))
            })?;
        let state = SessionState::read(&account)?;
        if state.session_id != session_id
            || state.total_chunks != chunk_count
            || state.digest != encoded.digest
        {
            return Err(VaultClientError::SessionCreationFailed(format!(
                "session account {} does not match the negotiated session",
                response.session_handle
            )));
        }

        Ok(OpenSession {
            session_id,
            handle: response.session_handle,
            chunk_templates: response.per_chunk_tx_templates,
            finalize_tx: response.finalize_tx,
        })
    }

    /// Provision the per-owner storage account, treating "already
    /// initialized" as success.
    async fn ensure_storage_initialized(&self, init_tx: &str) -> Result<()> {
        let signed = self.signer.sign_template(init_tx)?;
        // Preflight: a second init for this owner already surfaces here.
        if let Err(e) = self.rpc.simulate_transaction(&signed).await {
            if e.is_already_initialized() {
                tracing::debug!("owner storage already initialized");
                return Ok(());
            }
            return Err(VaultClientError::SessionCreationFailed(format!(
                "storage initialization simulation failed: {e}"
            )));
        }
        match self.rpc.submit_transaction(&signed).await {
            Ok(signature) => {
                let tracker = ConfirmationTracker::new(
                    self.rpc,
                    self.config.confirm_interval,
                    self.config.confirm_timeout,
                );
                let outcome = tracker.confirm(std::slice::from_ref(&signature)).await?;
                if outcome.confirmed.is_empty() {
                    return Err(VaultClientError::SessionCreationFailed(format!(
                        "storage initialization {signature} did not confirm"
                    )));
                }
                tracing::info!(signature = %signature, "owner storage initialized");
                Ok(())
            }
            Err(e) if e.is_already_initialized() => {
                tracing::debug!("owner storage already initialized");
                Ok(())
            }
            Err(e) => Err(VaultClientError::SessionCreationFailed(format!(
                "storage initialization rejected: {e}"
            ))),
        }
    }

    async fn submit_and_confirm(&self, template: &str) -> Result<Signature> {
        let signed = self.signer.sign_template(template)?;
        let signature = self
            .rpc
            .submit_transaction(&signed)
            .await
            .map_err(|e| VaultClientError::SessionCreationFailed(e.to_string()))?;
        let tracker = ConfirmationTracker::new(
            self.rpc,
            self.config.confirm_interval,
            self.config.confirm_timeout,
        );
        let outcome = tracker.confirm(std::slice::from_ref(&signature)).await?;
        if outcome.confirmed.is_empty() {
            return Err(VaultClientError::SessionCreationFailed(format!(
                "session creation {signature} did not confirm"
            )));
        }
        Ok(signature)
    }
}
