//! JSON-RPC client for the ledger boundary.
//!
//! Speaks the broadcast gateway's JSON-RPC 2.0 surface: submitTransaction,
//! simulateTransaction, getSignatureStatuses, getAccountInfo,
//! getTransactionHistory, getRecentReference. Account data and instruction
//! data travel base64; the batched status call is the only status query the
//! confirmation tracker makes per round.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::boundary::LedgerRpc;
use crate::error::{Result, VaultClientError};
use crate::retry::retry_send;
use crate::types::{
    ConfirmationLevel, InstructionData, Signature, SignatureStatus, SignedTransaction,
    TransactionRecord,
};

#[derive(Debug, Clone)]
pub struct HttpLedgerRpc {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: Option<i64>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStatus {
    confirmation_status: String,
    #[serde(default)]
    err: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAccount {
    data_base64: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInstruction {
    program_id: String,
    accounts: Vec<String>,
    data_base64: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTransaction {
    signature: String,
    #[serde(default)]
    err: Option<String>,
    instructions: Vec<WireInstruction>,
}

impl HttpLedgerRpc {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VaultClientError::rpc(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let resp = retry_send(|| self.client.post(&self.url).json(&body).send())
            .await
            .map_err(|e| VaultClientError::rpc(format!("{method}: {e}")))?;
        let envelope: RpcEnvelope = resp
            .json()
            .await
            .map_err(|e| VaultClientError::rpc(format!("{method} response: {e}")))?;
        if let Some(err) = envelope.error {
            return Err(VaultClientError::Rpc {
                code: err.code.and_then(|c| u32::try_from(c).ok()),
                message: format!("{method}: {}", err.message),
            });
        }
        Ok(envelope.result)
    }

    fn parse<T: serde::de::DeserializeOwned>(method: &str, value: serde_json::Value) -> Result<T> {
        serde_json::from_value(value)
            .map_err(|e| VaultClientError::rpc(format!("{method} result shape: {e}")))
    }
}

fn level_from_wire(s: &str) -> ConfirmationLevel {
    match s {
        "finalized" => ConfirmationLevel::Finalized,
        "confirmed" => ConfirmationLevel::Confirmed,
        _ => ConfirmationLevel::Processed,
    }
}

#[async_trait]
impl LedgerRpc for HttpLedgerRpc {
    async fn submit_transaction(&self, tx: &SignedTransaction) -> Result<Signature> {
        let result = self
            .call(
                "submitTransaction",
                serde_json::json!([tx.payload_base64]),
            )
            .await?;
        let signature: String = Self::parse("submitTransaction", result)?;
        Ok(Signature(signature))
    }

    async fn simulate_transaction(&self, tx: &SignedTransaction) -> Result<()> {
        let result = self
            .call(
                "simulateTransaction",
                serde_json::json!([tx.payload_base64]),
            )
            .await?;
        let err: Option<String> = Self::parse("simulateTransaction", result)?;
        match err {
            None => Ok(()),
            Some(message) => Err(VaultClientError::rpc(format!("simulation: {message}"))),
        }
    }

    async fn get_signature_statuses(
        &self,
        signatures: &[Signature],
    ) -> Result<Vec<Option<SignatureStatus>>> {
        let list: Vec<&str> = signatures.iter().map(|s| s.0.as_str()).collect();
        let result = self
            .call("getSignatureStatuses", serde_json::json!([list]))
            .await?;
        let wire: Vec<Option<WireStatus>> = Self::parse("getSignatureStatuses", result)?;
        if wire.len() != signatures.len() {
            return Err(VaultClientError::rpc(format!(
                "getSignatureStatuses: {} statuses for {} signatures",
                wire.len(),
                signatures.len()
            )));
        }
        Ok(wire
            .into_iter()
            .map(|s| {
                s.map(|w| SignatureStatus {
                    level: level_from_wire(&w.confirmation_status),
                    err: w.err,
                })
            })
            .collect())
    }

    async fn get_account_info(&self, address: &str) -> Result<Option<Vec<u8>>> {
        let result = self
            .call("getAccountInfo", serde_json::json!([address]))
            .await?;
        let wire: Option<WireAccount> = Self::parse("getAccountInfo", result)?;
        wire.map(|a| {
            STANDARD
                .decode(&a.data_base64)
                .map_err(|e| VaultClientError::rpc(format!("getAccountInfo data: {e}")))
        })
        .transpose()
    }

    async fn get_transaction_history(&self, address: &str) -> Result<Vec<TransactionRecord>> {
        let result = self
            .call("getTransactionHistory", serde_json::json!([address]))
            .await?;
        let wire: Vec<WireTransaction> = Self::parse("getTransactionHistory", result)?;
        wire.into_iter()
            .map(|t| {
                let instructions = t
                    .instructions
                    .into_iter()
                    .map(|i| {
                        Ok(InstructionData {
                            program_id: i.program_id,
                            accounts: i.accounts,
                            data: STANDARD.decode(&i.data_base64).map_err(|e| {
                                VaultClientError::rpc(format!(
                                    "getTransactionHistory instruction data: {e}"
                                ))
                            })?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(TransactionRecord {
                    signature: Signature(t.signature),
                    err: t.err,
                    instructions,
                })
            })
            .collect()
    }

    async fn get_recent_reference(&self) -> Result<String> {
        let result = self
            .call("getRecentReference", serde_json::json!([]))
            .await?;
        Self::parse("getRecentReference", result)
    }
}
