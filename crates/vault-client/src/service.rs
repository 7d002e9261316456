//! HTTP client for the session-creation service.
//!
//! Thin typed wrapper over the two endpoints the core uses; all returned
//! transactions stay opaque base64 payloads. Transport failures go through
//! the shared bounded retry; non-2xx responses surface with the endpoint and
//! body excerpt for diagnostics.

use std::time::Duration;

use async_trait::async_trait;

use crate::boundary::SessionService;
use crate::error::{Result, VaultClientError};
use crate::retry::retry_send;
use crate::types::{ChunkDownload, CreateSessionRequest, CreateSessionResponse};

#[derive(Debug, Clone)]
pub struct HttpSessionService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionService {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VaultClientError::Service(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn checked(
        resp: std::result::Result<reqwest::Response, reqwest::Error>,
        endpoint: &str,
    ) -> Result<reqwest::Response> {
        let resp = resp
            .map_err(|e| VaultClientError::Service(format!("{endpoint}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(VaultClientError::Service(format!(
                "{endpoint} returned {status}: {body}"
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl SessionService for HttpSessionService {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse> {
        let url = format!("{}/sessions", self.base_url);
        let resp = retry_send(|| self.client.post(&url).json(request).send()).await;
        Self::checked(resp, "create_session")
            .await?
            .json::<CreateSessionResponse>()
            .await
            .map_err(|e| VaultClientError::Service(format!("create_session response: {e}")))
    }

    async fn download_chunks(&self, session_handle: &str) -> Result<Vec<ChunkDownload>> {
        let url = format!("{}/sessions/{}/chunks", self.base_url, session_handle);
        let resp = retry_send(|| self.client.get(&url).send()).await;
        Self::checked(resp, "download_chunks")
            .await?
            .json::<Vec<ChunkDownload>>()
            .await
            .map_err(|e| VaultClientError::Service(format!("download_chunks response: {e}")))
    }
}
