//! HTTP client for the sync backend
//!
//! `GET`, `POST` and `DELETE` on `{base_url}/sync`, authenticated with a
//! bearer token.

use super::{RemoteStore, TokenProvider};
use crate::config::RemoteConfig;
use crate::error::{Result, SyncError};
use crate::models::SyncSnapshot;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct HttpRemoteStore {
    client: Client,
    sync_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpRemoteStore {
    /// Create a client; `config.timeout_secs` bounds every request
    pub fn new(config: &RemoteConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("fretsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            sync_url: format!("{}/sync", config.base_url.trim_end_matches('/')),
            tokens,
        })
    }

    pub fn sync_url(&self) -> &str {
        &self.sync_url
    }

    async fn error_for_status(response: Response) -> SyncError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        SyncError::RemoteStatus { status, message }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch_snapshot(&self) -> Result<Option<SyncSnapshot>> {
        let token = self.tokens.bearer_token()?;
        let response = self
            .client
            .get(&self.sync_url)
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("No remote snapshot yet");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }

        let body = response.text().await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }

        match serde_json::from_str::<SyncSnapshot>(body) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!("Ignoring malformed remote snapshot: {}", e);
                Ok(None)
            }
        }
    }

    async fn push_snapshot(&self, snapshot: &SyncSnapshot) -> Result<()> {
        let token = self.tokens.bearer_token()?;
        let response = self
            .client
            .post(&self.sync_url)
            .bearer_auth(token)
            .json(snapshot)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response).await);
        }
        Ok(())
    }

    async fn delete_snapshot(&self) -> Result<()> {
        let token = self.tokens.bearer_token()?;
        let response = self
            .client
            .delete(&self.sync_url)
            .bearer_auth(token)
            .send()
            .await?;

        // Nothing to delete counts as deleted
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(Self::error_for_status(response).await)
    }
}
