//! HTTP client for the dashboard API.
//!
//! Used by the `watch`, `status` and `seed` commands. Configuration is via
//! environment variables:
//! - `KEEPER_URL` - API base URL (default: `http://127.0.0.1:3333/api`)

mod sse;
mod subscriber;

pub use sse::{frames, FrameDecoder, FrameStream};
pub use subscriber::{
    ConnectionState, EventSource, ReconnectingSubscriber, SubscriberStatus,
};

use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::*;

/// Default URL for a locally running dashboard.
pub const DEFAULT_URL: &str = "http://127.0.0.1:3333/api";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// HTTP client for the dashboard API.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    base_url: String,
    client: Client,
}

impl DashboardClient {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url = std::env::var("KEEPER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let response = self.client.get(self.url(segments)?).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(error_for(status, response.text().await.unwrap_or_default()))
        }
    }

    // ============================================================
    // Vaults
    // ============================================================

    pub async fn list_vaults(&self) -> Result<Vec<VaultInfo>, ClientError> {
        let list: VaultList = self.get(&["vaults"]).await?;
        Ok(list.vaults)
    }

    pub async fn get_vault(&self, name: &str) -> Result<VaultContent, ClientError> {
        self.get(&["vault", name]).await
    }

    pub async fn list_seeds(&self, vault: &str) -> Result<SeedList, ClientError> {
        self.get(&["vault", vault, "seeds"]).await
    }

    pub async fn get_seed(&self, vault: &str, seed: &str) -> Result<SeedDetail, ClientError> {
        self.get(&["vault", vault, "seeds", seed]).await
    }

    // ============================================================
    // Decisions
    // ============================================================

    /// Decisions, newest first.
    pub async fn list_decisions(&self) -> Result<Vec<DecisionInfo>, ClientError> {
        let list: DecisionList = self.get(&["decisions"]).await?;
        Ok(list.decisions)
    }

    pub async fn get_decision(&self, id: &str) -> Result<DecisionContent, ClientError> {
        let mut segments = vec!["decision"];
        segments.extend(id.split('/'));
        self.get(&segments).await
    }

    // ============================================================
    // Health & live updates
    // ============================================================

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.get(&["health"]).await
    }

    /// Open the server-push stream.
    pub async fn open_events(&self) -> Result<FrameStream, ClientError> {
        let response = self
            .client
            .get(self.url(&["events"])?)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_for(status, response.text().await.unwrap_or_default()));
        }
        Ok(frames(response.bytes_stream()))
    }
}

fn error_for(status: StatusCode, body: String) -> ClientError {
    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(body),
        _ => ClientError::Server(format!("{}: {}", status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_encodes_segments() {
        let client = DashboardClient::new("http://127.0.0.1:3333/api");
        let url = client.url(&["vault", "backend", "seeds", "GET /api/vaults"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:3333/api/vault/backend/seeds/GET%20%2Fapi%2Fvaults"
        );
    }

    #[test]
    fn trailing_slash_in_base_is_tolerated() {
        let client = DashboardClient::new("http://localhost:3333/api/");
        let url = client.url(&["health"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3333/api/health");
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let client = DashboardClient::new("not a url");
        assert!(matches!(client.url(&["health"]), Err(ClientError::InvalidUrl(_))));
    }
}
