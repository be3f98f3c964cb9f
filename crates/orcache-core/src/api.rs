use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{OrcError, Result};
use crate::refresh::EndpointsSource;

pub const OPENROUTER_API: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

pub struct OpenRouterClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl OpenRouterClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_timeout(token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(token: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: OPENROUTER_API.to_string(),
            token,
        })
    }

    /// Pick up `$OPENROUTER_API_KEY` if it is set. The endpoints API is public,
    /// so running without a key is fine.
    pub fn with_auto_token(timeout: Duration) -> Result<Self> {
        let token = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self::with_timeout(token, timeout)
    }

    /// Point the client at another API root, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {t}"))
    }

    /// Fetch the raw `/endpoints` response for one model.
    ///
    /// The model ID goes into the path as-is: `anthropic/claude-3-opus` keeps its slash.
    pub async fn model_endpoints(&self, model_id: &str) -> Result<Value> {
        let url = format!("{}/models/{model_id}/endpoints", self.base_url);
        let mut req = self.http.get(&url);
        if let Some(auth) = self.auth_header() {
            req = req.header("Authorization", auth);
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(OrcError::Api { status, body });
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl EndpointsSource for OpenRouterClient {
    async fn fetch_endpoints(&self, model_id: &str) -> Result<Value> {
        self.model_endpoints(model_id).await
    }
}
