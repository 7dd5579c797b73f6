//! Webhook relay lookup.
//!
//! Some vendors push completion to a third-party webhook relay instead of
//! exposing a status endpoint. Retrieval is a single lookup by correlation id:
//! no stored request yet means the job is still pending. No backoff is
//! involved.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use super::config::HttpConfig;
use crate::error::JobError;
use crate::traits::ResultNormalizer;
use crate::types::JobOutcome;

#[derive(Debug, Deserialize)]
struct RelayPage {
    #[serde(default)]
    data: Vec<RelayRequest>,
}

#[derive(Debug, Deserialize)]
struct RelayRequest {
    #[serde(default)]
    content: Option<String>,
}

/// Client for a webhook relay that stores incoming requests under a token.
pub struct WebhookRelay {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl WebhookRelay {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        http: &HttpConfig,
    ) -> Result<Self, JobError> {
        Ok(Self::with_client(base_url, token, http.build_client()?))
    }

    pub fn with_client(
        base_url: impl Into<String>,
        token: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: SecretString::from(token.into()),
        }
    }

    /// URL the vendor should deliver its callback to.
    pub fn callback_url(&self) -> String {
        format!("{}/{}", self.base_url, self.token.expose_secret())
    }

    fn lookup_url(&self, correlation_id: &str) -> String {
        let query = urlencoding::encode(&format!("content:{correlation_id}")).into_owned();
        format!(
            "{}/token/{}/requests?sorting=newest&query={query}",
            self.base_url,
            self.token.expose_secret()
        )
    }

    /// One-shot lookup of the newest delivery mentioning `correlation_id`.
    pub async fn lookup<N: ResultNormalizer + ?Sized>(
        &self,
        correlation_id: &str,
        normalizer: &N,
    ) -> Result<JobOutcome<N::Output>, JobError> {
        let response = self
            .client
            .get(self.lookup_url(correlation_id))
            .send()
            .await
            .map_err(|e| JobError::HttpError(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| JobError::HttpError(format!("failed to read webhook relay response: {e}")))?;
        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            let message = if text.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                text
            };
            return Err(JobError::provider(Some(status.as_u16()), message));
        }
        let page: RelayPage =
            serde_json::from_slice(&bytes).map_err(|_| JobError::malformed_response())?;

        let Some(latest) = page.data.into_iter().next() else {
            tracing::debug!(target: "siumai_jobs::http", correlation_id = %correlation_id, "no webhook delivery yet");
            return Ok(JobOutcome::Pending);
        };
        let content = latest.content.unwrap_or_default();
        let payload: Value =
            serde_json::from_str(&content).map_err(|_| JobError::malformed_response())?;
        let raw = vec![payload];
        let result = normalizer.normalize(&raw)?;
        Ok(JobOutcome::Succeeded { result, raw })
    }
}
