//! Configurable REST job vendor.
//!
//! Covers the common "POST to start, GET to poll" shape: the start response
//! carries a job ID, the status response carries a status token, an optional
//! next-page cursor and an optional error message, each found by JSON pointer.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

use super::config::HttpConfig;
use crate::classify::StatusClassifier;
use crate::error::{JobError, VendorError};
use crate::traits::JobVendor;
use crate::types::StatusPage;

/// Endpoint layout of a REST job API.
#[derive(Debug, Clone)]
pub struct HttpJobEndpoints {
    pub provider_id: String,
    /// URL receiving the start `POST`.
    pub start_url: String,
    /// Status URL; `{job_id}` is replaced by the URL-encoded job ID.
    pub status_url: String,
    /// Query parameter carrying the page cursor.
    pub cursor_param: String,
    pub job_id_pointer: String,
    pub status_pointer: String,
    pub next_token_pointer: Option<String>,
    pub error_pointer: Option<String>,
    /// Body field receiving the client-chosen job name, if the vendor accepts one.
    pub job_name_field: Option<String>,
    /// Body field receiving the auxiliary resource ID.
    pub auxiliary_field: Option<String>,
}

impl HttpJobEndpoints {
    pub fn new(
        provider_id: impl Into<String>,
        start_url: impl Into<String>,
        status_url: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            start_url: start_url.into(),
            status_url: status_url.into(),
            cursor_param: "next_token".to_string(),
            job_id_pointer: "/id".to_string(),
            status_pointer: "/status".to_string(),
            next_token_pointer: Some("/next_token".to_string()),
            error_pointer: Some("/error/message".to_string()),
            job_name_field: None,
            auxiliary_field: None,
        }
    }

    pub fn with_cursor_param(mut self, name: impl Into<String>) -> Self {
        self.cursor_param = name.into();
        self
    }

    pub fn with_job_id_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.job_id_pointer = pointer.into();
        self
    }

    pub fn with_status_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.status_pointer = pointer.into();
        self
    }

    pub fn with_next_token_pointer(mut self, pointer: Option<&str>) -> Self {
        self.next_token_pointer = pointer.map(str::to_string);
        self
    }

    pub fn with_error_pointer(mut self, pointer: Option<&str>) -> Self {
        self.error_pointer = pointer.map(str::to_string);
        self
    }

    pub fn with_job_name_field(mut self, field: impl Into<String>) -> Self {
        self.job_name_field = Some(field.into());
        self
    }

    pub fn with_auxiliary_field(mut self, field: impl Into<String>) -> Self {
        self.auxiliary_field = Some(field.into());
        self
    }

    fn status_url_for(&self, job_id: &str) -> String {
        self.status_url
            .replace("{job_id}", urlencoding::encode(job_id).as_ref())
    }
}

/// reqwest-backed [`JobVendor`] for REST job APIs.
///
/// `R` is the launch request type; it is serialized as the start body.
pub struct HttpJobVendor<R> {
    client: reqwest::Client,
    endpoints: HttpJobEndpoints,
    api_key: Option<SecretString>,
    classifier: StatusClassifier,
    _request: PhantomData<fn(&R)>,
}

impl<R> HttpJobVendor<R> {
    pub fn new(endpoints: HttpJobEndpoints, http: &HttpConfig) -> Result<Self, JobError> {
        Ok(Self::with_client(endpoints, http.build_client()?))
    }

    pub fn with_client(endpoints: HttpJobEndpoints, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoints,
            api_key: None,
            classifier: StatusClassifier::default(),
            _request: PhantomData,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_classifier(mut self, classifier: StatusClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn endpoints(&self) -> &HttpJobEndpoints {
        &self.endpoints
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and decode its JSON body, mapping failures to `VendorError`.
    async fn send_json(&self, builder: reqwest::RequestBuilder, url: &str) -> Result<Value, VendorError> {
        let provider = &self.endpoints.provider_id;
        tracing::debug!(target: "siumai_jobs::http", provider = %provider, url = %url, "sending request");
        let response = self.authorize(builder).send().await.map_err(|e| {
            tracing::debug!(target: "siumai_jobs::http", provider = %provider, url = %url, err = %e, "request error");
            VendorError::from(e)
        })?;
        let status = response.status();
        tracing::debug!(target: "siumai_jobs::http", provider = %provider, url = %url, status = status.as_u16(), "response received");
        let bytes = response.bytes().await.map_err(VendorError::from)?;

        if !status.is_success() {
            return Err(self.error_from_body(status, &bytes));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| VendorError::malformed(format!("undecodable response from {provider}: {e}")))
    }

    fn error_from_body(&self, status: StatusCode, bytes: &[u8]) -> VendorError {
        let body: Option<Value> = serde_json::from_slice(bytes).ok();
        let message = body
            .as_ref()
            .and_then(|b| {
                self.endpoints
                    .error_pointer
                    .as_deref()
                    .and_then(|p| b.pointer(p))
                    .or_else(|| b.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(bytes).trim().to_string();
                if text.is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    text
                }
            });
        let error = VendorError::http(status.as_u16(), message);
        match body {
            Some(body) => error.with_body(body),
            None => error,
        }
    }
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl<R> JobVendor for HttpJobVendor<R>
where
    R: Serialize + Send + Sync,
{
    type Request = R;

    fn provider_id(&self) -> &str {
        &self.endpoints.provider_id
    }

    fn classifier(&self) -> &StatusClassifier {
        &self.classifier
    }

    async fn start_job(
        &self,
        job_name: &str,
        request: &R,
        auxiliary: Option<&str>,
    ) -> Result<String, VendorError> {
        let mut body = serde_json::to_value(request)
            .map_err(|e| VendorError::message(format!("cannot serialize start request: {e}")))?;
        if let Value::Object(map) = &mut body {
            if let Some(field) = &self.endpoints.job_name_field {
                map.insert(field.clone(), Value::String(job_name.to_string()));
            }
            if let (Some(field), Some(aux)) = (&self.endpoints.auxiliary_field, auxiliary) {
                map.insert(field.clone(), Value::String(aux.to_string()));
            }
        }
        let url = &self.endpoints.start_url;
        let response = self
            .send_json(self.client.post(url).json(&body), url)
            .await?;
        string_at(&response, &self.endpoints.job_id_pointer).ok_or_else(|| {
            VendorError::malformed(format!(
                "start response has no job id at {}",
                self.endpoints.job_id_pointer
            ))
        })
    }

    async fn job_status(
        &self,
        job_id: &str,
        cursor: Option<&str>,
    ) -> Result<StatusPage, VendorError> {
        let url = self.endpoints.status_url_for(job_id);
        let mut builder = self.client.get(&url);
        if let Some(cursor) = cursor {
            builder = builder.query(&[(self.endpoints.cursor_param.as_str(), cursor)]);
        }
        let payload = self.send_json(builder, &url).await?;
        let status = string_at(&payload, &self.endpoints.status_pointer).ok_or_else(|| {
            VendorError::malformed(format!(
                "status response has no status at {}",
                self.endpoints.status_pointer
            ))
        })?;
        let next_token = self
            .endpoints
            .next_token_pointer
            .as_deref()
            .and_then(|p| string_at(&payload, p))
            .filter(|t| !t.is_empty());
        let error_message = self
            .endpoints
            .error_pointer
            .as_deref()
            .and_then(|p| string_at(&payload, p));
        Ok(StatusPage {
            status,
            payload,
            next_token,
            error_message,
        })
    }
}
