//! HTTP backend for the enumeration API

use super::types::{
    EnumerateRequest, EnumerationPayload, ErrorBody, EscalateRequest, EscalateResponse,
    PermissionProfile,
};
use super::EnumerationBackend;
use crate::error::{ReconError, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// Client for the `/cloud/*` endpoints
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cloudrecon/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        // Url::join drops the last segment unless the base ends with '/'
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).with_context(|| format!("Invalid API URL: {}", base_url))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ReconError::Backend(format!("Invalid request path {}: {}", path, e)))?;

        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url).json(body);
        if let Some(ref token) = self.token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Request to {} failed: {}", path, e);
            ReconError::Backend(fallback_message(None))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            ReconError::Backend(fallback_message(Some(status)))
        })?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ReconError::Backend(format_backend_error(status, &body)));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse response JSON: {}", e);
            ReconError::Backend("Backend returned an invalid response.".to_string())
        })
    }
}

#[async_trait]
impl EnumerationBackend for HttpBackend {
    async fn enumerate(&self, credential_id: u64, resource_type: &str) -> Result<EnumerationPayload> {
        let body = EnumerateRequest {
            credential_id,
            resource_type,
        };
        let response = self.post("cloud/enumerate", &body).await?;

        match response.get("result") {
            Some(result) => Ok(EnumerationPayload::from(result.clone())),
            None => {
                tracing::warn!("Enumerate response for credential {} has no result", credential_id);
                Ok(EnumerationPayload::default())
            }
        }
    }

    async fn escalate(&self, credential_id: u64) -> Result<PermissionProfile> {
        let response = self
            .post("cloud/escalate", &EscalateRequest { credential_id })
            .await?;

        serde_json::from_value::<EscalateResponse>(response)
            .map(|r| r.result)
            .map_err(|e| {
                tracing::error!("Unexpected escalate response: {}", e);
                ReconError::Backend("Backend returned an invalid permission profile.".to_string())
            })
    }
}

/// The server's `{error}` text when present, otherwise a generic message
pub fn format_backend_error(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| fallback_message(Some(status)))
}

/// Generic text for failures without a server message
pub fn fallback_message(status: Option<StatusCode>) -> String {
    let Some(status) = status else {
        return "Request failed. Check your network connection and try again.".to_string();
    };

    match status.as_u16() {
        401 => "Authentication failed. Log in again.".to_string(),
        403 => "Permission denied for this credential.".to_string(),
        404 => "Credential not found.".to_string(),
        429 => "Rate limit exceeded. Please try again later.".to_string(),
        400 => "Invalid request. Check your parameters.".to_string(),
        500..=599 => "Backend service temporarily unavailable. Please try again.".to_string(),
        code => format!("Request failed with status {}.", code),
    }
}
