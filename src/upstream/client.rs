//! HTTP implementation of [`UpstreamApi`] on `reqwest`.

use super::{
    decode, parse_completion, CompletionRequest, CompletionResult, SignedUrlResponse,
    UploadResponse, UpstreamApi,
};
use crate::config::AnalysisConfig;
use crate::error::{truncate_body, AnalysisError, Stage};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;

/// Client for the hosted agent API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct MistralClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    expiry_hours: u32,
    body_limit: usize,
}

impl std::fmt::Debug for MistralClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MistralClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MistralClient {
    /// Build a client from the pipeline configuration.
    ///
    /// A missing API key is not rejected here; the request validator reports
    /// it per request so the server can still start.
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let timeout = config.request_timeout();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalysisError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            timeout,
            expiry_hours: config.signed_url_expiry_hours,
            body_limit: config.error_body_limit,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(&self, stage: Stage, builder: RequestBuilder) -> Result<String, AnalysisError> {
        let response = builder
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.transport_error(stage, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(stage, e))?;

        if !status.is_success() {
            return Err(AnalysisError::UpstreamStatus {
                stage,
                status: status.as_u16(),
                body: truncate_body(&body, self.body_limit),
            });
        }
        debug!("{} answered {} ({} bytes)", stage, status, body.len());
        Ok(body)
    }

    fn transport_error(&self, stage: Stage, e: reqwest::Error) -> AnalysisError {
        if e.is_timeout() {
            AnalysisError::Timeout {
                stage,
                secs: self.timeout.as_secs(),
            }
        } else {
            AnalysisError::UpstreamRequest {
                stage,
                detail: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl UpstreamApi for MistralClient {
    async fn upload(&self, file_name: &str, document: &[u8]) -> Result<String, AnalysisError> {
        let part = Part::bytes(document.to_vec())
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| AnalysisError::UpstreamRequest {
                stage: Stage::Upload,
                detail: e.to_string(),
            })?;
        let form = Form::new().text("purpose", "ocr").part("file", part);

        let body = self
            .send(Stage::Upload, self.http.post(self.url("files")).multipart(form))
            .await?;
        let uploaded: UploadResponse = decode(Stage::Upload, &body, self.body_limit)?;
        Ok(uploaded.id)
    }

    async fn signed_url(&self, file_id: &str) -> Result<String, AnalysisError> {
        let request = self
            .http
            .get(self.url(&format!("files/{file_id}/url")))
            .query(&[("expiry", self.expiry_hours)]);
        let body = self.send(Stage::SignedUrl, request).await?;
        let signed: SignedUrlResponse = decode(Stage::SignedUrl, &body, self.body_limit)?;
        Ok(signed.url)
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResult, AnalysisError> {
        let builder = self
            .http
            .post(self.url("agents/completions"))
            .json(&request.to_body());
        let body = self.send(Stage::Completion, builder).await?;
        parse_completion(&body, self.body_limit)
    }

    async fn delete(&self, file_id: &str) -> Result<(), AnalysisError> {
        let builder = self.http.delete(self.url(&format!("files/{file_id}")));
        self.send(Stage::Delete, builder).await.map(|_| ())
    }
}
