//! REST client for the ComfyUI HTTP endpoints.
//!
//! Wraps the ComfyUI HTTP API (health check, media upload, workflow
//! submission, history retrieval, output download) using [`reqwest`].
//! Every call goes through one pooled client carrying an explicit
//! request deadline, so a hung connection fails instead of stalling
//! the pipeline.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use portray_core::config::ComfyUiConfig;

use crate::history::HistoryEntry;
use crate::output::OutputCandidate;
use crate::workflow::Workflow;

/// HTTP client for a single ComfyUI instance.
pub struct ComfyUiApi {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

/// Response returned by the ComfyUI `/prompt` endpoint.
///
/// `prompt_id` is optional on purpose: a response without it is a
/// rejected submission, which the pipeline reports as such.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the queued job, if accepted.
    pub prompt_id: Option<String>,
}

/// Handle returned by the ComfyUI upload endpoint. The `name` field
/// is authoritative over whatever filename the caller asked for.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedAsset {
    /// Filename the server stored the upload under.
    pub name: String,
    /// Subfolder within the server's input directory.
    #[serde(default)]
    pub subfolder: String,
    /// Storage kind (usually `input`).
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Errors from the ComfyUI REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUiApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ComfyUiApiError {
    /// Whether this error is a 404 from the server.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ComfyUiApiError::Api { status: 404, .. })
    }
}

impl ComfyUiApi {
    /// Create a new API client for a ComfyUI instance.
    pub fn new(config: &ComfyUiConfig) -> Result<Self, ComfyUiApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Base HTTP URL of this instance (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the instance is reachable and serving.
    ///
    /// Sends a `GET /system_stats` request; any 2xx response counts
    /// as healthy.
    pub async fn check_health(&self) -> Result<(), ComfyUiApiError> {
        let response = self
            .authorized(self.client.get(format!("{}/system_stats", self.base_url)))
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Upload a media buffer to the server's asset store.
    ///
    /// Sends a `POST /upload/image` multipart request with the bytes
    /// under the `image` field and `overwrite=true`, so re-uploading
    /// the same filename replaces the stored content instead of
    /// versioning it.
    pub async fn upload_media(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<UploadedAsset, ComfyUiApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("subfolder", "")
            .text("overwrite", "true");

        let response = self
            .authorized(self.client.post(format!("{}/upload/image", self.base_url)))
            .multipart(form)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Submit a workflow for execution.
    ///
    /// Sends a `POST /prompt` request with the patched graph as the
    /// body. Returns the server's response; the caller decides whether
    /// a missing `prompt_id` is fatal.
    pub async fn submit_workflow(
        &self,
        workflow: &Workflow,
    ) -> Result<SubmitResponse, ComfyUiApiError> {
        let body = serde_json::json!({ "prompt": workflow });

        let response = self
            .authorized(self.client.post(format!("{}/prompt", self.base_url)))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Retrieve the execution record for a specific job.
    ///
    /// Sends a `GET /history/{job_id}` request. The response maps job
    /// ids to records; an empty map means the server has not indexed
    /// the job yet.
    pub async fn get_history(
        &self,
        job_id: &str,
    ) -> Result<BTreeMap<String, HistoryEntry>, ComfyUiApiError> {
        let response = self
            .authorized(
                self.client
                    .get(format!("{}/history/{}", self.base_url, job_id)),
            )
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download the raw bytes of a produced output file.
    ///
    /// Sends a `GET /view` request parameterized by filename,
    /// subfolder, and storage kind.
    pub async fn fetch_output(
        &self,
        candidate: &OutputCandidate,
    ) -> Result<Vec<u8>, ComfyUiApiError> {
        let response = self
            .authorized(self.client.get(format!("{}/view", self.base_url)))
            .query(&[
                ("filename", candidate.filename.as_str()),
                ("subfolder", candidate.subfolder.as_str()),
                ("type", candidate.kind.as_str()),
            ])
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Fetch bytes from an arbitrary external URL (remote-URL input
    /// mode). No auth header is attached: the URL is not the ComfyUI
    /// server.
    ///
    /// Returns the body bytes and the response `Content-Type`, if any.
    pub async fn fetch_remote(
        &self,
        url: &str,
    ) -> Result<(Vec<u8>, Option<String>), ComfyUiApiError> {
        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        Ok((response.bytes().await?.to_vec(), content_type))
    }

    // ---- private helpers ----

    /// Attach the bearer token when an API key is configured.
    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyUiApiError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyUiApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyUiApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyUiApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ComfyUiApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
