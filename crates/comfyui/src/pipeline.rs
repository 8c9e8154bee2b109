//! The sequential generation pipeline.
//!
//! One [`Generator::generate`] call drives a full run: resolve inputs,
//! upload media under canonical names, patch the workflow, submit it,
//! poll to completion, and download the selected video output. The
//! run is strictly sequential with a single in-flight job and returns
//! all-or-nothing.

use portray_core::config::ComfyUiConfig;
use portray_core::media::{format_file_size, MediaPayload};

use crate::api::{ComfyUiApi, ComfyUiApiError};
use crate::error::GenerationError;
use crate::inputs::{self, ImageSource};
use crate::output;
use crate::poll::{self, PollConfig};
use crate::workflow::Workflow;

/// Canonical server-side filename for the uploaded source image.
///
/// Fixed by convention rather than derived from the caller's file, so
/// the patch step can always predict the asset name. The upload
/// response's `name` field stays authoritative over this guess.
pub const INPUT_IMAGE_FILENAME: &str = "input_image.png";
/// Canonical server-side filename for the uploaded driving audio.
pub const INPUT_AUDIO_FILENAME: &str = "input_audio.mp3";

/// Everything the caller supplies for one generation run.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Workflow graph in ComfyUI API format, as JSON text.
    pub workflow_json: String,
    /// Where the source image comes from.
    pub image: ImageSource,
    /// Name of the audio attachment to use, if any. `None` skips the
    /// audio upload and patch steps entirely.
    pub audio_attachment: Option<String>,
    /// Binary attachments supplied by the host.
    pub attachments: Vec<MediaPayload>,
    /// Poll budget, in minutes (one status query per second).
    pub timeout_minutes: u64,
}

/// The produced artifact plus caller-facing metadata.
#[derive(Debug, Clone)]
pub struct GeneratedMedia {
    /// Raw media bytes.
    pub data: Vec<u8>,
    /// MIME type derived from the output filename.
    pub mime_type: String,
    /// Output filename as reported by the server.
    pub file_name: String,
    /// Extension label, e.g. `webp`.
    pub file_extension: String,
    /// Human-readable size label, e.g. `1.2 MB`.
    pub file_size: String,
}

/// Orchestrates generation runs against one ComfyUI instance.
pub struct Generator {
    api: ComfyUiApi,
    poll: PollConfig,
}

impl Generator {
    /// Create a generator for the configured instance.
    pub fn new(config: &ComfyUiConfig) -> Result<Self, ComfyUiApiError> {
        Ok(Self {
            api: ComfyUiApi::new(config)?,
            poll: PollConfig::default(),
        })
    }

    /// Override the poll delays (tests use zero delays).
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Check that the configured instance is reachable.
    pub async fn check_health(&self) -> Result<(), ComfyUiApiError> {
        self.api.check_health().await
    }

    /// Run one complete generation and return the produced video.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedMedia, GenerationError> {
        let mut workflow = Workflow::parse(&request.workflow_json)?;

        let image_bytes =
            inputs::resolve_image_bytes(&self.api, &request.image, &request.attachments).await?;
        let audio_bytes = request
            .audio_attachment
            .as_deref()
            .map(|name| inputs::resolve_audio_bytes(name, &request.attachments))
            .transpose()?;

        let image_asset = self
            .api
            .upload_media(image_bytes, INPUT_IMAGE_FILENAME)
            .await
            .map_err(upload_failed)?;
        tracing::info!(asset = %image_asset.name, "Input image uploaded");
        workflow.patch_image(&image_asset)?;

        if let Some(bytes) = audio_bytes {
            let audio_asset = self
                .api
                .upload_media(bytes, INPUT_AUDIO_FILENAME)
                .await
                .map_err(upload_failed)?;
            tracing::info!(asset = %audio_asset.name, "Input audio uploaded");
            workflow.patch_audio(&audio_asset)?;
        }

        let response = self
            .api
            .submit_workflow(&workflow)
            .await
            .map_err(|e| GenerationError::SubmissionRejected {
                detail: e.to_string(),
            })?;
        let job_id = response
            .prompt_id
            .ok_or_else(|| GenerationError::SubmissionRejected {
                detail: "response contained no prompt_id".to_string(),
            })?;
        tracing::info!(job_id = %job_id, "Workflow submitted");

        let entry =
            poll::wait_for_completion(&self.api, &job_id, request.timeout_minutes, &self.poll)
                .await?;

        let candidate = output::select_video_output(&entry.outputs, self.api.base_url())?;
        tracing::info!(
            filename = %candidate.filename,
            kind = %candidate.kind,
            "Output selected",
        );

        let data = self.api.fetch_output(&candidate).await.map_err(|e| {
            GenerationError::OutputNotFound {
                url: candidate.url.clone(),
                detail: e.to_string(),
            }
        })?;

        let media_type = output::media_type_for(&candidate.filename);
        tracing::info!(
            job_id = %job_id,
            size = data.len(),
            mime = media_type.mime,
            "Generation finished",
        );

        Ok(GeneratedMedia {
            file_size: format_file_size(data.len()),
            mime_type: media_type.mime.to_string(),
            file_name: candidate.filename,
            file_extension: media_type.extension.to_string(),
            data,
        })
    }
}

fn upload_failed(e: ComfyUiApiError) -> GenerationError {
    GenerationError::UploadFailed {
        detail: e.to_string(),
    }
}
