//! Caller-facing error taxonomy for a generation run.
//!
//! Every failure surfaces as exactly one [`GenerationError`] variant
//! with a human-readable message and, where available, the underlying
//! detail text. None of these are retriable at this layer; the only
//! repeated operation in the pipeline is the status poll loop, which
//! waits for completion rather than retrying errors.

/// A failed generation run. All-or-nothing: no partial results
/// accompany any of these.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The workflow text was not a JSON object of nodes.
    #[error("Workflow is not a valid node graph: {detail}")]
    MalformedGraph { detail: String },

    /// No `LoadImage` node with an `image` input was found.
    #[error("Workflow has no LoadImage node with an 'image' input")]
    MissingImageNode,

    /// Audio was supplied but no eligible `LoadAudio` node exists.
    #[error("Workflow has no LoadAudio node with an 'audio' or 'filename' input")]
    MissingAudioNode,

    /// An input's MIME category did not match what was declared, or
    /// the input could not be resolved to bytes at all.
    #[error("Invalid input media: {detail}")]
    InvalidInputMedia { detail: String },

    /// The asset upload call failed or returned an unreadable body.
    #[error("Failed to upload input media to ComfyUI: {detail}")]
    UploadFailed { detail: String },

    /// The `/prompt` call failed or its response carried no job id.
    #[error("ComfyUI rejected the workflow submission: {detail}")]
    SubmissionRejected { detail: String },

    /// The job reached a terminal state with an error status.
    #[error("Generation failed on the ComfyUI server: {detail}")]
    GenerationFailed { detail: String },

    /// The poll budget ran out before the job completed.
    #[error("Generation did not complete within {minutes} minute(s)")]
    GenerationTimeout { minutes: u64 },

    /// The completed job record contained no media outputs at all.
    #[error("Job completed but produced no media outputs")]
    NoMediaOutputs,

    /// The completed job produced media, but nothing in a video
    /// format. Static-image-only results fail by design: this
    /// workflow's contract is video production.
    #[error("Job completed but produced no video outputs")]
    NoVideoOutputs,

    /// The selected output could not be downloaded.
    #[error("Generated output could not be fetched from {url}: {detail}")]
    OutputNotFound { url: String, detail: String },
}
