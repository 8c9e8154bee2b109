//! Typed view of the ComfyUI `/history/{job_id}` response.
//!
//! The endpoint returns a map from job id to an execution record.
//! Records for jobs the server has not indexed yet are simply absent,
//! and a record may exist before its `status` block does; both cases
//! read as "still pending" to the poller.
//!
//! Output groups use a `BTreeMap` keyed by node id, so candidate
//! iteration is deterministic (node-id order) rather than dependent on
//! backend insertion order, which the API does not guarantee.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Execution record for one submitted job.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
    /// Terminal-state block; absent while the job is still queued.
    #[serde(default)]
    pub status: Option<JobStatus>,
    /// Produced outputs, keyed by the node that emitted them.
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputGroup>,
}

/// Completion state reported by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatus {
    /// Whether the job has reached a terminal state. Once true, the
    /// record is immutable; no further transitions occur.
    #[serde(default)]
    pub completed: bool,
    /// Terminal status label, e.g. `success` or `error`.
    #[serde(default)]
    pub status_str: Option<String>,
}

/// Media entries emitted by a single node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputGroup {
    /// Image-like entries (also covers animated webp from video nodes).
    #[serde(default)]
    pub images: Vec<OutputFile>,
    /// Animation-like entries (video combine nodes report here).
    #[serde(default)]
    pub gifs: Vec<OutputFile>,
}

/// One produced file, addressable via the `/view` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputFile {
    pub filename: String,
    #[serde(default)]
    pub subfolder: String,
    /// Storage kind: `output`, `temp`, or an intermediate kind.
    #[serde(rename = "type", default)]
    pub kind: String,
}
