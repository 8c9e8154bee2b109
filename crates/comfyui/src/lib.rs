//! ComfyUI image-to-video orchestration client.
//!
//! Drives a remote ComfyUI server through one complete generation:
//! upload the input media, patch the workflow graph to reference the
//! uploaded assets, submit it, poll `/history` until the job reaches a
//! terminal state, then pick the produced video output and download it.
//!
//! [`pipeline::Generator`] is the entry point; the other modules are
//! the individual stages.

pub mod api;
pub mod error;
pub mod history;
pub mod inputs;
pub mod output;
pub mod pipeline;
pub mod poll;
pub mod workflow;

pub use error::GenerationError;
pub use pipeline::{GeneratedMedia, GenerationRequest, Generator};
