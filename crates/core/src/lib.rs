//! Shared host-facing primitives for the portray workspace.
//!
//! Holds the ComfyUI connection configuration, the media payload types
//! passed in by the host runtime, and small formatting helpers used by
//! both the client library and the CLI.

pub mod config;
pub mod media;
