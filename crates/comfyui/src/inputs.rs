//! Resolving caller-declared input sources to raw bytes.
//!
//! The image input arrives in one of three modes: a remote URL, an
//! inline base64 string, or a named binary attachment. Audio is always
//! an optional named attachment. Attachment lookup is the two-step
//! search from [`portray_core::media`]: exact name first, then the
//! first attachment of the right MIME category. Every resolved input
//! is validated against its declared category before upload.

use base64::Engine as _;

use portray_core::media::{find_attachment, MediaCategory, MediaPayload};

use crate::api::ComfyUiApi;
use crate::error::GenerationError;

/// Where the source image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Fetch the bytes from a remote URL.
    Url(String),
    /// Decode an inline base64 string (a `data:` URL prefix is
    /// tolerated and stripped).
    Base64(String),
    /// Look up a named attachment supplied by the host.
    Attachment(String),
}

/// Resolve the image source to raw bytes.
pub async fn resolve_image_bytes(
    api: &ComfyUiApi,
    source: &ImageSource,
    attachments: &[MediaPayload],
) -> Result<Vec<u8>, GenerationError> {
    match source {
        ImageSource::Url(url) => {
            let (bytes, content_type) =
                api.fetch_remote(url)
                    .await
                    .map_err(|e| GenerationError::InvalidInputMedia {
                        detail: format!("could not fetch image from {url}: {e}"),
                    })?;
            // Only validate when the remote server declared a type.
            if let Some(mime) = &content_type {
                check_category(mime, MediaCategory::Image)?;
            }
            Ok(bytes)
        }
        ImageSource::Base64(encoded) => {
            let (declared_mime, bytes) = decode_inline(encoded)?;
            if let Some(mime) = &declared_mime {
                check_category(mime, MediaCategory::Image)?;
            }
            Ok(bytes)
        }
        ImageSource::Attachment(name) => {
            let payload = find_attachment(attachments, name, MediaCategory::Image).ok_or_else(
                || GenerationError::InvalidInputMedia {
                    detail: format!("no image attachment named '{name}' and no image-typed fallback"),
                },
            )?;
            check_category(&payload.mime_type, MediaCategory::Image)?;
            Ok(payload.data.clone())
        }
    }
}

/// Resolve the optional audio attachment to raw bytes.
///
/// Only called when the caller named an audio input; absence of audio
/// entirely is handled upstream by skipping the audio steps.
pub fn resolve_audio_bytes(
    name: &str,
    attachments: &[MediaPayload],
) -> Result<Vec<u8>, GenerationError> {
    let payload = find_attachment(attachments, name, MediaCategory::Audio).ok_or_else(|| {
        GenerationError::InvalidInputMedia {
            detail: format!("no audio attachment named '{name}' and no audio-typed fallback"),
        }
    })?;
    check_category(&payload.mime_type, MediaCategory::Audio)?;
    Ok(payload.data.clone())
}

/// Decode an inline base64 payload, returning the MIME type from the
/// `data:` URL header when one is present.
fn decode_inline(encoded: &str) -> Result<(Option<String>, Vec<u8>), GenerationError> {
    let (mime, body) = match encoded.split_once(";base64,") {
        Some((header, body)) => {
            let mime = header.strip_prefix("data:").unwrap_or(header);
            (Some(mime.to_string()), body)
        }
        None => (None, encoded),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body.trim())
        .map_err(|e| GenerationError::InvalidInputMedia {
            detail: format!("invalid base64 image data: {e}"),
        })?;

    Ok((mime, bytes))
}

fn check_category(mime_type: &str, category: MediaCategory) -> Result<(), GenerationError> {
    if category.matches(mime_type) {
        Ok(())
    } else {
        Err(GenerationError::InvalidInputMedia {
            detail: format!(
                "expected a {}* input, got '{mime_type}'",
                category.mime_prefix()
            ),
        })
    }
}
