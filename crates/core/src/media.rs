//! Media payloads attached by the host and helpers for finding them.
//!
//! The host hands the pipeline a flat list of [`MediaPayload`]
//! attachments. Lookup is a two-step duck-typed search: exact file
//! name first, then the first attachment whose declared MIME category
//! matches. The two steps are separate functions so each can be
//! exercised on its own.

use serde::{Deserialize, Serialize};

/// A raw media buffer handed in by the host runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaPayload {
    /// File name as declared by the host (not trusted for routing).
    pub file_name: String,
    /// Declared MIME type, e.g. `image/png` or `audio/mpeg`.
    pub mime_type: String,
    /// Raw file contents.
    pub data: Vec<u8>,
}

/// Coarse MIME category used to validate and locate inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Image,
    Audio,
}

impl MediaCategory {
    /// The `type/` prefix a MIME string must carry to match.
    pub fn mime_prefix(self) -> &'static str {
        match self {
            MediaCategory::Image => "image/",
            MediaCategory::Audio => "audio/",
        }
    }

    /// Whether the given MIME type falls under this category.
    pub fn matches(self, mime_type: &str) -> bool {
        mime_type.starts_with(self.mime_prefix())
    }
}

/// Find an attachment by exact file name.
pub fn find_by_name<'a>(attachments: &'a [MediaPayload], name: &str) -> Option<&'a MediaPayload> {
    attachments.iter().find(|a| a.file_name == name)
}

/// Find the first attachment whose MIME type falls under `category`.
pub fn find_by_category(
    attachments: &[MediaPayload],
    category: MediaCategory,
) -> Option<&MediaPayload> {
    attachments.iter().find(|a| category.matches(&a.mime_type))
}

/// Two-step attachment lookup: exact name, then category fallback.
///
/// The named attachment wins even if another attachment of the right
/// category appears earlier in the list.
pub fn find_attachment<'a>(
    attachments: &'a [MediaPayload],
    name: &str,
    category: MediaCategory,
) -> Option<&'a MediaPayload> {
    find_by_name(attachments, name).or_else(|| find_by_category(attachments, category))
}

/// Format a byte count as a short human-readable label, e.g. `1.2 MB`.
pub fn format_file_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{bytes} B")
    }
}
