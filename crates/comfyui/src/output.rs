//! Output selection from a completed job record.
//!
//! Flattens every node's media entries into one candidate list, keeps
//! only finished kinds (`output` and `temp`; intermediate preview
//! kinds are discarded), then narrows to video formats. A run whose
//! outputs are all static images fails resolution on purpose: the
//! contract of this workflow is video production.
//!
//! Selection takes the first video candidate in iteration order
//! (node-id order, images before gifs within a node). No stronger
//! ranking is applied; the backend guarantees no ordering either.

use std::collections::BTreeMap;

use crate::error::GenerationError;
use crate::history::OutputGroup;

/// File extensions accepted as video/animated output.
pub const VIDEO_EXTENSIONS: &[&str] = &["webp", "mp4", "gif"];

/// Output kinds that represent finished media.
pub const KEPT_KINDS: &[&str] = &["output", "temp"];

/// One downloadable output produced by the job.
#[derive(Debug, Clone)]
pub struct OutputCandidate {
    pub filename: String,
    pub subfolder: String,
    /// Storage kind (`output` or `temp` after filtering).
    pub kind: String,
    /// Composed `/view` fetch URL for this candidate.
    pub url: String,
}

/// MIME type and extension label derived from an output filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaType {
    pub mime: &'static str,
    pub extension: &'static str,
}

/// The fixed filename-extension mapping for produced media. Unknown
/// extensions fall back to animated webp, the most common output of
/// these workflows.
pub fn media_type_for(filename: &str) -> MediaType {
    match file_extension(filename).as_deref() {
        Some("mp4") => MediaType {
            mime: "video/mp4",
            extension: "mp4",
        },
        Some("gif") => MediaType {
            mime: "image/gif",
            extension: "gif",
        },
        _ => MediaType {
            mime: "image/webp",
            extension: "webp",
        },
    }
}

/// Lowercased extension of a filename, if it has one.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Flatten a job's outputs into candidates with resolved fetch URLs,
/// keeping only finished kinds.
pub fn collect_candidates(
    outputs: &BTreeMap<String, OutputGroup>,
    base_url: &str,
) -> Vec<OutputCandidate> {
    outputs
        .values()
        .flat_map(|group| group.images.iter().chain(group.gifs.iter()))
        .filter(|file| KEPT_KINDS.contains(&file.kind.as_str()))
        .map(|file| OutputCandidate {
            url: format!(
                "{base_url}/view?filename={}&subfolder={}&type={}",
                file.filename, file.subfolder, file.kind
            ),
            filename: file.filename.clone(),
            subfolder: file.subfolder.clone(),
            kind: file.kind.clone(),
        })
        .collect()
}

/// Pick the video output to return to the caller.
///
/// Fails with [`GenerationError::NoMediaOutputs`] when the job
/// produced no finished media at all, and with
/// [`GenerationError::NoVideoOutputs`] when it produced media but
/// nothing in a video format.
pub fn select_video_output(
    outputs: &BTreeMap<String, OutputGroup>,
    base_url: &str,
) -> Result<OutputCandidate, GenerationError> {
    let candidates = collect_candidates(outputs, base_url);
    if candidates.is_empty() {
        return Err(GenerationError::NoMediaOutputs);
    }

    candidates
        .into_iter()
        .find(|c| {
            file_extension(&c.filename)
                .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        })
        .ok_or(GenerationError::NoVideoOutputs)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::history::OutputFile;

    const BASE: &str = "http://localhost:8188";

    fn file(filename: &str, kind: &str) -> OutputFile {
        OutputFile {
            filename: filename.to_string(),
            subfolder: String::new(),
            kind: kind.to_string(),
        }
    }

    fn outputs_with(files: Vec<(&str, Vec<OutputFile>, Vec<OutputFile>)>) -> BTreeMap<String, OutputGroup> {
        files
            .into_iter()
            .map(|(node, images, gifs)| (node.to_string(), OutputGroup { images, gifs }))
            .collect()
    }

    // -- Candidate collection --

    #[test]
    fn collects_images_and_gifs_across_nodes() {
        let outputs = outputs_with(vec![
            ("3", vec![file("a.png", "output")], vec![]),
            ("9", vec![], vec![file("b.webp", "output")]),
        ]);
        let candidates = collect_candidates(&outputs, BASE);
        let names: Vec<_> = candidates.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.webp"]);
    }

    #[test]
    fn discards_preview_kinds() {
        let outputs = outputs_with(vec![(
            "3",
            vec![file("keep.webp", "output"), file("preview.webp", "preview")],
            vec![file("tmp.webp", "temp")],
        )]);
        let candidates = collect_candidates(&outputs, BASE);
        let names: Vec<_> = candidates.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(names, vec!["keep.webp", "tmp.webp"]);
    }

    #[test]
    fn composes_view_url() {
        let outputs = outputs_with(vec![(
            "9",
            vec![],
            vec![OutputFile {
                filename: "clip.mp4".to_string(),
                subfolder: "runs".to_string(),
                kind: "output".to_string(),
            }],
        )]);
        let candidates = collect_candidates(&outputs, BASE);
        assert_eq!(
            candidates[0].url,
            "http://localhost:8188/view?filename=clip.mp4&subfolder=runs&type=output"
        );
    }

    // -- Selection --

    #[test]
    fn selects_video_over_static_image() {
        // A static png is a media output but never a video output.
        let outputs = outputs_with(vec![(
            "3",
            vec![file("a.png", "output"), file("b.webp", "output")],
            vec![],
        )]);
        let selected = select_video_output(&outputs, BASE).unwrap();
        assert_eq!(selected.filename, "b.webp");
    }

    #[test]
    fn fails_with_no_video_when_only_static_images() {
        let outputs = outputs_with(vec![("3", vec![file("a.png", "output")], vec![])]);
        assert_matches!(
            select_video_output(&outputs, BASE),
            Err(GenerationError::NoVideoOutputs)
        );
    }

    #[test]
    fn fails_with_no_media_when_outputs_empty() {
        let outputs = BTreeMap::new();
        assert_matches!(
            select_video_output(&outputs, BASE),
            Err(GenerationError::NoMediaOutputs)
        );
    }

    #[test]
    fn fails_with_no_media_when_all_kinds_discarded() {
        let outputs = outputs_with(vec![("3", vec![file("p.webp", "preview")], vec![])]);
        assert_matches!(
            select_video_output(&outputs, BASE),
            Err(GenerationError::NoMediaOutputs)
        );
    }

    #[test]
    fn selects_first_candidate_in_iteration_order() {
        let outputs = outputs_with(vec![
            ("3", vec![], vec![file("first.mp4", "output")]),
            ("9", vec![], vec![file("second.webp", "output")]),
        ]);
        let selected = select_video_output(&outputs, BASE).unwrap();
        assert_eq!(selected.filename, "first.mp4");
    }

    #[test]
    fn accepts_temp_kind_video() {
        let outputs = outputs_with(vec![("9", vec![], vec![file("clip.gif", "temp")])]);
        let selected = select_video_output(&outputs, BASE).unwrap();
        assert_eq!(selected.kind, "temp");
    }

    // -- MIME mapping --

    #[test]
    fn media_type_mapping() {
        assert_eq!(media_type_for("a.webp").mime, "image/webp");
        assert_eq!(media_type_for("a.mp4").mime, "video/mp4");
        assert_eq!(media_type_for("a.gif").mime, "image/gif");
    }

    #[test]
    fn media_type_defaults_to_webp() {
        let media_type = media_type_for("mystery.bin");
        assert_eq!(media_type.mime, "image/webp");
        assert_eq!(media_type.extension, "webp");
    }

    #[test]
    fn media_type_is_case_insensitive() {
        assert_eq!(media_type_for("CLIP.MP4").mime, "video/mp4");
    }

    #[test]
    fn extension_of_extensionless_name() {
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), None);
    }
}
