//! Workflow graph model: parsing, node lookup, and input patching.
//!
//! A ComfyUI workflow in API format is a JSON object mapping node ids
//! to nodes of the shape `{"class_type": ..., "inputs": {...}}`. The
//! model is deliberately closed: a typed node with an open parameter
//! bag, so patch targets are located by explicit capability checks
//! (role match plus presence of the expected input key) rather than
//! ad hoc field probing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::api::UploadedAsset;
use crate::error::GenerationError;

/// Node role that loads the source image.
pub const IMAGE_LOADER_CLASS: &str = "LoadImage";
/// Input key patched on the image loader.
pub const IMAGE_INPUT_KEY: &str = "image";
/// Node role that loads the driving audio.
pub const AUDIO_LOADER_CLASS: &str = "LoadAudio";
/// Preferred input key on the audio loader.
pub const AUDIO_INPUT_KEY: &str = "audio";
/// Alternate input key some audio loaders expose instead.
pub const AUDIO_FILENAME_KEY: &str = "filename";

/// A parsed workflow graph, keyed by node id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workflow {
    nodes: HashMap<String, WorkflowNode>,
}

/// One node of the graph: a role tag plus an open parameter bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Node role, e.g. `LoadImage` or `KSampler`.
    pub class_type: String,
    /// Arbitrary-shaped node parameters.
    #[serde(default)]
    pub inputs: serde_json::Map<String, serde_json::Value>,
    /// Editor metadata (title), carried through untouched.
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<NodeMeta>,
}

/// Editor metadata attached to a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMeta {
    pub title: String,
}

impl Workflow {
    /// Parse workflow text into a graph.
    ///
    /// Fails with [`GenerationError::MalformedGraph`] unless the text
    /// is a JSON object of well-formed nodes (null, arrays, and nodes
    /// without a `class_type` are all rejected).
    pub fn parse(text: &str) -> Result<Self, GenerationError> {
        serde_json::from_str(text).map_err(|e| GenerationError::MalformedGraph {
            detail: e.to_string(),
        })
    }

    /// All nodes, keyed by node id.
    pub fn nodes(&self) -> &HashMap<String, WorkflowNode> {
        &self.nodes
    }

    /// Find the first node matching the two-part patchability test:
    /// `class_type` equals `class_type` AND `inputs` contains
    /// `input_key` with a non-null value.
    ///
    /// Role match alone is not enough; some graphs reuse a role
    /// without the expected parameter.
    pub fn find_node(&self, class_type: &str, input_key: &str) -> Option<&WorkflowNode> {
        self.nodes
            .values()
            .find(|node| node_matches(node, class_type, &[input_key]))
    }

    /// Overwrite the image loader's `image` input with the uploaded
    /// asset's name.
    ///
    /// Fails with [`GenerationError::MissingImageNode`] when no
    /// eligible node exists. That is a hard precondition failure: a
    /// graph without an image input cannot run this workflow.
    pub fn patch_image(&mut self, asset: &UploadedAsset) -> Result<(), GenerationError> {
        let node = self
            .find_node_mut(IMAGE_LOADER_CLASS, &[IMAGE_INPUT_KEY])
            .ok_or(GenerationError::MissingImageNode)?;

        node.inputs.insert(
            IMAGE_INPUT_KEY.to_string(),
            serde_json::Value::String(asset.name.clone()),
        );
        Ok(())
    }

    /// Point the audio loader at the uploaded asset's name.
    ///
    /// Writes the `audio` key when the node exposes it, else the
    /// `filename` key, else falls back to writing `audio`. Only call
    /// this when an audio asset was actually uploaded; a graph with no
    /// audio node is fine as long as no audio was supplied.
    pub fn patch_audio(&mut self, asset: &UploadedAsset) -> Result<(), GenerationError> {
        let node = self
            .find_node_mut(AUDIO_LOADER_CLASS, &[AUDIO_INPUT_KEY, AUDIO_FILENAME_KEY])
            .ok_or(GenerationError::MissingAudioNode)?;

        let key = if node.inputs.contains_key(AUDIO_INPUT_KEY) {
            AUDIO_INPUT_KEY
        } else if node.inputs.contains_key(AUDIO_FILENAME_KEY) {
            AUDIO_FILENAME_KEY
        } else {
            AUDIO_INPUT_KEY
        };

        node.inputs.insert(
            key.to_string(),
            serde_json::Value::String(asset.name.clone()),
        );
        Ok(())
    }

    /// Mutable counterpart of the patchability lookup. Eligible when
    /// any of `input_keys` is present with a non-null value.
    fn find_node_mut(
        &mut self,
        class_type: &str,
        input_keys: &[&str],
    ) -> Option<&mut WorkflowNode> {
        self.nodes
            .values_mut()
            .find(|node| node_matches(node, class_type, input_keys))
    }
}

/// The two-part patchability test shared by the lookups.
fn node_matches(node: &WorkflowNode, class_type: &str, input_keys: &[&str]) -> bool {
    node.class_type == class_type
        && input_keys
            .iter()
            .any(|key| node.inputs.get(*key).is_some_and(|v| !v.is_null()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn asset(name: &str) -> UploadedAsset {
        UploadedAsset {
            name: name.to_string(),
            subfolder: String::new(),
            kind: "input".to_string(),
        }
    }

    fn input_str(workflow: &Workflow, node_id: &str, key: &str) -> String {
        workflow.nodes()[node_id].inputs[key]
            .as_str()
            .expect("input should be a string")
            .to_string()
    }

    // -- Parsing --

    #[test]
    fn parse_valid_graph() {
        let workflow =
            Workflow::parse(r#"{"3":{"class_type":"LoadImage","inputs":{"image":""}}}"#).unwrap();
        assert_eq!(workflow.nodes().len(), 1);
        assert_eq!(workflow.nodes()["3"].class_type, "LoadImage");
    }

    #[test]
    fn parse_carries_meta_title() {
        let workflow = Workflow::parse(
            r#"{"3":{"class_type":"LoadImage","inputs":{"image":""},"_meta":{"title":"Source"}}}"#,
        )
        .unwrap();
        assert_eq!(workflow.nodes()["3"].meta.as_ref().unwrap().title, "Source");
    }

    #[test]
    fn parse_rejects_null() {
        assert_matches!(
            Workflow::parse("null"),
            Err(GenerationError::MalformedGraph { .. })
        );
    }

    #[test]
    fn parse_rejects_array() {
        assert_matches!(
            Workflow::parse("[1,2,3]"),
            Err(GenerationError::MalformedGraph { .. })
        );
    }

    #[test]
    fn parse_rejects_node_without_class_type() {
        assert_matches!(
            Workflow::parse(r#"{"3":{"inputs":{}}}"#),
            Err(GenerationError::MalformedGraph { .. })
        );
    }

    #[test]
    fn parse_rejects_invalid_json() {
        assert_matches!(
            Workflow::parse("not json"),
            Err(GenerationError::MalformedGraph { .. })
        );
    }

    // -- Node lookup --

    #[test]
    fn find_node_requires_role_and_key() {
        // Same role but without the expected input key: not patchable.
        let workflow = Workflow::parse(
            r#"{
                "1":{"class_type":"LoadImage","inputs":{"other":"x"}},
                "2":{"class_type":"LoadImage","inputs":{"image":"placeholder.png"}}
            }"#,
        )
        .unwrap();

        let node = workflow.find_node(IMAGE_LOADER_CLASS, IMAGE_INPUT_KEY).unwrap();
        assert_eq!(node.inputs["image"], "placeholder.png");
    }

    #[test]
    fn find_node_skips_null_values() {
        let workflow =
            Workflow::parse(r#"{"1":{"class_type":"LoadImage","inputs":{"image":null}}}"#).unwrap();
        assert!(workflow.find_node(IMAGE_LOADER_CLASS, IMAGE_INPUT_KEY).is_none());
    }

    // -- Image patch --

    #[test]
    fn patch_image_sets_asset_name() {
        let mut workflow =
            Workflow::parse(r#"{"3":{"class_type":"LoadImage","inputs":{"image":""}}}"#).unwrap();

        workflow.patch_image(&asset("input_image.png")).unwrap();
        assert_eq!(input_str(&workflow, "3", "image"), "input_image.png");
    }

    #[test]
    fn patch_image_leaves_other_nodes_untouched() {
        let mut workflow = Workflow::parse(
            r#"{
                "3":{"class_type":"LoadImage","inputs":{"image":""}},
                "4":{"class_type":"KSampler","inputs":{"seed":42,"steps":20}}
            }"#,
        )
        .unwrap();

        workflow.patch_image(&asset("input_image.png")).unwrap();

        let sampler = &workflow.nodes()["4"];
        assert_eq!(sampler.inputs["seed"], 42);
        assert_eq!(sampler.inputs["steps"], 20);
    }

    #[test]
    fn patch_image_fails_without_eligible_node() {
        let mut workflow =
            Workflow::parse(r#"{"4":{"class_type":"KSampler","inputs":{"seed":42}}}"#).unwrap();
        assert_matches!(
            workflow.patch_image(&asset("input_image.png")),
            Err(GenerationError::MissingImageNode)
        );
    }

    #[test]
    fn patch_image_fails_when_role_lacks_key() {
        let mut workflow =
            Workflow::parse(r#"{"3":{"class_type":"LoadImage","inputs":{"other":"x"}}}"#).unwrap();
        assert_matches!(
            workflow.patch_image(&asset("input_image.png")),
            Err(GenerationError::MissingImageNode)
        );
    }

    // -- Audio patch --

    #[test]
    fn patch_audio_prefers_audio_key() {
        let mut workflow = Workflow::parse(
            r#"{"7":{"class_type":"LoadAudio","inputs":{"audio":"","filename":"old.wav"}}}"#,
        )
        .unwrap();

        workflow.patch_audio(&asset("input_audio.mp3")).unwrap();
        assert_eq!(input_str(&workflow, "7", "audio"), "input_audio.mp3");
        // The alternate key keeps its previous value.
        assert_eq!(input_str(&workflow, "7", "filename"), "old.wav");
    }

    #[test]
    fn patch_audio_writes_filename_key_when_only_option() {
        let mut workflow =
            Workflow::parse(r#"{"7":{"class_type":"LoadAudio","inputs":{"filename":"old.wav"}}}"#)
                .unwrap();

        workflow.patch_audio(&asset("input_audio.mp3")).unwrap();
        assert_eq!(input_str(&workflow, "7", "filename"), "input_audio.mp3");
    }

    #[test]
    fn patch_audio_fails_without_eligible_node() {
        let mut workflow =
            Workflow::parse(r#"{"3":{"class_type":"LoadImage","inputs":{"image":""}}}"#).unwrap();
        assert_matches!(
            workflow.patch_audio(&asset("input_audio.mp3")),
            Err(GenerationError::MissingAudioNode)
        );
    }

    // -- Serialization --

    #[test]
    fn serializes_back_to_node_map() {
        let text = r#"{"3":{"class_type":"LoadImage","inputs":{"image":"a.png"}}}"#;
        let workflow = Workflow::parse(text).unwrap();
        let value = serde_json::to_value(&workflow).unwrap();
        assert_eq!(value["3"]["class_type"], "LoadImage");
        assert_eq!(value["3"]["inputs"]["image"], "a.png");
    }
}
