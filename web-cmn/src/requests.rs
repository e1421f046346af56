use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Clicks grouped by object. Keys are object indices as decimal strings, `"0"`
/// being the background.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClickData {
    #[serde(default)]
    pub click_idx: BTreeMap<String, Vec<i64>>,
    #[serde(default)]
    pub click_time_idx: BTreeMap<String, Vec<u32>>,
    pub click_positions: BTreeMap<String, Vec<[f32; 3]>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub click_data: ClickData,
    pub cube_size: f32,
    #[serde(default)]
    pub object_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaskRecognitionRequest {
    /// Label per point: 0 for background, 1 for the first object and so on.
    pub mask: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderRequest {
    pub prompt: String,
}
