use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreSegmentationResponse {
    pub message: String,
    /// Static URLs of the annotated views.
    pub out_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentedPointCloud {
    /// Object label per point, 0 for background.
    pub segmentation: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResponse {
    pub message: String,
    pub segmented_point_cloud: SegmentedPointCloud,
}
