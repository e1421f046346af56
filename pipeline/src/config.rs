use std::path::PathBuf;

/// Settings handed to the click segmentation network.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmenterConfig {
    /// Pretrained checkpoint of the network.
    pub weights: PathBuf,
    /// Edge length of the voxels the cloud is quantized to.
    pub voxel_size: f32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            weights: PathBuf::from("./agile3d/weights/checkpoint1099.pth"),
            voxel_size: 0.05,
        }
    }
}
