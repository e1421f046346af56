use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderResponse {
    /// Static URL of the still rendered by Blender.
    pub image: String,
    /// Static URL of the same still annotated by the instance segmenter.
    pub segmented: String,
}
