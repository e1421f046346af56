mod error;
mod recognition;
mod render;
mod segmentation;
mod session;

pub use error::ErrorResponse;
pub use recognition::{RecognitionResponse, RecognitionResult};
pub use render::RenderResponse;
pub use segmentation::{InferenceResponse, PreSegmentationResponse, SegmentedPointCloud};
pub use session::{BoundingBox, UploadResponse};
