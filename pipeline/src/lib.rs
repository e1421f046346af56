mod annotate;
mod blender;
mod config;
mod error;
mod process;
mod recognize;
mod segment;

pub use annotate::{InstanceSegmenter, ProcessInstanceSegmenter, segmented_path};
pub use blender::{BlenderRenderer, StillRenderer, StillRequest};
pub use config::SegmenterConfig;
pub use error::{PipelineError, Result, ToolError};
pub use process::{ToolCommand, ToolOutput, run_tool};
pub use recognize::{ObjectRecognitionRequest, ObjectRecognizer, ProcessObjectRecognizer};
pub use segment::{ClickRecord, ClickSegmentationRequest, ClickSegmenter, ProcessClickSegmenter};
