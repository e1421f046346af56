use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline::{
    ClickSegmentationRequest, ClickSegmenter, InstanceSegmenter, ObjectRecognitionRequest, ObjectRecognizer,
    StillRenderer, StillRequest, ToolError,
};
use scene::Mask;
use web_cmn::responses::RecognitionResult;

/// Stands in for a collaborator that was not given on the command line.
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured(pub &'static str);

impl Unconfigured {
    fn fail<T>(&self) -> pipeline::Result<T> {
        Err(ToolError::NotConfigured(self.0).into())
    }
}

#[async_trait]
impl ClickSegmenter for Unconfigured {
    async fn segment(&self, _request: &ClickSegmentationRequest) -> pipeline::Result<Mask> {
        self.fail()
    }
}

#[async_trait]
impl InstanceSegmenter for Unconfigured {
    async fn annotate(&self, _input: &Path, _prompt: Option<&str>) -> pipeline::Result<PathBuf> {
        self.fail()
    }
}

#[async_trait]
impl ObjectRecognizer for Unconfigured {
    async fn recognize(&self, _request: &ObjectRecognitionRequest) -> pipeline::Result<RecognitionResult> {
        self.fail()
    }
}

#[async_trait]
impl StillRenderer for Unconfigured {
    async fn render(&self, _request: &StillRequest) -> pipeline::Result<PathBuf> {
        self.fail()
    }
}
