//! In-process fakes for the external collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use glam::Vec3;
use pipeline::{
    ClickSegmentationRequest, ClickSegmenter, InstanceSegmenter, ObjectRecognitionRequest, ObjectRecognizer,
    SegmenterConfig, StillRenderer, StillRequest, segmented_path,
};
use render::ViewConfig;
use scene::{ColorNaming, Mask, PlyFormat, PointCloud, ply};
use tempfile::TempDir;
use web_cmn::responses::RecognitionResult;

use crate::state::{AppState, Tools};

/// Labels every point within `cube_size` of a click with the click's object.
pub struct FakeSegmenter {
    pub positions: Vec<Vec3>,
}

#[async_trait]
impl ClickSegmenter for FakeSegmenter {
    async fn segment(&self, request: &ClickSegmentationRequest) -> pipeline::Result<Mask> {
        let labels = self
            .positions
            .iter()
            .map(|p| {
                request
                    .clicks
                    .iter()
                    .find(|c| Vec3::from_array(c.position).distance(*p) <= c.cube_size)
                    .map_or(0, |c| c.obj_idx)
            })
            .collect();
        let mask = Mask::from_labels(labels);
        mask.save(&request.output_path)?;
        Ok(mask)
    }
}

pub struct FakeAnnotator;

#[async_trait]
impl InstanceSegmenter for FakeAnnotator {
    async fn annotate(&self, input: &Path, _prompt: Option<&str>) -> pipeline::Result<PathBuf> {
        let output = segmented_path(input);
        tokio::fs::copy(input, &output).await?;
        Ok(output)
    }
}

pub struct FakeRecognizer;

#[async_trait]
impl ObjectRecognizer for FakeRecognizer {
    async fn recognize(&self, request: &ObjectRecognitionRequest) -> pipeline::Result<RecognitionResult> {
        Ok(RecognitionResult {
            selected_views: request.views.iter().take(2).map(|v| v.display().to_string()).collect(),
            description: format!("object seen in {} views", request.views.len()),
            label: format!("object_{}", request.obj_id),
            cost: 0.0,
        })
    }
}

pub struct FakeStillRenderer;

#[async_trait]
impl StillRenderer for FakeStillRenderer {
    async fn render(&self, request: &StillRequest) -> pipeline::Result<PathBuf> {
        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request.output, b"still").await?;
        Ok(request.output.clone())
    }
}

/// Two boxes of points on a floor: object one around x = -2, object two around x = 2.
pub fn test_cloud() -> PointCloud {
    let mut positions = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            positions.push(Vec3::new(i as f32 - 4.5, j as f32 - 4.5, 0.0));
        }
    }
    for center in [-2.0, 2.0] {
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    let offset = Vec3::new(i as f32, j as f32, k as f32) * 0.2;
                    positions.push(Vec3::new(center, 0.0, 0.5) + offset);
                }
            }
        }
    }
    PointCloud::with_fill_color(positions, Vec3::new(0.3, 0.6, 0.9))
}

pub fn cloud_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    ply::write(&test_cloud(), PlyFormat::BinaryLittleEndian, ColorNaming::Standard, &mut bytes).unwrap();
    bytes
}

pub fn test_tools() -> Tools {
    Tools {
        segmenter_config: SegmenterConfig::default(),
        segmenter: Arc::new(FakeSegmenter {
            positions: test_cloud().positions().to_vec(),
        }),
        annotator: Arc::new(FakeAnnotator),
        recognizer: Arc::new(FakeRecognizer),
        still_renderer: Arc::new(FakeStillRenderer),
    }
}

/// State over a temporary data directory, with small renders.
pub fn test_state() -> (AppState, TempDir) {
    let data = tempfile::tempdir().unwrap();
    let mut state = AppState::new(data.path(), test_tools()).unwrap();
    state.views = Arc::new(ViewConfig {
        width: 32,
        height: 24,
        marker_points: 5,
        ..ViewConfig::default()
    });
    (state, data)
}
