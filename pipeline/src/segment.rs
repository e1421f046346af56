use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use scene::{Click, Mask};
use serde::Serialize;
use tracing::info;

use crate::config::SegmenterConfig;
use crate::error::{Result, ToolError};
use crate::process::{ToolCommand, clear_output, expect_output, run_tool};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickRecord {
    pub position: [f32; 3],
    pub obj_idx: u32,
    pub obj_name: String,
    pub time_idx: u32,
    pub is_positive: bool,
    pub cube_size: f32,
    /// Index of the closest point of the cloud.
    pub nearest: Option<usize>,
}

impl From<&Click> for ClickRecord {
    fn from(click: &Click) -> Self {
        Self {
            position: click.position.to_array(),
            obj_idx: click.obj_idx,
            obj_name: click.obj_name.clone(),
            time_idx: click.time_idx,
            is_positive: click.is_positive,
            cube_size: click.cube_size,
            nearest: click.nearest(),
        }
    }
}

/// Everything the segmentation network needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClickSegmentationRequest {
    pub cloud_path: PathBuf,
    pub point_count: usize,
    pub weights: PathBuf,
    pub voxel_size: f32,
    pub clicks: Vec<ClickRecord>,
    pub object_names: Vec<String>,
    /// Where the network writes its per-point labels as `.npy`.
    pub output_path: PathBuf,
}

impl ClickSegmentationRequest {
    pub fn new(
        cloud_path: PathBuf,
        point_count: usize,
        config: &SegmenterConfig,
        clicks: &[Click],
        object_names: Vec<String>,
        output_path: PathBuf,
    ) -> Self {
        Self {
            cloud_path,
            point_count,
            weights: config.weights.clone(),
            voxel_size: config.voxel_size,
            clicks: clicks.iter().map(ClickRecord::from).collect(),
            object_names,
            output_path,
        }
    }
}

#[async_trait]
pub trait ClickSegmenter: Send + Sync {
    /// Returns one label per point of the cloud.
    async fn segment(&self, request: &ClickSegmentationRequest) -> Result<Mask>;
}

/// Runs `<command> --request <json> --output <npy>`.
#[derive(Debug, Clone)]
pub struct ProcessClickSegmenter {
    command: ToolCommand,
    timeout: Duration,
}

impl ProcessClickSegmenter {
    pub fn new(command: ToolCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl ClickSegmenter for ProcessClickSegmenter {
    async fn segment(&self, request: &ClickSegmentationRequest) -> Result<Mask> {
        let request_path = request.output_path.with_extension("request.json");
        if let Some(parent) = request_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request_path, serde_json::to_vec_pretty(request)?).await?;
        clear_output(&request.output_path).await?;

        info!(
            "Segmenting {} with {} clicks",
            request.cloud_path.display(),
            request.clicks.len()
        );
        run_tool(
            &self.command,
            [
                "--request".into(),
                request_path.into_os_string(),
                "--output".into(),
                request.output_path.clone().into_os_string(),
            ],
            self.timeout,
        )
        .await?;
        expect_output(&self.command, &request.output_path)?;

        let mask = Mask::load(&request.output_path)?;
        if mask.len() != request.point_count {
            return Err(ToolError::Malformed {
                tool: self.command.name(),
                reason: format!(
                    "mask has {} labels for {} points",
                    mask.len(),
                    request.point_count
                ),
            }
            .into());
        }
        info!("Segmentation labeled {} points", mask.foreground_count());
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::error::PipelineError;
    use crate::process::tests::sh;

    fn request(dir: &std::path::Path, point_count: usize) -> ClickSegmentationRequest {
        let click = Click::new(Vec3::new(0.1, 0.2, 0.3), 1, 0, 0.05);
        ClickSegmentationRequest::new(
            dir.join("scan.ply"),
            point_count,
            &SegmenterConfig::default(),
            &[click],
            vec!["chair".into()],
            dir.join("out").join("mask.npy"),
        )
    }

    #[tokio::test]
    async fn reads_mask_written_by_tool() {
        let dir = tempfile::tempdir().unwrap();
        let prepared = dir.path().join("prepared.npy");
        Mask::from_labels(vec![0, 1, 1, 0]).save(&prepared).unwrap();

        let script = format!("cp '{}' \"$4\"", prepared.display());
        let segmenter = ProcessClickSegmenter::new(sh(&script), Duration::from_secs(5));
        let mask = segmenter.segment(&request(dir.path(), 4)).await.unwrap();

        assert_eq!(mask.labels(), [0, 1, 1, 0]);
        let written = std::fs::read_to_string(dir.path().join("out").join("mask.request.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(json["clicks"][0]["obj_name"], "object_1");
        assert_eq!(json["weights"], "./agile3d/weights/checkpoint1099.pth");
    }

    #[tokio::test]
    async fn rejects_mask_of_wrong_length() {
        let dir = tempfile::tempdir().unwrap();
        let prepared = dir.path().join("prepared.npy");
        Mask::from_labels(vec![0, 1]).save(&prepared).unwrap();

        let script = format!("cp '{}' \"$4\"", prepared.display());
        let segmenter = ProcessClickSegmenter::new(sh(&script), Duration::from_secs(5));
        let result = segmenter.segment(&request(dir.path(), 4)).await;
        assert!(matches!(
            result,
            Err(PipelineError::Tool(ToolError::Malformed { .. }))
        ));
    }

    #[tokio::test]
    async fn mask_from_earlier_run_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let prepared = dir.path().join("prepared.npy");
        Mask::from_labels(vec![0, 1, 1, 0]).save(&prepared).unwrap();
        let request = request(dir.path(), 4);

        let script = format!("cp '{}' \"$4\"", prepared.display());
        let first = ProcessClickSegmenter::new(sh(&script), Duration::from_secs(5));
        assert!(first.segment(&request).await.is_ok());

        let silent = ProcessClickSegmenter::new(sh("true"), Duration::from_secs(5));
        let result = silent.segment(&request).await;
        assert!(matches!(
            result,
            Err(PipelineError::Tool(ToolError::NoOutput { .. }))
        ));
    }

    #[tokio::test]
    async fn missing_mask_is_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let segmenter = ProcessClickSegmenter::new(sh("true"), Duration::from_secs(5));
        let result = segmenter.segment(&request(dir.path(), 4)).await;
        assert!(matches!(
            result,
            Err(PipelineError::Tool(ToolError::NoOutput { .. }))
        ));
    }
}
