use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use glam::Vec3;
use tracing::info;

use crate::error::{Result, ToolError};
use crate::process::{ToolCommand, clear_output, expect_output, run_tool};

/// A camera-controlled still of a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct StillRequest {
    pub position: Vec3,
    pub look_at: Vec3,
    pub output: PathBuf,
    /// Scene imported before rendering. Colors must use `diffuse_*` names.
    pub scene: Option<PathBuf>,
}

#[async_trait]
pub trait StillRenderer: Send + Sync {
    async fn render(&self, request: &StillRequest) -> Result<PathBuf>;
}

/// Drives Blender in background mode with a camera control script.
#[derive(Debug, Clone)]
pub struct BlenderRenderer {
    blender: ToolCommand,
    script: PathBuf,
    timeout: Duration,
}

fn coords(v: Vec3) -> String {
    format!("{},{},{}", v.x, v.y, v.z)
}

impl BlenderRenderer {
    pub fn new(blender: ToolCommand, script: PathBuf, timeout: Duration) -> Self {
        Self {
            blender,
            script,
            timeout,
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    fn args(&self, request: &StillRequest) -> Vec<String> {
        let mut args = vec![
            "--background".to_string(),
            "--python".to_string(),
            self.script.display().to_string(),
            "--".to_string(),
            "--pos".to_string(),
            coords(request.position),
            "--look".to_string(),
            coords(request.look_at),
            "--output".to_string(),
            request.output.display().to_string(),
        ];
        if let Some(scene) = &request.scene {
            args.push("--scene".to_string());
            args.push(scene.display().to_string());
        }
        args
    }
}

#[async_trait]
impl StillRenderer for BlenderRenderer {
    async fn render(&self, request: &StillRequest) -> Result<PathBuf> {
        if !self.script.exists() {
            return Err(ToolError::NotConfigured("blender script").into());
        }
        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        clear_output(&request.output).await?;
        info!(
            "Rendering still from {} towards {}",
            coords(request.position),
            coords(request.look_at)
        );
        run_tool(&self.blender, self.args(request), self.timeout).await?;
        expect_output(&self.blender, &request.output)?;
        Ok(request.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::process::tests::sh;

    fn renderer(dir: &Path, script: &str) -> BlenderRenderer {
        let control = dir.join("control_blender.py");
        std::fs::write(&control, b"").unwrap();
        BlenderRenderer::new(sh(script), control, Duration::from_secs(5))
    }

    fn request(dir: &Path) -> StillRequest {
        StillRequest {
            position: Vec3::new(2.0, 3.0, 1.0),
            look_at: Vec3::ZERO,
            output: dir.join("renders").join("still.png"),
            scene: Some(dir.join("scene.ply")),
        }
    }

    #[test]
    fn builds_blender_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let blender = renderer(dir.path(), "true");
        let args = blender.args(&request(dir.path()));
        assert_eq!(args[..2], ["--background", "--python"]);
        assert_eq!(args[3], "--");
        assert_eq!(args[4..8], ["--pos", "2,3,1", "--look", "0,0,0"]);
        assert_eq!(args[10], "--scene");
    }

    #[tokio::test]
    async fn returns_written_still() {
        let dir = tempfile::tempdir().unwrap();
        // $10 is the output path.
        let blender = renderer(dir.path(), "touch \"${10}\"");
        let path = blender.render(&request(dir.path())).await.unwrap();
        assert_eq!(path, dir.path().join("renders").join("still.png"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn still_from_earlier_run_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        renderer(dir.path(), "touch \"${10}\"")
            .render(&request(dir.path()))
            .await
            .unwrap();

        let result = renderer(dir.path(), "true").render(&request(dir.path())).await;
        assert!(matches!(
            result,
            Err(PipelineError::Tool(ToolError::NoOutput { .. }))
        ));
    }

    #[tokio::test]
    async fn crash_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blender = renderer(dir.path(), "echo 'no GPU' >&2; exit 1");
        let result = blender.render(&request(dir.path())).await;
        assert!(matches!(
            result,
            Err(PipelineError::Tool(ToolError::Crashed { code: Some(1), .. }))
        ));
    }

    #[tokio::test]
    async fn missing_script_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let blender = BlenderRenderer::new(sh("true"), dir.path().join("missing.py"), Duration::from_secs(5));
        let err = blender.render(&request(dir.path())).await.unwrap_err();
        assert!(matches!(err, PipelineError::Tool(ToolError::NotConfigured(_))));
        assert_eq!(err.to_string(), "blender script is not configured");
    }
}
