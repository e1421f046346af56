use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use web_cmn::responses::RecognitionResult;

use crate::error::{Result, ToolError};
use crate::process::{ToolCommand, run_tool};

/// One object to describe, seen through a set of rendered views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRecognitionRequest {
    pub obj_id: u32,
    pub cloud_path: PathBuf,
    pub mask_path: PathBuf,
    pub views: Vec<PathBuf>,
    /// Directory the request file is written to.
    #[serde(skip)]
    pub work_dir: PathBuf,
}

#[async_trait]
pub trait ObjectRecognizer: Send + Sync {
    async fn recognize(&self, request: &ObjectRecognitionRequest) -> Result<RecognitionResult>;
}

/// Runs `<command> --request <json>` and reads the result from stdout.
#[derive(Debug, Clone)]
pub struct ProcessObjectRecognizer {
    command: ToolCommand,
    timeout: Duration,
}

impl ProcessObjectRecognizer {
    pub fn new(command: ToolCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl ObjectRecognizer for ProcessObjectRecognizer {
    async fn recognize(&self, request: &ObjectRecognitionRequest) -> Result<RecognitionResult> {
        tokio::fs::create_dir_all(&request.work_dir).await?;
        let request_path = request
            .work_dir
            .join(format!("recognition_{}.json", request.obj_id));
        tokio::fs::write(&request_path, serde_json::to_vec_pretty(request)?).await?;

        let output = run_tool(
            &self.command,
            ["--request".into(), request_path.into_os_string()],
            self.timeout,
        )
        .await?;

        // Tools tend to log to stdout before the result, which comes last.
        let line = output
            .stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or_default();
        let result: RecognitionResult = serde_json::from_str(line).map_err(|err| ToolError::Malformed {
            tool: self.command.name(),
            reason: err.to_string(),
        })?;
        info!("Object {} recognized as '{}'", request.obj_id, result.label);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::process::tests::sh;

    fn request(dir: &std::path::Path) -> ObjectRecognitionRequest {
        ObjectRecognitionRequest {
            obj_id: 2,
            cloud_path: dir.join("scan.ply"),
            mask_path: dir.join("mask.npy"),
            views: vec![dir.join("view_000.png")],
            work_dir: dir.join("work"),
        }
    }

    #[tokio::test]
    async fn parses_last_stdout_line() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"echo "loading model"; echo '{"selected_views": ["view_000.png"], "description": "a lamp", "label": "lamp", "cost": 0.25}'"#;
        let recognizer = ProcessObjectRecognizer::new(sh(script), Duration::from_secs(5));

        let result = recognizer.recognize(&request(dir.path())).await.unwrap();
        assert_eq!(result.label, "lamp");
        assert_eq!(result.cost, 0.25);
        assert!(dir.path().join("work").join("recognition_2.json").exists());
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let recognizer = ProcessObjectRecognizer::new(sh("echo nope"), Duration::from_secs(5));
        let result = recognizer.recognize(&request(dir.path())).await;
        assert!(matches!(result, Err(PipelineError::Tool(ToolError::Malformed { .. }))));
    }
}
