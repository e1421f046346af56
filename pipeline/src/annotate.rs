use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::process::{ToolCommand, clear_output, expect_output, run_tool};

/// `<dir>/<stem>_segmented.<ext>` next to `input`.
pub fn segmented_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{stem}_segmented.{}", ext.to_string_lossy()),
        None => format!("{stem}_segmented"),
    };
    input.with_file_name(name)
}

/// Draws instance masks and labels onto rendered images.
#[async_trait]
pub trait InstanceSegmenter: Send + Sync {
    /// Annotates `input` and returns the path of the annotated copy.
    async fn annotate(&self, input: &Path, prompt: Option<&str>) -> Result<PathBuf>;

    async fn annotate_all(&self, inputs: &[PathBuf], prompt: Option<&str>) -> Result<Vec<PathBuf>> {
        let mut outputs = Vec::with_capacity(inputs.len());
        for input in inputs {
            outputs.push(self.annotate(input, prompt).await?);
        }
        Ok(outputs)
    }
}

/// Runs `<command> --input <image> --output <image> [--prompt <text>]`.
#[derive(Debug, Clone)]
pub struct ProcessInstanceSegmenter {
    command: ToolCommand,
    timeout: Duration,
}

impl ProcessInstanceSegmenter {
    pub fn new(command: ToolCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl InstanceSegmenter for ProcessInstanceSegmenter {
    async fn annotate(&self, input: &Path, prompt: Option<&str>) -> Result<PathBuf> {
        let output = segmented_path(input);
        let mut args = vec![
            "--input".into(),
            input.as_os_str().to_owned(),
            "--output".into(),
            output.as_os_str().to_owned(),
        ];
        if let Some(prompt) = prompt {
            args.push("--prompt".into());
            args.push(prompt.into());
        }

        clear_output(&output).await?;
        run_tool(&self.command, args, self.timeout).await?;
        expect_output(&self.command, &output)?;
        info!("Annotated {}", output.display());
        Ok(output)
    }
}
