use std::path::PathBuf;
use scene::SceneError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// How a call into an external process went wrong.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {secs}s")]
    Timeout { tool: String, secs: u64 },

    #[error("{tool} failed with exit code {code:?}: {stderr}")]
    Crashed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} finished without writing {}", .path.display())]
    NoOutput { tool: String, path: PathBuf },

    #[error("{tool} returned malformed output: {reason}")]
    Malformed { tool: String, reason: String },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("Failed to encode tool request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File IO error: {0}")]
    Io(#[from] std::io::Error),
}
