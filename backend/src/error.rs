use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pipeline::PipelineError;
use render::RenderError;
use scene::SceneError;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;
use web_cmn::responses::ErrorResponse;

pub type Result<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid request body: {0}")]
    Json(#[from] JsonRejection),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Session {0} not found. Please upload a point cloud first.")]
    SessionNotFound(Uuid),

    #[error("No results available. Please run inference first.")]
    NoResults,

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Blender could not produce a still.
    #[error("External tool failed: {0}")]
    ExternalTool(PipelineError),

    /// A segmentation or recognition model failed.
    #[error("External model failed: {0}")]
    ExternalModel(PipelineError),

    #[error("File IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BackendError {
    pub fn status(&self) -> StatusCode {
        match self {
            BackendError::BadRequest(_)
            | BackendError::UnsupportedFormat(_)
            | BackendError::Json(_)
            | BackendError::Multipart(_) => StatusCode::BAD_REQUEST,
            BackendError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            BackendError::NoResults => StatusCode::CONFLICT,
            BackendError::Scene(err) => scene_status(err),
            BackendError::Render(err) => match err {
                RenderError::Scene(err) => scene_status(err),
                RenderError::MaskMode(_)
                | RenderError::EmptySelection
                | RenderError::Placement(_)
                | RenderError::NoFreeSpace => StatusCode::BAD_REQUEST,
                RenderError::Image(_) | RenderError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            BackendError::ExternalTool(_) | BackendError::ExternalModel(_) => StatusCode::BAD_GATEWAY,
            BackendError::Io(_) | BackendError::Join(_) | BackendError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn scene_status(err: &SceneError) -> StatusCode {
    match err {
        SceneError::File(_) | SceneError::NpyWrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!("{status}: {message}");
        } else {
            warn!("{status}: {message}");
        }
        (status, Json(ErrorResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pipeline::ToolError;

    use super::*;

    #[test]
    fn maps_taxonomy_to_status() {
        let id = Uuid::new_v4();
        assert_eq!(BackendError::SessionNotFound(id).status(), StatusCode::NOT_FOUND);
        assert_eq!(BackendError::NoResults.status(), StatusCode::CONFLICT);
        assert_eq!(
            BackendError::Render(RenderError::EmptySelection).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BackendError::Scene(SceneError::MaskLength { mask: 2, points: 3 }).status(),
            StatusCode::BAD_REQUEST
        );
        let crashed = PipelineError::Tool(ToolError::Crashed {
            tool: "blender".into(),
            code: Some(1),
            stderr: String::new(),
        });
        assert_eq!(BackendError::ExternalTool(crashed).status(), StatusCode::BAD_GATEWAY);
        let io = std::io::Error::other("disk full");
        assert_eq!(BackendError::Io(io).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn body_is_json_message() {
        let response = BackendError::NoResults.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, "No results available. Please run inference first.");
    }
}
