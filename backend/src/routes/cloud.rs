use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{debug, info};
use uuid::Uuid;
use web_cmn::responses::{BoundingBox, UploadResponse};

use crate::error::{BackendError, Result};
use crate::state::{AppState, Session};

#[axum::debug_handler]
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    info!("Received upload request");

    let mut upload = None;
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.ply".to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await? {
            bytes.extend_from_slice(&chunk);
            debug!("Received chunk of size {}, total: {}", chunk.len(), bytes.len());
        }
        info!("Finished receiving {filename}: total size = {} bytes", bytes.len());
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload.ok_or_else(|| BackendError::BadRequest("Expected field 'file'".into()))?;
    let session = create_session(&state, filename, bytes).await?;
    Ok(Json(upload_response(&session)))
}

pub(crate) async fn create_session(state: &AppState, filename: String, bytes: Vec<u8>) -> Result<Arc<Session>> {
    let data_dir = state.data_dir().to_path_buf();
    let session = tokio::task::spawn_blocking(move || Session::create(&data_dir, &filename, &bytes)).await??;
    Ok(state.sessions.insert(session).await)
}

fn upload_response(session: &Session) -> UploadResponse {
    let (min, max) = session
        .cloud
        .bounds()
        .map_or(([0.0; 3], [0.0; 3]), |b| (b.min.to_array(), b.max.to_array()));
    UploadResponse {
        message: "File uploaded successfully".into(),
        session_id: session.id,
        filename: session.filename.clone(),
        point_count: session.cloud.len(),
        is_point_cloud: !session.cloud.is_mesh(),
        bounding_box: BoundingBox { min, max },
    }
}

pub async fn download_results(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response> {
    let session = state.session(id).await?;
    let results = session.results().await.ok_or(BackendError::NoResults)?;
    let bytes = tokio::fs::read(&results.result_path).await?;
    let filename = results
        .result_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results.ply".into());

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response())
}

pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state
        .sessions
        .remove(id)
        .await
        .ok_or(BackendError::SessionNotFound(id))?;
    info!("Session {id} closed");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scene::Mask;

    use super::*;
    use crate::state::SegmentationResult;
    use crate::testing::{cloud_bytes, test_state};

    #[tokio::test]
    async fn upload_reports_metadata() {
        let (state, _data) = test_state();
        let session = create_session(&state, "room.ply".into(), cloud_bytes()).await.unwrap();
        let response = upload_response(&session);

        assert_eq!(response.point_count, 154);
        assert!(response.is_point_cloud);
        assert_eq!(response.bounding_box.min, [-4.5, -4.5, 0.0]);
        assert_eq!(response.bounding_box.max[0], 4.5);
        assert!(state.sessions.get(response.session_id).await.is_some());
    }

    #[tokio::test]
    async fn download_needs_results() {
        let (state, _data) = test_state();
        let session = create_session(&state, "room.ply".into(), cloud_bytes()).await.unwrap();

        let result = download_results(State(state.clone()), Path(session.id)).await;
        assert!(matches!(result, Err(BackendError::NoResults)));

        let result_path = session.dir().join("outputs").join("web_session_room.ply");
        std::fs::create_dir_all(result_path.parent().unwrap()).unwrap();
        std::fs::write(&result_path, b"ply\n").unwrap();
        session
            .set_results(SegmentationResult {
                mask: Arc::new(Mask::zeros(session.cloud.len())),
                result_path,
            })
            .await;

        let response = download_results(State(state), Path(session.id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"web_session_room.ply\""
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ply\n");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (state, _data) = test_state();
        let id = Uuid::new_v4();
        let result = download_results(State(state.clone()), Path(id)).await;
        assert!(matches!(result, Err(BackendError::SessionNotFound(found)) if found == id));
        let result = delete_session(State(state), Path(id)).await;
        assert!(matches!(result, Err(BackendError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn delete_removes_session_files() {
        let (state, _data) = test_state();
        let session = create_session(&state, "room.ply".into(), cloud_bytes()).await.unwrap();
        let (id, dir) = (session.id, session.dir().to_path_buf());
        drop(session);

        let status = delete_session(State(state.clone()), Path(id)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.sessions.get(id).await.is_none());
        assert!(!dir.exists());
    }
}
