use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use pipeline::ObjectRecognitionRequest;
use render::{Framing, MaskMode, ViewRequest, render_views};
use scene::Mask;
use tracing::info;
use uuid::Uuid;
use web_cmn::requests::MaskRecognitionRequest;
use web_cmn::responses::RecognitionResponse;

use crate::error::{BackendError, Result};
use crate::state::AppState;

const ORBIT_DISTANCE_FACTOR: f32 = 2.0;
const ORBIT_VIEWS: usize = 8;

pub async fn mask_obj_recognition(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: std::result::Result<Json<MaskRecognitionRequest>, JsonRejection>,
) -> Result<Json<RecognitionResponse>> {
    let Json(request) = body?;
    let session = state.session(id).await?;
    let _work = session.lock_work().await;

    let mask = Mask::from_signed(&request.mask)?;
    mask.ensure_len(session.cloud.len())?;
    let obj_ids = mask.object_ids();
    if obj_ids.is_empty() {
        return Err(BackendError::BadRequest(
            "No objects found in the mask (all values are 0/background).".into(),
        ));
    }
    info!("Session {id}: recognizing objects {obj_ids:?}");

    let work_dir = session.dir().join("recognition");
    let mask_path = work_dir.join("mask.npy");
    let mask = {
        let path = mask_path.clone();
        tokio::task::spawn_blocking(move || mask.save(&path).map(|_| mask)).await??
    };
    let mask = Arc::new(mask);

    let mut result = Vec::with_capacity(obj_ids.len());
    for obj_id in obj_ids {
        let view_request = ViewRequest {
            obj_id,
            mode: MaskMode::Outline,
            framing: Framing::Orbit {
                distance_factor: ORBIT_DISTANCE_FACTOR,
                count: ORBIT_VIEWS,
            },
            height: None,
            vertical_fov_deg: None,
            output_dir: work_dir.join(format!("object_{obj_id}")),
        };
        let (cloud, mask, config) = (session.cloud.clone(), mask.clone(), state.views.clone());
        let views = tokio::task::spawn_blocking(move || render_views(&cloud, &mask, &view_request, &config)).await??;

        let recognition = ObjectRecognitionRequest {
            obj_id,
            cloud_path: session.cloud_path.clone(),
            mask_path: mask_path.clone(),
            views: views.image_paths,
            work_dir: work_dir.clone(),
        };
        let mut recognized = state
            .tools
            .recognizer
            .recognize(&recognition)
            .await
            .map_err(BackendError::ExternalModel)?;
        info!("Session {id}: object {obj_id} recognized as '{}'", recognized.label);

        recognized.selected_views = recognized
            .selected_views
            .iter()
            .map(|v| state.static_url(FsPath::new(v)))
            .collect();
        result.push(recognized);
    }

    Ok(Json(RecognitionResponse {
        message: "Mask object recognition completed successfully".into(),
        result,
    }))
}

#[cfg(test)]
mod tests {
    use scene::SceneError;

    use super::*;
    use crate::routes::cloud::create_session;
    use crate::testing::{cloud_bytes, test_state};

    fn box_mask(ids: &[(std::ops::Range<usize>, i64)]) -> Vec<i64> {
        let mut mask = vec![0; 154];
        for (range, id) in ids {
            mask[range.clone()].fill(*id);
        }
        mask
    }

    #[tokio::test]
    async fn recognizes_each_object() {
        let (state, _data) = test_state();
        let session = create_session(&state, "room.ply".into(), cloud_bytes()).await.unwrap();
        let body = MaskRecognitionRequest {
            mask: box_mask(&[(100..127, 1), (127..154, 3)]),
        };

        let Json(response) = mask_obj_recognition(State(state.clone()), Path(session.id), Ok(Json(body)))
            .await
            .unwrap();

        let labels: Vec<_> = response.result.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["object_1", "object_3"]);
        assert_eq!(response.result[0].description, "object seen in 8 views");
        assert!(response.result[1].selected_views[0].starts_with("/static/"));
        assert!(response.result[1].selected_views[0].ends_with("recognition/object_3/view_000.png"));
        assert!(session.dir().join("recognition/mask.npy").exists());
    }

    #[tokio::test]
    async fn background_only_mask_is_rejected() {
        let (state, _data) = test_state();
        let session = create_session(&state, "room.ply".into(), cloud_bytes()).await.unwrap();
        let body = MaskRecognitionRequest { mask: vec![0; 154] };

        let result = mask_obj_recognition(State(state), Path(session.id), Ok(Json(body))).await;
        match result {
            Err(BackendError::BadRequest(message)) => assert!(message.starts_with("No objects found")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn mask_must_cover_every_point() {
        let (state, _data) = test_state();
        let session = create_session(&state, "room.ply".into(), cloud_bytes()).await.unwrap();
        let body = MaskRecognitionRequest { mask: vec![1; 10] };

        let result = mask_obj_recognition(State(state), Path(session.id), Ok(Json(body))).await;
        assert!(matches!(
            result,
            Err(BackendError::Scene(SceneError::MaskLength { mask: 10, points: 154 }))
        ));
    }
}
