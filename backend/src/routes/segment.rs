use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use glam::Vec3;
use pipeline::ClickSegmentationRequest;
use render::highlight::label_color;
use render::{Framing, MaskMode, ViewRequest, render_views};
use scene::{Click, ClickSet, ColorNaming, Mask, PlyFormat, PointCloud};
use tracing::info;
use uuid::Uuid;
use web_cmn::requests::InferenceRequest;
use web_cmn::responses::{InferenceResponse, PreSegmentationResponse, SegmentedPointCloud};

use crate::error::{BackendError, Result};
use crate::state::{AppState, SegmentationResult};

const PRE_SEGMENTATION_OVERLAP: f32 = 0.2;

/// Two thirds of the way from the floor to the top of the cloud.
pub(crate) fn upper_third_height(cloud: &PointCloud) -> Result<f32> {
    let (min, max) = cloud
        .height_range()
        .ok_or_else(|| BackendError::BadRequest("The point cloud is empty".into()))?;
    Ok((2.0 * max + min) / 3.0)
}

pub async fn pre_segmentation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PreSegmentationResponse>> {
    let session = state.session(id).await?;
    let _work = session.lock_work().await;
    let request = ViewRequest {
        obj_id: 1,
        mode: MaskMode::Full,
        framing: Framing::Outward {
            overlap_ratio: PRE_SEGMENTATION_OVERLAP,
        },
        height: Some(upper_third_height(&session.cloud)?),
        vertical_fov_deg: None,
        output_dir: session.dir().join("camera_test"),
    };

    let cloud = session.cloud.clone();
    let config = state.views.clone();
    let views = tokio::task::spawn_blocking(move || {
        render_views(&cloud, &Mask::zeros(cloud.len()), &request, &config)
    })
    .await??;
    info!("Session {id}: rendered {} pre-segmentation views", views.image_paths.len());

    let annotated = state
        .tools
        .annotator
        .annotate_all(&views.image_paths, None)
        .await
        .map_err(BackendError::ExternalModel)?;

    Ok(Json(PreSegmentationResponse {
        message: "Pre-segment completed successfully".into(),
        out_paths: annotated.iter().map(|p| state.static_url(p)).collect(),
    }))
}

/// Turns the per-object click lists into clicks. Every position needs a time index.
fn build_clicks(request: &InferenceRequest) -> Result<ClickSet> {
    if !request.cube_size.is_finite() || request.cube_size <= 0.0 {
        return Err(BackendError::BadRequest(format!(
            "cubeSize must be positive, got {}",
            request.cube_size
        )));
    }

    let data = &request.click_data;
    let mut clicks = ClickSet::default();
    for (key, positions) in &data.click_positions {
        let obj_idx: u32 = key
            .parse()
            .map_err(|_| BackendError::BadRequest(format!("Invalid object index '{key}'")))?;
        let times = data.click_time_idx.get(key).map(Vec::as_slice).unwrap_or_default();
        if times.len() < positions.len() {
            return Err(BackendError::BadRequest(format!(
                "Missing click time index for object {key}"
            )));
        }
        for (position, time_idx) in positions.iter().zip(times) {
            clicks.push(Click::new(Vec3::from_array(*position), obj_idx, *time_idx, request.cube_size));
        }
    }

    if clicks.is_empty() {
        return Err(BackendError::BadRequest("No clicks provided".into()));
    }
    Ok(clicks)
}

fn save_labeled_cloud(cloud: &PointCloud, mask: &Mask, path: &FsPath) -> Result<()> {
    let colors = mask.labels().iter().map(|l| label_color(*l)).collect();
    let mut labeled = PointCloud::new(cloud.positions().to_vec(), colors)?;
    if let Some(triangles) = cloud.triangles() {
        labeled = labeled.with_triangles(triangles.to_vec())?;
    }
    labeled.save_ply(path, PlyFormat::BinaryLittleEndian, ColorNaming::Standard)?;
    Ok(())
}

pub async fn infer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: std::result::Result<Json<InferenceRequest>, JsonRejection>,
) -> Result<Json<InferenceResponse>> {
    let Json(request) = body?;
    let session = state.session(id).await?;
    let _work = session.lock_work().await;

    let mut clicks = build_clicks(&request)?;
    clicks.attach_nearest(&session.index);
    info!("Session {id}: inference with {} clicks", clicks.len());

    let outputs = session.dir().join("outputs");
    let prefix = format!("web_session_{}", session.stem());
    let segmentation = ClickSegmentationRequest::new(
        session.cloud_path.clone(),
        session.cloud.len(),
        &state.tools.segmenter_config,
        &clicks.into_vec(),
        request.object_names,
        outputs.join(format!("{prefix}_mask.npy")),
    );
    let mask = state
        .tools
        .segmenter
        .segment(&segmentation)
        .await
        .map_err(BackendError::ExternalModel)?;
    mask.ensure_len(session.cloud.len())?;
    let mask = Arc::new(mask);

    let result_path = outputs.join(format!("{prefix}.ply"));
    {
        let (cloud, mask, path) = (session.cloud.clone(), mask.clone(), result_path.clone());
        tokio::task::spawn_blocking(move || save_labeled_cloud(&cloud, &mask, &path)).await??;
    }
    info!(
        "Session {id}: {} points segmented, saved {}",
        mask.foreground_count(),
        result_path.display()
    );

    let segmentation = mask.labels().to_vec();
    session.set_results(SegmentationResult { mask, result_path }).await;

    Ok(Json(InferenceResponse {
        message: "Inference completed successfully".into(),
        segmented_point_cloud: SegmentedPointCloud { segmentation },
    }))
}
