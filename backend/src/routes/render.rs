use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use glam::Vec3;
use pipeline::StillRequest;
use render::occupancy::find_position;
use scene::{ColorNaming, PlyFormat, PointCloud, centroid, filter_outliers};
use tracing::info;
use uuid::Uuid;
use web_cmn::requests::RenderRequest;
use web_cmn::responses::RenderResponse;

use crate::error::{BackendError, Result};
use crate::state::AppState;

const OUTLIER_NEIGHBOURS: usize = 10;
const OUTLIER_STD_RATIO: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Viewpoint {
    position: Vec3,
    look_at: Vec3,
}

/// Camera in the largest open area two thirds up the cloud, facing its centroid.
fn choose_viewpoint(cloud: &PointCloud) -> Result<Viewpoint> {
    let filtered = filter_outliers(cloud.positions(), OUTLIER_NEIGHBOURS, OUTLIER_STD_RATIO);
    let (min, max) = filtered
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| (lo.min(p.z), hi.max(p.z)));
    let look_at = centroid(&filtered).ok_or_else(|| BackendError::BadRequest("The point cloud is empty".into()))?;
    let position = find_position(&filtered, (2.0 * max + min) / 3.0)?;
    Ok(Viewpoint { position, look_at })
}

pub async fn render_and_segment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: std::result::Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<RenderResponse>> {
    let Json(request) = body?;
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(BackendError::BadRequest("Prompt must not be empty".into()));
    }
    let session = state.session(id).await?;
    let _work = session.lock_work().await;

    let render_dir = session.dir().join("render");
    let scene_path = render_dir.join("scene.ply");
    let viewpoint = {
        let (cloud, path) = (session.cloud.clone(), scene_path.clone());
        tokio::task::spawn_blocking(move || -> Result<Viewpoint> {
            let viewpoint = choose_viewpoint(&cloud)?;
            cloud.save_ply(&path, PlyFormat::BinaryLittleEndian, ColorNaming::Diffuse)?;
            Ok(viewpoint)
        })
        .await??
    };
    info!(
        "Session {id}: rendering from {} towards {}",
        viewpoint.position, viewpoint.look_at
    );

    let still = StillRequest {
        position: viewpoint.position,
        look_at: viewpoint.look_at,
        output: render_dir.join("render.png"),
        scene: Some(scene_path),
    };
    let image = state
        .tools
        .still_renderer
        .render(&still)
        .await
        .map_err(BackendError::ExternalTool)?;
    let segmented = state
        .tools
        .annotator
        .annotate(&image, Some(prompt))
        .await
        .map_err(BackendError::ExternalModel)?;

    Ok(Json(RenderResponse {
        image: state.static_url(&image),
        segmented: state.static_url(&segmented),
    }))
}
